use std::any::Any;
use std::collections::HashMap;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::{instrument, trace};

use crate::codec::Encodable;
use crate::error::{Error, Result};
use crate::reference::{Archived, Shared};

/// The magic `encodingVersion` every archive starts with. Anything else on
/// decode is rejected as [`Error::IncompatibleArchiver`].
pub const ENCODING_VERSION: i64 = 1;

/// Assigns identities, dedupes strings and references, and emits the wire
/// bytes of a value graph.
///
/// A `Writer` is built around one sink and used for one top-level value; its
/// intern tables are not meant to outlive that single archive.
pub struct Writer {
    sink: Box<dyn Write>,
    string_ids: HashMap<String, i64>,
    object_ids: HashMap<usize, i64>,
    context: Option<Box<dyn Any>>,
}

impl Writer {
    /// Creates a writer over the given sink with no side-channel context.
    pub fn to(sink: impl Write + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            string_ids: HashMap::new(),
            object_ids: HashMap::new(),
            context: None,
        }
    }

    /// Creates a writer carrying an opaque `context` value, retrievable by
    /// codec implementations via [`Writer::context`].
    pub fn to_with_context(sink: impl Write + 'static, context: impl Any + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            string_ids: HashMap::new(),
            object_ids: HashMap::new(),
            context: Some(Box::new(context)),
        }
    }

    /// Retrieves the context value attached at construction, if any, and if
    /// it is of type `T`.
    pub fn context<T: 'static>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref())
    }

    /// Writes the archive header (`encodingVersion`, then `user_version`)
    /// followed by the encoded root value.
    #[instrument(skip(self, value))]
    pub fn write_root<T: Encodable>(&mut self, value: &T, user_version: i64) -> Result<()> {
        trace!(user_version, "writing archive header");
        self.write_i64(ENCODING_VERSION)?;
        self.write_i64(user_version)?;
        self.write(value)
    }

    /// The polymorphic entry point: encodes any [`Encodable`] value.
    ///
    /// Dispatch onto the string / reference / plain-value paths happens
    /// inside each type's own `Encodable` implementation, not here — see
    /// the blanket impls in [`crate::codec`] and [`crate::reference`].
    pub fn write<T: Encodable>(&mut self, value: &T) -> Result<()> {
        value.encode(self)
    }

    /// Writes `bytes` verbatim. Fails with [`Error::WriteFailed`] if the
    /// sink accepts fewer bytes than requested.
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self.sink.write(bytes)?;
        if written != bytes.len() {
            return Err(Error::WriteFailed {
                written,
                requested: bytes.len(),
            });
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    fn write_fixed(&mut self, encode: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> Result<()> {
        let mut buf = Vec::new();
        encode(&mut buf)?;
        self.write_raw_bytes(&buf)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_raw_bytes(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_raw_bytes(&[v as u8])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_fixed(|buf| buf.write_u16::<BigEndian>(v))
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_fixed(|buf| buf.write_i16::<BigEndian>(v))
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_fixed(|buf| buf.write_u32::<BigEndian>(v))
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_fixed(|buf| buf.write_i32::<BigEndian>(v))
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_fixed(|buf| buf.write_u64::<BigEndian>(v))
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_fixed(|buf| buf.write_i64::<BigEndian>(v))
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(if v { 1 } else { 0 })
    }

    /// String intern path: first occurrence pays for the payload,
    /// subsequent occurrences of equal content cost one id.
    pub(crate) fn write_interned_string(&mut self, s: &str) -> Result<()> {
        if let Some(&id) = self.string_ids.get(s) {
            return self.write_i64(id);
        }
        let id = self.string_ids.len() as i64;
        self.string_ids.insert(s.to_owned(), id);
        trace!(id, len = s.len(), "interning new string");
        self.write_i64(id)?;
        self.write_i64(s.len() as i64)?;
        self.write_raw_bytes(s.as_bytes())
    }

    /// Reference intern path: identity is the heap address behind
    /// the shared handle, not its content.
    pub(crate) fn write_reference<T: Archived>(&mut self, shared: &Shared<T>) -> Result<()> {
        let identity = shared.identity();
        if let Some(&id) = self.object_ids.get(&identity) {
            return self.write_i64(id);
        }
        let id = self.object_ids.len() as i64;
        self.object_ids.insert(identity, id);
        trace!(id, "interning new reference");
        self.write_i64(id)?;
        shared.borrow().encode_body(self)
    }
}

#[derive(Clone, Default)]
struct ByteSink(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

impl Write for ByteSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Encodes `value` into an owned byte vector.
pub fn encode_to_bytes<T: Encodable>(value: &T, user_version: i64) -> Result<Vec<u8>> {
    let sink = ByteSink::default();
    let mut writer = Writer::to(sink.clone());
    writer.write_root(value, user_version)?;
    writer.flush()?;
    Ok(sink.0.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_carries_encoding_version_and_user_version() {
        let bytes = encode_to_bytes(&42u32, 7).expect("encode");
        assert_eq!(&bytes[0..8], &ENCODING_VERSION.to_be_bytes());
        assert_eq!(&bytes[8..16], &7i64.to_be_bytes());
    }

    #[test]
    fn scenario_one_u32_42_with_zero_version() {
        let bytes = encode_to_bytes(&42u32, 0).expect("encode");
        assert_eq!(
            bytes,
            vec![
                0, 0, 0, 0, 0, 0, 0, 1, // encodingVersion
                0, 0, 0, 0, 0, 0, 0, 0, // user_version
                0, 0, 0, 42, // u32 payload
            ]
        );
    }

    #[test]
    fn repeated_strings_are_interned_once() {
        let values = vec!["hi".to_string(), "hi".to_string(), "hi".to_string()];
        let bytes = encode_to_bytes(&values, 0).expect("encode");
        let needle = [0x68, 0x69];
        let occurrences = bytes.windows(2).filter(|w| *w == needle).count();
        assert_eq!(occurrences, 1, "payload bytes of a repeated string must appear once");
    }

    #[test]
    fn short_write_is_reported_as_write_failed() {
        struct Truncating;
        impl Write for Truncating {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len().min(1))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = Writer::to(Truncating);
        let err = writer.write_root(&42i64, 0).unwrap_err();
        assert!(matches!(err, Error::WriteFailed { .. }));
    }
}
