use std::any::Any;
use std::collections::HashMap;
use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{instrument, trace, warn};

use crate::codec::Decodable;
use crate::error::{Error, Result};
use crate::reference::{Archived, Awake, Shared};
use crate::writer::ENCODING_VERSION;

/// Performs two-phase instance materialization and back-reference
/// resolution while decoding a wire stream produced by [`crate::Writer`].
///
/// Like `Writer`, a `Reader` is built around one source and consumed for one
/// top-level value; its intern tables are not meant to outlive that archive.
pub struct Reader {
    source: Box<dyn Read>,
    strings: HashMap<i64, String>,
    objects: HashMap<i64, Box<dyn Any>>,
    user_version: i64,
    context: Option<Box<dyn Any>>,
}

impl Reader {
    /// Creates a reader over the given source with no side-channel context.
    pub fn from(source: impl Read + 'static) -> Self {
        Self {
            source: Box::new(source),
            strings: HashMap::new(),
            objects: HashMap::new(),
            user_version: 0,
            context: None,
        }
    }

    /// Creates a reader carrying an opaque `context` value, retrievable by
    /// codec implementations via [`Reader::context`].
    pub fn from_with_context(source: impl Read + 'static, context: impl Any + 'static) -> Self {
        Self {
            source: Box::new(source),
            strings: HashMap::new(),
            objects: HashMap::new(),
            user_version: 0,
            context: Some(Box::new(context)),
        }
    }

    /// Retrieves the context value attached at construction, if any, and if
    /// it is of type `T`.
    pub fn context<T: 'static>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref())
    }

    /// The opaque `user_version` stashed from the header during
    /// [`Reader::read_root`]. Zero until then.
    pub fn user_version(&self) -> i64 {
        self.user_version
    }

    /// Decodes the header, validates `encodingVersion`, stashes
    /// `user_version`, then decodes one value of `T`.
    #[instrument(skip(self))]
    pub fn read_root<T: Decodable>(&mut self) -> Result<T> {
        let version = self.read_i64()?;
        if version != ENCODING_VERSION {
            warn!(version, "encoding version mismatch");
            return Err(Error::IncompatibleArchiver(version));
        }
        self.user_version = self.read_i64()?;
        trace!(user_version = self.user_version, "read archive header");
        self.read()
    }

    /// The polymorphic entry point: decodes any [`Decodable`] value.
    pub fn read<T: Decodable>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Reads exactly `count` bytes or fails with [`Error::ReadFailed`].
    pub fn read_raw_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.source.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::ReadFailed(format!(
                    "expected {count} bytes, source was exhausted first"
                ))
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }

    fn read_fixed<T>(&mut self, width: usize, decode: impl FnOnce(&mut &[u8]) -> std::io::Result<T>) -> Result<T> {
        let buf = self.read_raw_bytes(width)?;
        let mut slice = buf.as_slice();
        decode(&mut slice).map_err(Error::Io)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_raw_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_raw_bytes(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_fixed(2, |b| b.read_u16::<BigEndian>())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_fixed(2, |b| b.read_i16::<BigEndian>())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_fixed(4, |b| b.read_u32::<BigEndian>())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_fixed(4, |b| b.read_i32::<BigEndian>())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_fixed(8, |b| b.read_u64::<BigEndian>())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_fixed(8, |b| b.read_i64::<BigEndian>())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// String intern read.
    pub(crate) fn read_interned_string(&mut self) -> Result<String> {
        let id = self.read_i64()?;
        if let Some(s) = self.strings.get(&id) {
            return Ok(s.clone());
        }
        let len = self.read_i64()?;
        if len < 0 {
            return Err(Error::ReadFailed(format!("negative string length {len}")));
        }
        let bytes = self.read_raw_bytes(len as usize)?;
        let s = String::from_utf8(bytes)
            .map_err(|e| Error::ReadFailed(format!("string {id} is not valid utf-8: {e}")))?;
        self.strings.insert(id, s.clone());
        Ok(s)
    }

    /// Reference read: the critical cycle-safe path. The returned
    /// handle is registered in `objects` before its own fields are decoded,
    /// so a cycle back through the same id resolves to the same
    /// partially-initialized instance.
    pub(crate) fn read_reference<T: Archived + Awake + 'static>(&mut self) -> Result<Shared<T>> {
        let id = self.read_i64()?;
        if let Some(existing) = self.objects.get(&id) {
            return existing
                .downcast_ref::<Shared<T>>()
                .cloned()
                .ok_or_else(|| {
                    Error::ReadFailed(format!(
                        "object {id} was first decoded as a different type"
                    ))
                });
        }
        trace!(id, "registering reference before decode");
        let shared = Shared::new(T::default());
        self.objects.insert(id, Box::new(shared.clone()));
        shared.borrow_mut().decode_body(self)?;
        shared.borrow_mut().awake();
        Ok(shared)
    }
}
