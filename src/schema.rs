use crate::codec::{Decodable, Encodable};
use crate::error::Result;
use crate::reader::Reader;
use crate::writer::Writer;

/// One field of a record's schema descriptor: a read-only projection
/// from `T` to the field's current value, and an in-place setter, both
/// closing over the field's own codec so the encode/decode loops in
/// [`crate::reference::Archived`] impls can walk the descriptor list
/// generically instead of repeating per-field code.
pub struct FieldDescriptor<T> {
    name: &'static str,
    encode: Box<dyn Fn(&T, &mut Writer) -> Result<()>>,
    decode: Box<dyn Fn(&mut T, &mut Reader) -> Result<()>>,
}

impl<T> FieldDescriptor<T> {
    /// Builds a descriptor for a field of type `F` from a projection and a
    /// setter closure. `#[derive(Archive)]` emits one call to this per
    /// field, in declaration order.
    pub fn new<F>(
        name: &'static str,
        get: impl Fn(&T) -> &F + 'static,
        set: impl Fn(&mut T, F) + 'static,
    ) -> Self
    where
        F: Encodable + Decodable + 'static,
    {
        FieldDescriptor {
            name,
            encode: Box::new(move |value, writer| get(value).encode(writer)),
            decode: Box::new(move |value, reader| {
                let field = F::decode(reader)?;
                set(value, field);
                Ok(())
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn encode_into(&self, value: &T, writer: &mut Writer) -> Result<()> {
        (self.encode)(value, writer)
    }

    pub fn decode_into(&self, value: &mut T, reader: &mut Reader) -> Result<()> {
        (self.decode)(value, reader)
    }
}

/// The ordered field list that is a record type's wire contract.
pub type Schema<T> = Vec<FieldDescriptor<T>>;

/// Encodes `value`'s fields in schema order. Shared by every
/// `Archived::encode_body` the derive macro generates.
pub fn encode_schema<T>(schema: &Schema<T>, value: &T, writer: &mut Writer) -> Result<()> {
    for field in schema {
        field.encode_into(value, writer)?;
    }
    Ok(())
}

/// Decodes into `value`'s fields in schema order. Shared by every
/// `Archived::decode_body` the derive macro generates.
pub fn decode_schema<T>(schema: &Schema<T>, value: &mut T, reader: &mut Reader) -> Result<()> {
    for field in schema {
        field.decode_into(value, reader)?;
    }
    Ok(())
}
