//! Identity-preserving binary archiving: a [`Writer`]/[`Reader`] pair that
//! serialize value graphs while deduplicating strings and heap references by
//! identity, and a `#[derive(Archive)]` macro that generates the schema
//! descriptors driving the encode/decode walk for a struct's fields.

mod codec;
mod error;
mod reader;
mod reference;
mod schema;
mod writer;

pub use codec::{Decodable, Encodable};
pub use error::{Error, Result};
pub use reader::Reader;
pub use reference::{Archived, Awake, Shared};
pub use schema::{decode_schema, encode_schema, FieldDescriptor, Schema};
pub use writer::{encode_to_bytes, Writer, ENCODING_VERSION};

pub use archivist_macro::Archive;
