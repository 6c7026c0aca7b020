use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::Result;
use crate::reader::Reader;
use crate::writer::Writer;

/// A type that knows how to write itself onto a [`Writer`].
///
/// Concrete implementations choose their own wire shape: a scalar writes its
/// raw bytes directly, `String` routes through [`Writer::write_interned_string`],
/// and [`crate::Shared`] routes through [`Writer::write_reference`]. Dispatch
/// between those three shapes lives in each impl, not in `Writer` itself.
pub trait Encodable {
    fn encode(&self, writer: &mut Writer) -> Result<()>;
}

/// A type that knows how to read itself back from a [`Reader`].
pub trait Decodable: Sized {
    fn decode(reader: &mut Reader) -> Result<Self>;
}

macro_rules! scalar_codec {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encodable for $ty {
            fn encode(&self, writer: &mut Writer) -> Result<()> {
                writer.$write(*self)
            }
        }

        impl Decodable for $ty {
            fn decode(reader: &mut Reader) -> Result<Self> {
                reader.$read()
            }
        }
    };
}

scalar_codec!(u8, write_u8, read_u8);
scalar_codec!(i8, write_i8, read_i8);
scalar_codec!(u16, write_u16, read_u16);
scalar_codec!(i16, write_i16, read_i16);
scalar_codec!(u32, write_u32, read_u32);
scalar_codec!(i32, write_i32, read_i32);
scalar_codec!(u64, write_u64, read_u64);
scalar_codec!(i64, write_i64, read_i64);
scalar_codec!(bool, write_bool, read_bool);

impl Encodable for f32 {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u32(self.to_bits())
    }
}

impl Decodable for f32 {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(f32::from_bits(reader.read_u32()?))
    }
}

impl Encodable for f64 {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u64(self.to_bits())
    }
}

impl Decodable for f64 {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(f64::from_bits(reader.read_u64()?))
    }
}

impl Encodable for usize {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i64(*self as i64)
    }
}

impl Decodable for usize {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(reader.read_i64()? as usize)
    }
}

impl Encodable for isize {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i64(*self as i64)
    }
}

impl Decodable for isize {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(reader.read_i64()? as isize)
    }
}

impl Encodable for str {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_interned_string(self)
    }
}

impl Encodable for String {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_interned_string(self.as_str())
    }
}

impl Decodable for String {
    fn decode(reader: &mut Reader) -> Result<Self> {
        reader.read_interned_string()
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        match self {
            Some(value) => {
                writer.write_bool(true)?;
                value.encode(writer)
            }
            None => writer.write_bool(false),
        }
    }
}

impl<T: Decodable> Decodable for Option<T> {
    fn decode(reader: &mut Reader) -> Result<Self> {
        if reader.read_bool()? {
            Ok(Some(T::decode(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i64(self.len() as i64)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let len = reader.read_i64()?.max(0) as usize;
        let mut items = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

impl<T: Encodable + Eq + Hash> Encodable for HashSet<T> {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        let items: Vec<&T> = self.iter().collect();
        writer.write_i64(items.len() as i64)?;
        for item in items {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T: Decodable + Eq + Hash> Decodable for HashSet<T> {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let len = reader.read_i64()?.max(0) as usize;
        let mut items = HashSet::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            items.insert(T::decode(reader)?);
        }
        Ok(items)
    }
}

/// Maps encode as two independent length-prefixed sequences — all keys, then
/// all values — both snapshotted from a single `iter()` pass so the two
/// sequences always describe the same pairing even though `HashMap`'s
/// iteration order is not itself stable across runs.
impl<K: Encodable + Eq + Hash, V: Encodable> Encodable for HashMap<K, V> {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        let entries: Vec<(&K, &V)> = self.iter().collect();
        writer.write_i64(entries.len() as i64)?;
        for (key, _) in &entries {
            key.encode(writer)?;
        }
        for (_, value) in &entries {
            value.encode(writer)?;
        }
        Ok(())
    }
}

impl<K: Decodable + Eq + Hash, V: Decodable> Decodable for HashMap<K, V> {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let len = reader.read_i64()?.max(0) as usize;
        let mut keys = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            keys.push(K::decode(reader)?);
        }
        let mut map = HashMap::with_capacity(len);
        for key in keys {
            map.insert(key, V::decode(reader)?);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::encode_to_bytes;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn round_trip<T: Encodable + Decodable>(value: &T) -> T {
        let bytes = encode_to_bytes(value, 0).expect("encode");
        let mut reader = Reader::from(Cursor::new(bytes));
        reader.read_root().expect("decode")
    }

    #[test]
    fn scalar_round_trip() {
        assert_eq!(round_trip(&42u32), 42u32);
        assert_eq!(round_trip(&-7i64), -7i64);
        assert_eq!(round_trip(&true), true);
        assert_eq!(round_trip(&false), false);
    }

    #[test]
    fn float_round_trip_is_exact() {
        assert_eq!(round_trip(&1.5f32), 1.5f32);
        assert_eq!(round_trip(&-0.25f64), -0.25f64);
    }

    #[test]
    fn u32_is_big_endian_on_the_wire() {
        let bytes = encode_to_bytes(&0x01020304u32, 0).expect("encode");
        assert_eq!(&bytes[bytes.len() - 4..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn option_none_is_one_zero_byte() {
        let bytes = encode_to_bytes(&Option::<String>::None, 0).expect("encode");
        assert_eq!(bytes.last(), Some(&0u8));
    }

    #[test]
    fn option_some_round_trips() {
        assert_eq!(round_trip(&Some(42i32)), Some(42i32));
        assert_eq!(round_trip(&Option::<i32>::None), None);
    }

    #[test]
    fn vec_round_trips_in_order() {
        let original = vec![1, 2, 3, 4, 5];
        assert_eq!(round_trip(&original), original);
    }

    #[test]
    fn hashset_round_trips_as_a_set() {
        let original: HashSet<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(round_trip(&original), original);
    }

    #[test]
    fn hashmap_round_trips_as_pairs() {
        let mut original = HashMap::new();
        original.insert("a".to_string(), 1i32);
        original.insert("b".to_string(), 2i32);
        assert_eq!(round_trip(&original), original);
    }

    proptest! {
        #[test]
        fn prop_scalar_round_trip(v: i64) {
            prop_assert_eq!(round_trip(&v), v);
        }

        #[test]
        fn prop_vec_round_trip(v: Vec<i32>) {
            prop_assert_eq!(round_trip(&v), v);
        }

        #[test]
        fn prop_string_round_trip(s: String) {
            prop_assert_eq!(round_trip(&s), s);
        }

        #[test]
        fn prop_sequence_wire_shape(v: Vec<u8>) {
            let bytes = encode_to_bytes(&v, 0).unwrap();
            let len_bytes = &bytes[16..24];
            prop_assert_eq!(i64::from_be_bytes(len_bytes.try_into().unwrap()), v.len() as i64);
            prop_assert_eq!(&bytes[24..], v.as_slice());
        }
    }
}
