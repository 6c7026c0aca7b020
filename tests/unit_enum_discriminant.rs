use archivist::{encode_to_bytes, Archive, Error, Reader};
use std::io::Cursor;

#[derive(Debug, PartialEq, Archive)]
enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

#[test]
fn enum_round_trips_through_its_discriminant() {
    for suit in [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades] {
        let bytes = encode_to_bytes(&suit, 0).expect("encode");
        let mut reader = Reader::from(Cursor::new(bytes));
        let decoded: Suit = reader.read_root().expect("decode");
        assert_eq!(decoded, suit);
    }
}

#[test]
fn unknown_discriminant_is_a_read_failure() {
    let bytes = encode_to_bytes(&99i64, 0).expect("encode");
    let mut reader = Reader::from(Cursor::new(bytes));
    let err = reader.read_root::<Suit>().unwrap_err();
    assert!(matches!(err, Error::ReadFailed(_)));
}
