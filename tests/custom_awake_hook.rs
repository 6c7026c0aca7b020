use archivist::{encode_to_bytes, Archive, Awake, Reader};
use std::io::Cursor;

#[derive(Debug, Default, PartialEq, Archive)]
#[archive(awake)]
struct Counter {
    value: i32,
    doubled: i32,
}

impl Awake for Counter {
    fn awake(&mut self) {
        self.doubled = self.value * 2;
    }
}

#[test]
fn awake_runs_after_fields_are_populated() {
    let counter = Counter {
        value: 21,
        doubled: 0,
    };
    let bytes = encode_to_bytes(&counter, 0).expect("encode");
    let mut reader = Reader::from(Cursor::new(bytes));
    let decoded: Counter = reader.read_root().expect("decode");
    assert_eq!(decoded.value, 21);
    assert_eq!(decoded.doubled, 42);
}
