use archivist::{encode_to_bytes, Archive, Reader, Shared};
use std::io::Cursor;

#[derive(Debug, Default, Archive)]
struct Node {
    label: String,
    next: Option<Shared<Node>>,
}

#[test]
fn self_referencing_node_round_trips_to_the_same_instance() {
    let node = Shared::new(Node {
        label: "root".to_string(),
        next: None,
    });
    node.borrow_mut().next = Some(node.clone());

    let bytes = encode_to_bytes(&node, 0).expect("encode");
    let mut reader = Reader::from(Cursor::new(bytes));
    let decoded: Shared<Node> = reader.read_root().expect("decode");

    assert_eq!(decoded.borrow().label, "root");
    let next = decoded.borrow().next.clone().expect("cycle preserved");
    assert!(next.ptr_eq(&decoded), "self-reference must resolve to the same instance");
}

#[derive(Debug, Default, Archive)]
struct Peer {
    name: String,
    friend: Option<Shared<Peer>>,
}

#[test]
fn mutual_cycle_between_two_references_round_trips() {
    let a = Shared::new(Peer {
        name: "a".to_string(),
        friend: None,
    });
    let b = Shared::new(Peer {
        name: "b".to_string(),
        friend: Some(a.clone()),
    });
    a.borrow_mut().friend = Some(b.clone());

    let bytes = encode_to_bytes(&a, 0).expect("encode");
    let mut reader = Reader::from(Cursor::new(bytes));
    let decoded_a: Shared<Peer> = reader.read_root().expect("decode");
    let decoded_b = decoded_a.borrow().friend.clone().expect("a has a friend");

    assert_eq!(decoded_a.borrow().name, "a");
    assert_eq!(decoded_b.borrow().name, "b");
    let back_to_a = decoded_b.borrow().friend.clone().expect("b has a friend");
    assert!(back_to_a.ptr_eq(&decoded_a));
}
