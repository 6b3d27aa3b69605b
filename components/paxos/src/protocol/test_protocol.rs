use std::str::FromStr;

use pretty_assertions::assert_eq;
use prost::Message;

use crate::protocol::*;

#[test]
fn test_ballot_order() {
    let a: Ballot = (3, 1).into();
    let b: Ballot = (3, 2).into();
    let c: Ballot = (4, 1).into();

    assert!(a < b, "node id breaks a tie");
    assert!(b < c, "round goes first");
    assert_eq!(Some(c), vec![a, c, b].into_iter().max());
    assert_eq!("4.1", format!("{}", c));
}

#[test]
fn test_opcode_from_str() {
    assert_eq!(OpCode::Set, OpCode::from_str("Set").unwrap());
    assert_eq!(OpCode::Delete, OpCode::from_str("Delete").unwrap());
    assert!(OpCode::from_str("Incr").is_err());
}

#[test]
fn test_command_kind() {
    let cmd: Command = ("Set", "x", "1").into();
    assert_eq!(Some(OpCode::Set), cmd.kind());
    assert_eq!(b"x".to_vec(), cmd.key);

    let unknown = Command {
        op: 99,
        key: vec![],
        value: vec![],
    };
    assert_eq!(None, unknown.kind());
}

#[test]
fn test_entry_noop_is_distinct() {
    let noop = Entry {
        origin: 1,
        seq: 2,
        payload: None,
    };
    let empty = Entry {
        origin: 1,
        seq: 2,
        payload: Some(vec![]),
    };

    let a = Entry::decode(encode_msg(&noop).as_slice()).unwrap();
    let b = Entry::decode(encode_msg(&empty).as_slice()).unwrap();

    assert_eq!(None, a.payload);
    assert_eq!(Some(vec![]), b.payload);
    assert!(a.is_from(1, 2));
    assert!(!a.is_from(2, 2));
}

#[test]
fn test_make_request() {
    let req = MakeRequest::accept(5, (7, 2).into(), b"v".to_vec());
    match req.body {
        Some(request::Body::Accept(r)) => {
            assert_eq!(5, r.instance);
            assert_eq!(Some((7, 2).into()), r.ballot);
            assert_eq!(b"v".to_vec(), r.value);
        }
        _ => panic!("not an accept request"),
    }

    let rep = MakeReply::error(ProtocolError::LackOf("ballot".into()));
    match rep.body {
        Some(reply::Body::Error(e)) => assert_eq!("lack of required field: ballot", e.msg),
        _ => panic!("not an error reply"),
    }
}
