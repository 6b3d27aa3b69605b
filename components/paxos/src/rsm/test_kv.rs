use std::sync::Arc;

use pretty_assertions::assert_eq;
use prost::Message;
use storage::AccessRecord;
use storage::MemEngine;
use storage::RawKV;

use super::*;
use crate::protocol::encode_msg;
use crate::protocol::Command;
use crate::protocol::KvReply;
use crate::protocol::OpCode;

fn run(sm: &KvStateMachine, sto: &Arc<dyn RawKV>, cmd: Command) -> KvReply {
    let (writes, out) = sm.apply(&encode_msg(&cmd)).unwrap();
    sto.write_batch(&writes).unwrap();
    KvReply::decode(out.as_slice()).unwrap()
}

#[test]
fn test_kv_state_machine() {
    let sto: Arc<dyn RawKV> = Arc::new(MemEngine::new().unwrap());
    let sm = KvStateMachine::new(sto.clone());

    let r = run(&sm, &sto, Command::of(OpCode::Get, b"x", b""));
    assert_eq!(KvReply::default(), r);

    let r = run(&sm, &sto, Command::of(OpCode::Set, b"x", b"1"));
    assert_eq!(false, r.found);
    assert_eq!(Some(b"1".to_vec()), sto.get_kv(b"x").unwrap());

    let r = run(&sm, &sto, Command::of(OpCode::Set, b"x", b"2"));
    assert_eq!(true, r.found);

    let r = run(&sm, &sto, Command::of(OpCode::Get, b"x", b""));
    assert_eq!(true, r.found);
    assert_eq!(b"2".to_vec(), r.value);

    let r = run(&sm, &sto, Command::of(OpCode::Delete, b"x", b""));
    assert_eq!(true, r.found);
    assert_eq!(None, sto.get_kv(b"x").unwrap());

    let r = run(&sm, &sto, Command::of(OpCode::Delete, b"x", b""));
    assert_eq!(false, r.found);

    let r = run(&sm, &sto, Command::of(OpCode::NoOp, b"x", b""));
    assert_eq!(KvReply::default(), r);
}

#[test]
fn test_kv_state_machine_rejects() {
    let sto: Arc<dyn RawKV> = Arc::new(MemEngine::new().unwrap());
    let sm = KvStateMachine::new(sto.clone());

    let r = run(
        &sm,
        &sto,
        Command {
            op: 42,
            key: b"x".to_vec(),
            value: vec![],
        },
    );
    assert_eq!("unsupported op code: 42", r.error);

    let (writes, out) = sm.apply(&[0xff, 0xff, 0xff]).unwrap();
    assert!(writes.is_empty());
    let r = KvReply::decode(out.as_slice()).unwrap();
    assert!(r.error.starts_with("bad command"), "{}", r.error);
}
