use std::sync::Arc;

use pretty_assertions::assert_eq;
use storage::MemEngine;
use storage::RocksDBEngine;

use super::*;
use crate::protocol::Ballot;
use crate::store::PaxosStore;
use crate::testutil::discard_logger;

fn new_acceptor() -> (Arc<PaxosStore>, Acceptor) {
    let store = Arc::new(PaxosStore::open(Arc::new(MemEngine::new().unwrap())).unwrap());
    let acc = Acceptor::new(store.clone(), discard_logger());
    (store, acc)
}

fn b(round: u64, node_id: u64) -> Ballot {
    (round, node_id).into()
}

#[test]
fn test_prepare_promises_higher_only() {
    let (store, acc) = new_acceptor();

    let r = acc.handle_prepare(5, b(10, 1)).unwrap();
    assert!(r.ok);
    assert_eq!(Some(b(10, 1)), r.last_ballot);
    assert_eq!(None, r.accepted_ballot);

    // equal is not higher.
    let r = acc.handle_prepare(5, b(10, 1)).unwrap();
    assert!(!r.ok);

    let r = acc.handle_prepare(5, b(9, 3)).unwrap();
    assert!(!r.ok);
    assert_eq!(Some(b(10, 1)), r.last_ballot);

    let r = acc.handle_prepare(5, b(10, 2)).unwrap();
    assert!(r.ok);

    let st = store.acceptor_state(5).unwrap().unwrap();
    assert_eq!(Some(b(10, 2)), st.promised);

    // other instances are independent.
    let r = acc.handle_prepare(6, b(1, 1)).unwrap();
    assert!(r.ok);
}

#[test]
fn test_accept() {
    let (store, acc) = new_acceptor();

    acc.handle_prepare(5, b(10, 1)).unwrap();

    let r = acc.handle_accept(5, b(9, 1), b"x".to_vec()).unwrap();
    assert!(!r.ok);
    assert_eq!(Some(b(10, 1)), r.last_ballot);

    // the promised ballot itself is accepted.
    let r = acc.handle_accept(5, b(10, 1), b"y".to_vec()).unwrap();
    assert!(r.ok);

    let st = store.acceptor_state(5).unwrap().unwrap();
    assert_eq!(Some(b(10, 1)), st.accepted);
    assert_eq!(Some(b"y".to_vec()), st.value);

    // a later prepare sees what was accepted.
    let r = acc.handle_prepare(5, b(11, 2)).unwrap();
    assert!(r.ok);
    assert_eq!(Some(b(10, 1)), r.accepted_ballot);
    assert_eq!(Some(b"y".to_vec()), r.accepted_value);

    // accept without prepare also raises the promise.
    let r = acc.handle_accept(7, b(3, 3), b"z".to_vec()).unwrap();
    assert!(r.ok);
    let r = acc.handle_prepare(7, b(2, 3)).unwrap();
    assert!(!r.ok);
    assert_eq!(Some(b(3, 3)), r.last_ballot);
}

#[test]
fn test_state_survives_restart() {
    let sto = Arc::new(MemEngine::new().unwrap());
    {
        let store = Arc::new(PaxosStore::open(sto.clone()).unwrap());
        let acc = Acceptor::new(store, discard_logger());
        acc.handle_accept(2, b(4, 1), b"v".to_vec()).unwrap();
    }

    let store = Arc::new(PaxosStore::open(sto).unwrap());
    let acc = Acceptor::new(store, discard_logger());
    let r = acc.handle_prepare(2, b(4, 1)).unwrap();
    assert!(!r.ok);
    assert_eq!(Some(b"v".to_vec()), r.accepted_value);
}

#[test]
fn test_state_survives_rocksdb_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap();
    {
        let sto = Arc::new(RocksDBEngine::new(path).unwrap());
        let store = Arc::new(PaxosStore::open(sto).unwrap());
        let acc = Acceptor::new(store, discard_logger());
        assert!(acc.handle_prepare(3, b(10, 1)).unwrap().ok);
        assert!(acc.handle_accept(3, b(10, 1), b"x".to_vec()).unwrap().ok);
    }

    let sto = Arc::new(RocksDBEngine::new(path).unwrap());
    let store = Arc::new(PaxosStore::open(sto).unwrap());
    let acc = Acceptor::new(store, discard_logger());

    let r = acc.handle_prepare(3, b(5, 2)).unwrap();
    assert!(!r.ok);
    assert_eq!(Some(b(10, 1)), r.last_ballot);
    assert_eq!(Some(b(10, 1)), r.accepted_ballot);
    assert_eq!(Some(b"x".to_vec()), r.accepted_value);
}

#[test]
fn test_forgotten() {
    let (store, acc) = new_acceptor();

    for i in 0..4 {
        acc.handle_accept(i, b(1, 1), b"v".to_vec()).unwrap();
    }
    assert_eq!(4, acc.cached());

    store.forget_below(2).unwrap();
    acc.forget_below(2);
    assert_eq!(2, acc.cached());

    let r = acc.handle_prepare(1, b(5, 1)).unwrap();
    assert!(r.forgotten);
    assert!(!r.ok);
    let r = acc.handle_accept(0, b(5, 1), b"w".to_vec()).unwrap();
    assert!(r.forgotten);
    assert_eq!(None, store.acceptor_state(1).unwrap());

    let r = acc.handle_prepare(2, b(5, 1)).unwrap();
    assert!(r.ok);
    assert_eq!(Some(b"v".to_vec()), r.accepted_value);
}
