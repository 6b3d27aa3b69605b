use std::sync::Arc;

use pretty_assertions::assert_eq;
use storage::DBColumnFamily;
use storage::RawKV;
use storage::ToKey;

use crate::protocol::AcceptorState;
use crate::store::PaxosStore;
use crate::testutil::new_mem_storage;

#[test]
fn test_store_counters() {
    let sto = new_mem_storage();
    let s = PaxosStore::open(sto.clone()).unwrap();

    assert_eq!(0, s.next_instance().unwrap());
    assert_eq!(-1, s.done().unwrap());
    assert_eq!(0, s.gc_floor());

    s.write_batch(&[
        PaxosStore::next_instance_entry(4),
        PaxosStore::done_entry(3),
    ])
    .unwrap();
    assert_eq!(4, s.next_instance().unwrap());
    assert_eq!(3, s.done().unwrap());

    // done never goes down.
    assert_eq!(3, s.set_done(1).unwrap());
    assert_eq!(7, s.set_done(7).unwrap());
    assert_eq!(7, s.done().unwrap());

    // a counter that is not 8 bytes is reported, not misread.
    sto.set_raw(DBColumnFamily::Status, b"done", b"x").unwrap();
    assert!(s.done().is_err());
}

#[test]
fn test_store_decisions() {
    let s = PaxosStore::open(new_mem_storage()).unwrap();

    assert_eq!(None, s.decided(2).unwrap());
    assert_eq!(None, s.decided(-1).unwrap());

    assert_eq!(true, s.record_decision(2, b"a").unwrap());
    assert_eq!(false, s.record_decision(2, b"a").unwrap());
    assert!(s.record_decision(2, b"b").is_err(), "a decision never changes");
    assert_eq!(Some(b"a".to_vec()), s.decided(2).unwrap());

    s.record_decision(9, b"c").unwrap();
    assert_eq!(Some(2), s.first_decided_after(-1));
    assert_eq!(Some(2), s.first_decided_after(0));
    assert_eq!(Some(9), s.first_decided_after(2));
    assert_eq!(None, s.first_decided_after(9));
}

#[test]
fn test_store_forget_below() {
    let sto = new_mem_storage();
    let s = PaxosStore::open(sto.clone()).unwrap();

    for i in 0..5i64 {
        s.record_decision(i, b"v").unwrap();
        s.set_acceptor_state(i, &AcceptorState::default()).unwrap();
    }

    assert_eq!(3, s.forget_below(3).unwrap());
    assert_eq!(3, s.gc_floor());
    assert_eq!(None, s.decided(2).unwrap());
    assert_eq!(None, s.acceptor_state(0).unwrap());
    assert_eq!(Some(b"v".to_vec()), s.decided(3).unwrap());
    assert!(s.acceptor_state(4).unwrap().is_some());

    // forgotten instances are not recorded again.
    assert_eq!(false, s.record_decision(1, b"v").unwrap());
    assert_eq!(None, sto.get_raw(DBColumnFamily::Decided, &1i64.to_key()).unwrap());

    // the floor never goes down.
    assert_eq!(0, s.forget_below(1).unwrap());
    assert_eq!(3, s.gc_floor());

    // and it survives a restart.
    let s = PaxosStore::open(sto).unwrap();
    assert_eq!(3, s.gc_floor());
}

#[test]
fn test_store_shared_engine() {
    let sto: Arc<dyn RawKV> = new_mem_storage();
    let a = PaxosStore::open(sto.clone()).unwrap();
    a.record_decision(0, b"x").unwrap();

    let b = PaxosStore::open(sto).unwrap();
    assert_eq!(Some(b"x".to_vec()), b.decided(0).unwrap());
}
