use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use storage::parse_instance_key;
use storage::DBColumnFamily;
use storage::ObjectKV;
use storage::RawKV;
use storage::StorageError;
use storage::ToKey;
use storage::WriteEntry;

use crate::protocol::AcceptorState;
use crate::protocol::InstanceIdx;

const NEXT_INSTANCE: &str = "next_instance";
const DONE: &str = "done";
const GC_FLOOR: &str = "gc_floor";

/// PaxosStore is the durable state of a node: acceptor states, decided values and counters.
pub struct PaxosStore {
    sto: Arc<dyn RawKV>,
    // instances below it are forgotten.
    gc_floor: AtomicI64,
    decide_lock: Mutex<()>,
}

fn encode_idx(i: InstanceIdx) -> Vec<u8> {
    i.to_be_bytes().to_vec()
}

fn decode_idx(v: &[u8]) -> Result<InstanceIdx, StorageError> {
    let mut buf = [0u8; 8];
    if v.len() != buf.len() {
        return Err(format!("bad counter of {} bytes", v.len()).into());
    }
    buf.copy_from_slice(v);
    Ok(i64::from_be_bytes(buf))
}

impl PaxosStore {
    pub fn open(sto: Arc<dyn RawKV>) -> Result<PaxosStore, StorageError> {
        let s = PaxosStore {
            sto,
            gc_floor: AtomicI64::new(0),
            decide_lock: Mutex::new(()),
        };

        let floor = s.get_counter(GC_FLOOR)?.unwrap_or(0);
        s.gc_floor.store(floor, Ordering::SeqCst);
        Ok(s)
    }

    pub fn storage(&self) -> &Arc<dyn RawKV> {
        &self.sto
    }

    fn get_counter(&self, key: &str) -> Result<Option<InstanceIdx>, StorageError> {
        match self.sto.get_raw(DBColumnFamily::Status, &key.to_key())? {
            Some(v) => Ok(Some(decode_idx(&v)?)),
            None => Ok(None),
        }
    }

    fn counter_entry(key: &str, i: InstanceIdx) -> WriteEntry {
        WriteEntry::Set(DBColumnFamily::Status, key.to_key(), encode_idx(i))
    }

    pub fn acceptor_state(&self, i: InstanceIdx) -> Result<Option<AcceptorState>, StorageError> {
        self.sto.get_obj(DBColumnFamily::Acceptor, &i)
    }

    pub fn set_acceptor_state(&self, i: InstanceIdx, st: &AcceptorState) -> Result<(), StorageError> {
        self.sto.set_obj(DBColumnFamily::Acceptor, &i, st)
    }

    pub fn decided(&self, i: InstanceIdx) -> Result<Option<Vec<u8>>, StorageError> {
        if i < 0 {
            return Ok(None);
        }
        self.sto.get_raw(DBColumnFamily::Decided, &i.to_key())
    }

    /// record_decision stores the decided value of an instance.
    /// It returns false if the same value was already recorded.
    /// A different value for an already decided instance is an error.
    pub fn record_decision(&self, i: InstanceIdx, value: &[u8]) -> Result<bool, StorageError> {
        if i < self.gc_floor() {
            return Ok(false);
        }

        let _guard = self.decide_lock.lock().map_err(|_| StorageError::Poisoned)?;

        match self.decided(i)? {
            Some(v) if v == value => Ok(false),
            Some(_) => Err(format!("instance {} is already decided with another value", i).into()),
            None => {
                self.sto.set_raw(DBColumnFamily::Decided, &i.to_key(), value)?;
                Ok(true)
            }
        }
    }

    /// first_decided_after returns the smallest decided instance greater than `i`.
    pub fn first_decided_after(&self, i: InstanceIdx) -> Option<InstanceIdx> {
        let from = std::cmp::max(i, 0);
        let (k, _) = self
            .sto
            .next_raw(DBColumnFamily::Decided, &from.to_key(), i < 0)?;
        parse_instance_key(&k)
    }

    /// next_instance is the first instance not yet applied.
    pub fn next_instance(&self) -> Result<InstanceIdx, StorageError> {
        Ok(self.get_counter(NEXT_INSTANCE)?.unwrap_or(0))
    }

    pub fn next_instance_entry(i: InstanceIdx) -> WriteEntry {
        PaxosStore::counter_entry(NEXT_INSTANCE, i)
    }

    /// done is the highest instance applied on this node, -1 if none.
    pub fn done(&self) -> Result<InstanceIdx, StorageError> {
        Ok(self.get_counter(DONE)?.unwrap_or(-1))
    }

    pub fn done_entry(i: InstanceIdx) -> WriteEntry {
        PaxosStore::counter_entry(DONE, i)
    }

    /// set_done raises the done watermark. A lower value is ignored.
    pub fn set_done(&self, i: InstanceIdx) -> Result<InstanceIdx, StorageError> {
        let _guard = self.decide_lock.lock().map_err(|_| StorageError::Poisoned)?;

        let cur = self.done()?;
        if i <= cur {
            return Ok(cur);
        }
        self.sto.write_batch(&[PaxosStore::done_entry(i)])?;
        Ok(i)
    }

    pub fn write_batch(&self, entries: &[WriteEntry]) -> Result<(), StorageError> {
        self.sto.write_batch(entries)
    }

    pub fn gc_floor(&self) -> InstanceIdx {
        self.gc_floor.load(Ordering::SeqCst)
    }

    /// forget_below drops acceptor states and decided values of every instance below `floor`.
    /// It returns the number of instances dropped. The floor never goes down.
    pub fn forget_below(&self, floor: InstanceIdx) -> Result<usize, StorageError> {
        if floor <= self.gc_floor() {
            return Ok(0);
        }

        // raise the floor first so that no one re-creates what is being deleted.
        self.sto
            .write_batch(&[PaxosStore::counter_entry(GC_FLOOR, floor)])?;
        self.gc_floor.fetch_max(floor, Ordering::SeqCst);

        let mut dropped = 0;
        for cf in [DBColumnFamily::Acceptor, DBColumnFamily::Decided].iter() {
            let mut entries = vec![];
            let mut cur = self.sto.next_raw(*cf, &0i64.to_key(), true);
            while let Some((k, _)) = cur {
                match parse_instance_key(&k) {
                    Some(i) if i < floor => {}
                    _ => break,
                }
                cur = self.sto.next_raw(*cf, &k, false);
                entries.push(WriteEntry::Delete(*cf, k));
            }

            if *cf == DBColumnFamily::Decided {
                dropped = entries.len();
            }
            self.sto.write_batch(&entries)?;
        }

        Ok(dropped)
    }
}
