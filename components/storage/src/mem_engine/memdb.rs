use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::{DBColumnFamily, MemEngine, RawKV, StorageError, WriteEntry};

type Tables = HashMap<DBColumnFamily, BTreeMap<Vec<u8>, Vec<u8>>>;

impl MemEngine {
    pub fn new() -> Result<MemEngine, StorageError> {
        Ok(MemEngine {
            _db: Mutex::new(HashMap::new()),
        })
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self._db.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn apply(cfs: &mut Tables, en: &WriteEntry) {
    match en {
        WriteEntry::Nil => {}
        WriteEntry::Set(cf, k, v) => {
            cfs.entry(*cf).or_default().insert(k.clone(), v.clone());
        }
        WriteEntry::Delete(cf, k) => {
            cfs.entry(*cf).or_default().remove(k);
        }
    }
}

impl RawKV for MemEngine {
    fn set_raw(&self, cf: DBColumnFamily, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut cfs = self.tables()?;
        apply(&mut cfs, &WriteEntry::Set(cf, key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn get_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cfs = self.tables()?;
        Ok(cfs.get(&cf).and_then(|bt| bt.get(key).cloned()))
    }

    fn delete_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<(), StorageError> {
        let mut cfs = self.tables()?;
        apply(&mut cfs, &WriteEntry::Delete(cf, key.to_vec()));
        Ok(())
    }

    fn next_raw(
        &self,
        cf: DBColumnFamily,
        key: &[u8],
        include: bool,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        let cfs = self.tables().ok()?;
        let bt = cfs.get(&cf)?;

        bt.range(key.to_vec()..)
            .find(|(k, _)| include || k.as_slice() != key)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    fn write_batch(&self, entries: &[WriteEntry]) -> Result<(), StorageError> {
        // one lock for the whole batch so readers never see half of it.
        let mut cfs = self.tables()?;
        for en in entries {
            apply(&mut cfs, en);
        }

        Ok(())
    }
}
