use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};

use crate::DBColumnFamily;
use crate::WriteEntry;
use crate::{RawKV, RocksDBEngine, StorageError};

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::DBError(e.into_string())
    }
}

impl RocksDBEngine {
    /// Open an Engine based on rocksdb. Missing column families are created.
    ///
    /// # Examples:
    /// ```
    /// use tempfile::Builder;
    /// use storage::RocksDBEngine;
    ///
    /// let tmp_root = Builder::new().tempdir().unwrap();
    /// let db_path = format!("{}/test", tmp_root.path().display());
    ///
    /// let eng = RocksDBEngine::new(&db_path).unwrap();
    /// ```
    pub fn new(path: &str) -> Result<RocksDBEngine, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs: Vec<&str> = DBColumnFamily::all().iter().map(|cf| cf.into()).collect();
        let db = DB::open_cf(&opts, path, cfs)?;

        Ok(RocksDBEngine { db })
    }

    /// make rocksdb column family handle
    fn _make_cf_handle(&self, cf: DBColumnFamily) -> Result<&ColumnFamily, StorageError> {
        match self.db.cf_handle(cf.into()) {
            Some(h) => Ok(h),
            None => Err(format!("got column family {:?} handle failed", cf).into()),
        }
    }

    fn _range(
        &self,
        cf: DBColumnFamily,
        key: &[u8],
        include: bool,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        let cfh = self._make_cf_handle(cf).ok()?;
        let iter = self
            .db
            .iterator_cf(cfh, IteratorMode::From(key, Direction::Forward));

        for item in iter {
            let (k, v) = item.ok()?;
            if !include && &*k == key {
                continue;
            }
            return Some((k.to_vec(), v.to_vec()));
        }

        None
    }
}

impl RawKV for RocksDBEngine {
    fn set_raw(&self, cf: DBColumnFamily, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cfh = self._make_cf_handle(cf)?;
        Ok(self.db.put_cf(cfh, key, value)?)
    }

    fn get_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cfh = self._make_cf_handle(cf)?;
        Ok(self.db.get_cf(cfh, key)?)
    }

    fn delete_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<(), StorageError> {
        let cfh = self._make_cf_handle(cf)?;
        Ok(self.db.delete_cf(cfh, key)?)
    }

    fn next_raw(
        &self,
        cf: DBColumnFamily,
        key: &[u8],
        include: bool,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        self._range(cf, key, include)
    }

    fn write_batch(&self, entries: &[WriteEntry]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        for en in entries {
            match en {
                WriteEntry::Nil => {}
                WriteEntry::Set(cf, k, v) => {
                    let cfh = self._make_cf_handle(*cf)?;
                    batch.put_cf(cfh, k, v);
                }
                WriteEntry::Delete(cf, k) => {
                    let cfh = self._make_cf_handle(*cf)?;
                    batch.delete_cf(cfh, k);
                }
            }
        }

        Ok(self.db.write(batch)?)
    }
}
