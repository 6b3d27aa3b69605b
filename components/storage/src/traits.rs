use prost::Message;

use crate::StorageError;

/// DBColumnFamily defines several `table`:
/// Record stores a user key-value record, e.g., x=3.
/// Acceptor stores per-instance acceptor state: promised and accepted ballots.
/// Decided stores the value chosen for an instance.
/// Status stores counters, such as the next instance to apply or the done watermark.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DBColumnFamily {
    Record,
    Acceptor,
    Decided,
    Status,
}

impl DBColumnFamily {
    pub fn all() -> Vec<DBColumnFamily> {
        vec![
            DBColumnFamily::Record,
            DBColumnFamily::Acceptor,
            DBColumnFamily::Decided,
            DBColumnFamily::Status,
        ]
    }
}

impl From<&DBColumnFamily> for &str {
    fn from(cf: &DBColumnFamily) -> Self {
        match cf {
            DBColumnFamily::Record => "record",
            DBColumnFamily::Acceptor => "acceptor",
            DBColumnFamily::Decided => "decided",
            DBColumnFamily::Status => "status",
        }
    }
}

impl From<DBColumnFamily> for &str {
    fn from(cf: DBColumnFamily) -> Self {
        (&cf).into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteEntry {
    Nil,
    Set(DBColumnFamily, Vec<u8>, Vec<u8>),
    Delete(DBColumnFamily, Vec<u8>),
}

pub trait ToKey {
    fn to_key(&self) -> Vec<u8>;
}

/// An instance index is stored as fixed width hex so that byte order is numeric order.
impl ToKey for i64 {
    fn to_key(&self) -> Vec<u8> {
        if *self < 0 {
            panic!("instance can not be less than 0:{}", self);
        }
        format!("{:016x}", self).into_bytes()
    }
}

impl ToKey for &str {
    fn to_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// parse_instance_key is the reverse of `ToKey for i64`.
pub fn parse_instance_key(key: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(key).ok()?;
    u64::from_str_radix(s, 16).ok().map(|v| v as i64)
}

/// RawKV is the persistence interface every engine implements.
/// Keys and values are opaque bytes, grouped by column family.
pub trait RawKV: Send + Sync {
    /// set a new key-value
    fn set_raw(&self, cf: DBColumnFamily, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// get an existing value with key
    fn get_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// delete a key
    fn delete_raw(&self, cf: DBColumnFamily, key: &[u8]) -> Result<(), StorageError>;

    /// next_raw returns a key-value pair greater than the given one(include=false),
    /// or greater or equal the given one(include=true)
    fn next_raw(&self, cf: DBColumnFamily, key: &[u8], include: bool)
        -> Option<(Vec<u8>, Vec<u8>)>;

    /// write_batch applies all entries or none of them.
    fn write_batch(&self, entries: &[WriteEntry]) -> Result<(), StorageError>;

    /// scan_prefix returns every key-value pair whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, cf: DBColumnFamily, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut rst = vec![];
        let mut cur = self.next_raw(cf, prefix, true);

        while let Some((k, v)) = cur {
            if !k.starts_with(prefix) {
                break;
            }
            cur = self.next_raw(cf, &k, false);
            rst.push((k, v));
        }

        rst
    }
}

/// ObjectKV stores prost messages.
pub trait ObjectKV: RawKV {
    fn set_obj<K: ToKey, V: Message>(
        &self,
        cf: DBColumnFamily,
        k: &K,
        v: &V,
    ) -> Result<(), StorageError> {
        let mut value = vec![];
        v.encode(&mut value)?;
        self.set_raw(cf, &k.to_key(), &value)
    }

    fn get_obj<K: ToKey, V: Message + Default>(
        &self,
        cf: DBColumnFamily,
        k: &K,
    ) -> Result<Option<V>, StorageError> {
        let val = match self.get_raw(cf, &k.to_key())? {
            Some(v) => v,
            None => return Ok(None),
        };

        Ok(Some(V::decode(val.as_slice())?))
    }
}

/// AccessRecord reads user key/value. Writes go through `write_batch` together with the
/// apply cursor.
pub trait AccessRecord: RawKV {
    fn get_kv(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.get_raw(DBColumnFamily::Record, key)
    }
}

impl<T: RawKV + ?Sized> ObjectKV for T {}

impl<T: RawKV + ?Sized> AccessRecord for T {}
