use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::DBColumnFamily;

mod memdb;

/// MemEngine keeps every column family in a BTreeMap, guarded by one lock.
/// It is not durable and is meant for tests and single process experiments.
#[derive(Debug, Default)]
pub struct MemEngine {
    _db: Mutex<HashMap<DBColumnFamily, BTreeMap<Vec<u8>, Vec<u8>>>>,
}
