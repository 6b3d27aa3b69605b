use rocksdb::DB;

mod engine;
pub use engine::*;

/// RocksDBEngine stores every column family in a rocksdb column family of the same name.
pub struct RocksDBEngine {
    db: DB,
}
