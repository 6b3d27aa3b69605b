mod errors;
mod kv;
mod rsm;

pub use errors::*;
pub use kv::*;
pub use rsm::*;

#[cfg(test)]
mod test_kv;
