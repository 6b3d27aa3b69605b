mod client;
mod codec;
mod errors;
mod fanout;
mod pool;

pub use client::*;
pub use codec::*;
pub use errors::*;
pub use fanout::*;
pub use pool::*;

#[cfg(test)]
mod test_fanout;
#[cfg(test)]
mod test_pool;
