mod errors;
mod redisapi;
mod resp;

pub use errors::*;
pub use redisapi::*;
pub use resp::*;

#[cfg(test)]
mod test_resp;
