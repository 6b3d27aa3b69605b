#[macro_use]
extern crate quick_error;

mod errors;
pub use errors::*;

pub mod redisapi;
pub use redisapi::RedisApi;

pub mod server;
pub use server::Server;

pub mod setup;
