#[macro_use]
extern crate quick_error;

pub mod acceptor;
pub mod conf;
pub mod learner;
pub mod node;
pub mod proposer;
pub mod protocol;
pub mod rsm;
pub mod server;
pub mod store;
pub mod transport;

pub mod testutil;

mod errors;
pub use errors::*;

pub use node::Paxos;
pub use node::PaxosConfig;
pub use server::PaxosServer;
pub use store::PaxosStore;

#[cfg(test)]
mod test_server;
#[cfg(test)]
mod test_store;
