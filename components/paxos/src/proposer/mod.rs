mod ballot;
mod errors;
mod proposer;

pub use ballot::*;
pub use errors::*;
pub use proposer::*;
