mod conf;
mod errors;
mod tuning;

pub use self::conf::*;
pub use errors::*;
pub use tuning::*;
