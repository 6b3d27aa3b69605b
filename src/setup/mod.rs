mod log_format;
mod setup;

pub use log_format::*;
pub use setup::*;
