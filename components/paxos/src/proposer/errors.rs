use storage::StorageError;

use crate::protocol::InstanceIdx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Accept,
}

quick_error! {
    /// ProposeError is an error encountered while deciding an instance.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ProposeError {
        NoMajority(phase: Phase, want: usize, got: usize) {
            display("{:?}: want at least {} oks, but: {}", phase, want, got)
        }

        /// The instance is below the gc floor of some acceptor.
        Forgotten(instance: InstanceIdx) {
            display("instance {} is forgotten", instance)
        }

        Storage(e: StorageError) {
            from(e: StorageError) -> (e)
            display("storage error: {}", e)
        }
    }
}
