use storage::StorageError;

use crate::proposer::ProposeError;
use crate::PaxosError;

quick_error! {
    /// RsmError is an error encountered while submitting or applying a command.
    #[derive(Debug)]
    pub enum RsmError {
        Propose(e: ProposeError) {
            from(e: ProposeError) -> (e)
            display("propose error: {}", e)
        }

        Paxos(e: PaxosError) {
            from(e: PaxosError) -> (e)
            display("{}", e)
        }

        Storage(e: StorageError) {
            from(e: StorageError) -> (e)
            display("storage error: {}", e)
        }

        BadReply(msg: String) {
            from(e: prost::DecodeError) -> (format!("{}", e))
            display("bad reply from state machine: {}", msg)
        }
    }
}
