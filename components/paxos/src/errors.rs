use storage::StorageError;

use crate::conf::ConfError;
use crate::protocol::ProtocolError;

quick_error! {
    /// PaxosError is an error of a node outside the proposing path.
    #[derive(Debug)]
    pub enum PaxosError {
        Conf(e: ConfError) {
            from(e: ConfError) -> (e)
            display("conf error: {}", e)
        }

        Storage(e: StorageError) {
            from(e: StorageError) -> (e)
            display("storage error: {}", e)
        }

        Protocol(e: ProtocolError) {
            from(e: ProtocolError) -> (e)
            display("protocol error: {}", e)
        }
    }
}
