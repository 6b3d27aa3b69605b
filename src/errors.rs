use paxos::conf::ConfError;
use paxos::rsm::RsmError;
use paxos::PaxosError;
use storage::StorageError;

quick_error! {
    /// ServerError is an error of starting, running or stopping a Server.
    #[derive(Debug)]
    pub enum ServerError {
        NotStarted {
            display("server is not started")
        }

        RxClosed {
            display("stop signal receiver is closed")
        }

        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("io error: {}", e)
        }

        Conf(e: ConfError) {
            from(e: ConfError) -> (e)
            display("conf error: {}", e)
        }

        Storage(e: StorageError) {
            from(e: StorageError) -> (e)
            display("storage error: {}", e)
        }

        Paxos(e: PaxosError) {
            from(e: PaxosError) -> (e)
            display("{}", e)
        }

        Rsm(e: RsmError) {
            from(e: RsmError) -> (e)
            display("{}", e)
        }

        Join(msg: String) {
            from(e: tokio::task::JoinError) -> (format!("{}", e))
            display("server task failed: {}", msg)
        }
    }
}
