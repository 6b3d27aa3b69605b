use paxos::rsm::RsmError;

quick_error! {
    #[derive(Debug)]
    pub enum RedisApiError {
        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("io error: {}", e)
        }

        /// The client sent something that is not redis protocol.
        Protocol(msg: String) {
            display("protocol error: {}", msg)
        }

        ExecCommandError(msg: String) {
            from(err: RsmError) -> (format!("{}", err))
            display("{}", msg)
        }
    }
}
