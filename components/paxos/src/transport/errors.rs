use std::net::SocketAddr;

quick_error! {
    /// TransportError is a failure to get a reply from a peer.
    /// A peer with a transport error is treated as unresponsive for that call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TransportError {
        Io(msg: String) {
            from(e: std::io::Error) -> (format!("{}", e))
            display("io error: {}", msg)
        }

        Timeout(peer: SocketAddr) {
            display("timeout talking to {}", peer)
        }

        NoConnectionAvailable(peer: SocketAddr) {
            display("no connection available to {}", peer)
        }

        MalformedResponse(msg: String) {
            from(e: prost::DecodeError) -> (format!("{}", e))
            display("malformed response: {}", msg)
        }

        Closed(peer: SocketAddr) {
            display("connection to {} closed", peer)
        }

        Remote(msg: String) {
            display("peer replied error: {}", msg)
        }
    }
}

impl TransportError {
    /// breaks_conn tells if the connection that produced this error must not be reused.
    pub fn breaks_conn(&self) -> bool {
        match self {
            TransportError::Remote(_) => false,
            _ => true,
        }
    }
}
