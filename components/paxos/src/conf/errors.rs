use std::net::SocketAddr;

use crate::protocol::NodeId;

quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("can not read cluster conf: {}", e)
        }

        BadYaml(e: serde_yaml::Error) {
            from(e: serde_yaml::Error) -> (e)
            display("bad cluster conf: {}", e)
        }

        EmptyCluster {
            display("no node in cluster conf")
        }

        NodeNotFound(nid: NodeId) {
            display("node {} is not in cluster conf", nid)
        }

        DupAddr(addr: SocketAddr) {
            display("paxos_addr {} is used by more than one node", addr)
        }
    }
}

impl PartialEq<ConfError> for ConfError {
    fn eq(&self, other: &ConfError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::BadYaml(_), Self::BadYaml(_)) => true,
            (Self::EmptyCluster, Self::EmptyCluster) => true,
            (Self::NodeNotFound(a), Self::NodeNotFound(b)) => a == b,
            (Self::DupAddr(a), Self::DupAddr(b)) => a == b,
            _ => false,
        }
    }
}
