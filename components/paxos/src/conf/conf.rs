use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::ConfError;
use super::Tuning;
use crate::protocol::quorum;
use crate::protocol::NodeId;

/// Node is a member of the cluster.
/// `paxos_addr` serves peer messages, `api_addr` serves clients.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Node {
    #[serde(default)]
    pub node_id: NodeId,
    pub paxos_addr: SocketAddr,
    pub api_addr: SocketAddr,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClusterInfo {
    /// The key is NodeId and should be unique globally.
    pub nodes: BTreeMap<NodeId, Node>,

    #[serde(default)]
    pub tuning: Tuning,
}

// let user to use c.get() just like c.nodes.get()
impl Deref for ClusterInfo {
    type Target = BTreeMap<NodeId, Node>;
    fn deref(&self) -> &Self::Target {
        &self.nodes
    }
}

impl ClusterInfo {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterInfo, ConfError> {
        let content = fs::read_to_string(path)?;
        ClusterInfo::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<ClusterInfo, ConfError> {
        let mut cluster: ClusterInfo = serde_yaml::from_str(content)?;
        cluster.norm()?;
        Ok(cluster)
    }

    /// from_nodes builds a cluster from (paxos_addr, api_addr) pairs, numbering nodes from 1.
    pub fn from_nodes(addrs: &[(SocketAddr, SocketAddr)], tuning: Tuning) -> Result<ClusterInfo, ConfError> {
        let mut nodes = BTreeMap::new();
        for (i, (paxos_addr, api_addr)) in addrs.iter().enumerate() {
            let nid = i as NodeId + 1;
            nodes.insert(
                nid,
                Node {
                    node_id: nid,
                    paxos_addr: *paxos_addr,
                    api_addr: *api_addr,
                },
            );
        }

        let mut cluster = ClusterInfo { nodes, tuning };
        cluster.norm()?;
        Ok(cluster)
    }

    // fill node_id from the key and reject clusters two nodes can not tell apart.
    fn norm(&mut self) -> Result<(), ConfError> {
        if self.nodes.is_empty() {
            return Err(ConfError::EmptyCluster);
        }

        let mut seen = HashSet::new();
        for (nid, node) in self.nodes.iter_mut() {
            node.node_id = *nid;
            if !seen.insert(node.paxos_addr) {
                return Err(ConfError::DupAddr(node.paxos_addr));
            }
        }
        Ok(())
    }

    pub fn get_node(&self, nid: NodeId) -> Result<&Node, ConfError> {
        self.nodes.get(&nid).ok_or(ConfError::NodeNotFound(nid))
    }

    /// paxos_addrs returns the peer address of every node, including the local one.
    pub fn paxos_addrs(&self) -> Vec<SocketAddr> {
        self.nodes.values().map(|n| n.paxos_addr).collect()
    }

    pub fn quorum(&self) -> usize {
        quorum(self.nodes.len())
    }
}
