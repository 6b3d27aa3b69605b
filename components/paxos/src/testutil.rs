use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use slog::o;
use slog::Logger;
use storage::MemEngine;
use storage::RawKV;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::conf::ClusterInfo;
use crate::conf::Tuning;
use crate::protocol::NodeId;
use crate::Paxos;
use crate::PaxosConfig;
use crate::PaxosServer;

pub fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

pub fn new_mem_storage() -> Arc<dyn RawKV> {
    Arc::new(MemEngine::default())
}

/// dead_addr returns a local address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let lis = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    lis.local_addr().unwrap()
}

/// test_tuning is a Tuning with short timeouts, so that a dead node is detected quickly.
pub fn test_tuning() -> Tuning {
    Tuning {
        rpc_timeout_ms: 500,
        connect_timeout_ms: 200,
        acquire_timeout_ms: 500,
        propose_retries: 30,
        backoff_ms: 5,
        sync_interval_ms: 20,
        gc_interval_ms: 50,
        ..Default::default()
    }
}

pub struct TestNode {
    pub paxos: Arc<Paxos>,
    pub storage: Arc<dyn RawKV>,
}

/// TestCluster runs paxos servers of a cluster on local ephemeral ports.
pub struct TestCluster {
    pub cluster: ClusterInfo,
    pub nodes: BTreeMap<NodeId, TestNode>,
    txs: Vec<oneshot::Sender<()>>,
}

impl TestCluster {
    pub async fn new(n: usize) -> Self {
        TestCluster::with_down(n, &[]).await
    }

    /// with_down creates a cluster of `n` nodes numbered from 1.
    /// Nodes in `down` are members of the cluster but never started.
    pub async fn with_down(n: usize, down: &[NodeId]) -> Self {
        let mut listeners = BTreeMap::new();
        let mut addrs = vec![];

        for i in 1..=n as NodeId {
            let paxos_addr = if down.contains(&i) {
                dead_addr()
            } else {
                let lis = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let addr = lis.local_addr().unwrap();
                listeners.insert(i, lis);
                addr
            };
            addrs.push((paxos_addr, dead_addr()));
        }

        let cluster = ClusterInfo::from_nodes(&addrs, test_tuning()).unwrap();

        let mut tc = TestCluster {
            cluster,
            nodes: BTreeMap::new(),
            txs: vec![],
        };

        for (nid, lis) in listeners {
            let storage = new_mem_storage();
            let conf = PaxosConfig {
                node_id: nid,
                cluster: tc.cluster.clone(),
            };
            let paxos = Arc::new(Paxos::new(&conf, storage.clone(), &discard_logger()).unwrap());

            let (tx, rx) = oneshot::channel::<()>();
            let srv = PaxosServer::new(paxos.clone());
            tokio::spawn(async move {
                srv.serve_listener(lis, rx).await.unwrap();
            });

            tc.txs.push(tx);
            tc.nodes.insert(nid, TestNode { paxos, storage });
        }

        tc
    }

    pub fn paxos(&self, nid: NodeId) -> &Arc<Paxos> {
        &self.nodes[&nid].paxos
    }

    pub fn stop(&mut self) {
        while let Some(tx) = self.txs.pop() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        self.stop()
    }
}
