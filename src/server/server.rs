use std::mem::replace;
use std::sync::Arc;
use std::time::Duration;

use futures::Future;
use slog::debug;
use slog::info;
use slog::warn;
use slog::Logger;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Sender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use paxos::conf::ClusterInfo;
use paxos::conf::Node;
use paxos::protocol::NodeId;
use paxos::rsm::KvRsm;
use paxos::rsm::KvStateMachine;
use paxos::rsm::Rsm;
use paxos::Paxos;
use paxos::PaxosConfig;
use paxos::PaxosServer;
use storage::RawKV;

use crate::RedisApi;
use crate::ServerError;

/// Server runs a node: the redis api for clients, the paxos service for peers,
/// and background loops that catch up with the cluster and collect garbage.
pub struct Server {
    node: Node,
    cluster: ClusterInfo,
    paxos: Arc<Paxos>,
    rsm: Arc<KvRsm>,
    log: Logger,
    stop_txs: Vec<(&'static str, Sender<()>)>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    pub fn new(
        sto: Arc<dyn RawKV>,
        cluster: ClusterInfo,
        node_id: NodeId,
        log: &Logger,
    ) -> Result<Server, ServerError> {
        let node = cluster.get_node(node_id)?.clone();
        let conf = PaxosConfig {
            node_id,
            cluster: cluster.clone(),
        };

        let paxos = Arc::new(Paxos::new(&conf, sto.clone(), log)?);
        let sm = KvStateMachine::new(sto);
        let rsm = Arc::new(Rsm::new(paxos.clone(), sm, cluster.tuning.rsm_config())?);
        let log = paxos.logger().clone();

        Ok(Server {
            node,
            cluster,
            paxos,
            rsm,
            log,
            stop_txs: Vec::new(),
            join_handle: None,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn rsm(&self) -> &Arc<KvRsm> {
        &self.rsm
    }

    /// Starts api server, paxos server and background loops.
    /// It returns once both servers are listening.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        let api_lis = TcpListener::bind(self.node.api_addr).await?;
        let paxos_lis = TcpListener::bind(self.node.paxos_addr).await?;

        let (tx_api, rx_api) = oneshot::channel::<()>();
        let (tx_paxos, rx_paxos) = oneshot::channel::<()>();
        let (tx_sync, rx_sync) = oneshot::channel::<()>();
        let (tx_gc, rx_gc) = oneshot::channel::<()>();

        let redisapi = RedisApi::new(self.rsm.clone(), &self.log);
        let paxos_srv = PaxosServer::new(self.paxos.clone());
        let tuning = &self.cluster.tuning;

        let rsm = self.rsm.clone();
        let sync = periodic("sync", tuning.sync_interval(), rx_sync, self.log.clone(), move || {
            let rsm = rsm.clone();
            async move { rsm.sync().await.map(|n| n > 0).map_err(|e| e.to_string()) }
        });

        let paxos = self.paxos.clone();
        let gc = periodic("gc", tuning.gc_interval(), rx_gc, self.log.clone(), move || {
            let paxos = paxos.clone();
            async move { paxos.gc().await.map(|f| f.is_some()).map_err(|e| e.to_string()) }
        });

        let log = self.log.clone();
        let j = tokio::spawn(async move {
            let j1 = tokio::spawn(redisapi.serve_listener(api_lis, rx_api));
            let j2 = tokio::spawn(paxos_srv.serve_listener(paxos_lis, rx_paxos));
            let j3 = tokio::spawn(sync);
            let j4 = tokio::spawn(gc);

            let (r1, r2, r3, r4) = futures::join!(j1, j2, j3, j4);
            info!(log, "server tasks quit";
                "api" => ?r1, "paxos" => ?r2, "sync" => ?r3.is_ok(), "gc" => ?r4.is_ok());
        });

        self.join_handle = Some(j);

        self.stop_txs.push(("api", tx_api));
        self.stop_txs.push(("paxos", tx_paxos));
        self.stop_txs.push(("sync", tx_sync));
        self.stop_txs.push(("gc", tx_gc));

        info!(self.log, "server started";
            "api_addr" => %self.node.api_addr, "paxos_addr" => %self.node.paxos_addr);
        Ok(())
    }

    /// stop signals every task to quit. A task that already quit is reported after the others
    /// are signaled.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        let mut rst = Ok(());
        while let Some((name, tx)) = self.stop_txs.pop() {
            match tx.send(()) {
                Ok(_) => debug!(self.log, "stop signal sent"; "to" => name),
                Err(_) => rst = Err(ServerError::RxClosed),
            }
        }
        rst
    }

    pub async fn join(&mut self) -> Result<(), ServerError> {
        let j = replace(&mut self.join_handle, None);
        j.ok_or(ServerError::NotStarted)?.await?;
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// periodic calls `f` every `interval` until `stop` fires.
/// `f` returns whether it did some work.
async fn periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
    log: Logger,
    f: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, String>>,
{
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = sleep(interval) => {
                match f().await {
                    Ok(true) => debug!(log, "round done"; "loop" => name),
                    Ok(false) => {}
                    Err(e) => warn!(log, "round failed"; "loop" => name, "err" => e),
                }
            }
        }
    }
    debug!(log, "loop stopped"; "loop" => name);
}
