use std::net::SocketAddr;
use std::sync::Arc;

use slog::info;
use slog::o;
use slog::warn;
use slog::Logger;
use storage::RawKV;

use crate::acceptor::Acceptor;
use crate::conf::ClusterInfo;
use crate::learner::Learner;
use crate::proposer::BallotGen;
use crate::proposer::ProposeError;
use crate::proposer::Proposer;
use crate::protocol::*;
use crate::store::PaxosStore;
use crate::transport::ConnectionPool;
use crate::transport::PeerClient;
use crate::PaxosError;

#[derive(Debug, Clone)]
pub struct PaxosConfig {
    pub node_id: NodeId,
    pub cluster: ClusterInfo,
}

/// Paxos is one node of a multi-instance paxos cluster: a proposer, an acceptor and a learner
/// sharing one store.
pub struct Paxos {
    node_id: NodeId,
    addr: SocketAddr,
    store: Arc<PaxosStore>,
    acceptor: Arc<Acceptor>,
    proposer: Proposer,
    learner: Learner,
    log: Logger,
}

impl Paxos {
    pub fn new(conf: &PaxosConfig, sto: Arc<dyn RawKV>, log: &Logger) -> Result<Paxos, PaxosError> {
        let node = conf.cluster.get_node(conf.node_id)?;
        let me = node.paxos_addr;
        let tuning = &conf.cluster.tuning;

        let log = log.new(o!("node_id" => conf.node_id));

        let cluster = conf.cluster.paxos_addrs();
        let others: Vec<SocketAddr> = cluster.iter().cloned().filter(|a| *a != me).collect();

        let store = Arc::new(PaxosStore::open(sto)?);
        let acceptor = Arc::new(Acceptor::new(store.clone(), log.new(o!("role" => "acceptor"))));

        let pool = Arc::new(ConnectionPool::new(tuning.pool_config(), log.clone()));
        let client = Arc::new(PeerClient::new(pool, tuning.rpc_timeout(), log.clone()));

        let proposer = Proposer::new(
            me,
            cluster,
            BallotGen::new(conf.node_id),
            acceptor.clone(),
            client.clone(),
            store.clone(),
            log.new(o!("role" => "proposer")),
        );
        let learner = Learner::new(others, client, log.new(o!("role" => "learner")));

        info!(log, "paxos node created";
            "addr" => %me, "gc_floor" => store.gc_floor());

        Ok(Paxos {
            node_id: conf.node_id,
            addr: me,
            store,
            acceptor,
            proposer,
            learner,
            log,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn store(&self) -> &Arc<PaxosStore> {
        &self.store
    }

    pub fn logger(&self) -> &Logger {
        &self.log
    }

    /// propose runs one round to decide `instance`. See `Proposer::propose`.
    pub async fn propose(
        &self,
        instance: InstanceIdx,
        value: Vec<u8>,
    ) -> Result<Decision, ProposeError> {
        self.proposer.propose(instance, value).await
    }

    /// learn returns the decided value of `instance`, from the local store or from a peer.
    /// A value learned from a peer is recorded locally.
    pub async fn learn(&self, instance: InstanceIdx) -> Result<Option<Vec<u8>>, PaxosError> {
        if let Some(v) = self.store.decided(instance)? {
            return Ok(Some(v));
        }
        if instance < self.store.gc_floor() {
            return Ok(None);
        }

        match self.learner.learn(instance).await {
            Some(v) => {
                self.store.record_decision(instance, &v)?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    /// done returns the local done watermark.
    pub fn done(&self) -> Result<InstanceIdx, PaxosError> {
        Ok(self.store.done()?)
    }

    /// set_done raises the local done watermark. It never goes down.
    pub fn set_done(&self, instance: InstanceIdx) -> Result<InstanceIdx, PaxosError> {
        Ok(self.store.set_done(instance)?)
    }

    /// cluster_done is the lowest done watermark among this node and the peers that answer.
    pub async fn cluster_done(&self) -> Result<InstanceIdx, PaxosError> {
        let local = self.done()?;
        Ok(match self.learner.done().await {
            Some(remote) => local.min(remote),
            None => local,
        })
    }

    /// gc forgets every instance at or below the cluster done watermark.
    /// It returns the new gc floor if it moved.
    ///
    /// If no peer answers, nothing is forgotten unless this node is the whole cluster.
    pub async fn gc(&self) -> Result<Option<InstanceIdx>, PaxosError> {
        let local = self.done()?;
        let done = match self.learner.done().await {
            Some(remote) => local.min(remote),
            None if self.learner.peers().is_empty() => local,
            None => return Ok(None),
        };

        let floor = done + 1;
        if floor <= self.store.gc_floor() {
            return Ok(None);
        }

        let n = self.store.forget_below(floor)?;
        self.acceptor.forget_below(floor);

        info!(self.log, "gc"; "floor" => floor, "dropped" => n);
        Ok(Some(floor))
    }

    /// handle serves a request from a peer.
    pub fn handle(&self, req: Request) -> Reply {
        match self.dispatch(req) {
            Ok(body) => MakeReply::of(body),
            Err(e) => {
                warn!(self.log, "failed to handle request"; "err" => %e);
                MakeReply::error(e)
            }
        }
    }

    fn dispatch(&self, req: Request) -> Result<reply::Body, PaxosError> {
        let body = req.body.ok_or(ProtocolError::LackOf("body".into()))?;

        let rep = match body {
            request::Body::Prepare(r) => {
                check_instance(r.instance)?;
                let ballot = r.ballot.ok_or(ProtocolError::LackOf("ballot".into()))?;
                reply::Body::Prepare(self.acceptor.handle_prepare(r.instance, ballot)?)
            }
            request::Body::Accept(r) => {
                check_instance(r.instance)?;
                let ballot = r.ballot.ok_or(ProtocolError::LackOf("ballot".into()))?;
                reply::Body::Accept(self.acceptor.handle_accept(r.instance, ballot, r.value)?)
            }
            request::Body::Decide(r) => {
                check_instance(r.instance)?;
                self.store.record_decision(r.instance, &r.value)?;
                reply::Body::Decide(DecideReply {})
            }
            request::Body::Learn(r) => reply::Body::Learn(LearnReply {
                value: self.store.decided(r.instance)?,
            }),
            request::Body::Done(_) => reply::Body::Done(DoneReply {
                done: self.store.done()?,
            }),
        };

        Ok(rep)
    }
}

fn check_instance(instance: InstanceIdx) -> Result<(), ProtocolError> {
    if instance < 0 {
        return Err(ProtocolError::NegativeInstance(instance));
    }
    Ok(())
}
