use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use slog::debug;
use slog::info;
use slog::Logger;

use super::BallotGen;
use super::Phase;
use super::ProposeError;
use crate::acceptor::Acceptor;
use crate::protocol::quorum;
use crate::protocol::AcceptReply;
use crate::protocol::Ballot;
use crate::protocol::Decision;
use crate::protocol::InstanceIdx;
use crate::protocol::PrepareReply;
use crate::store::PaxosStore;
use crate::transport::fan_out;
use crate::transport::Majority;
use crate::transport::MajorityOutcome;
use crate::transport::PeerClient;
use crate::transport::TransportError;

/// Proposer drives an instance to a decision with the classic two phases.
/// The local acceptor is called directly; other acceptors are reached through `client`.
pub struct Proposer {
    me: SocketAddr,
    /// every acceptor of the cluster, including the local one.
    cluster: Vec<SocketAddr>,
    ballots: BallotGen,
    acceptor: Arc<Acceptor>,
    client: Arc<PeerClient>,
    store: Arc<PaxosStore>,
    log: Logger,
}

impl Proposer {
    pub fn new(
        me: SocketAddr,
        cluster: Vec<SocketAddr>,
        ballots: BallotGen,
        acceptor: Arc<Acceptor>,
        client: Arc<PeerClient>,
        store: Arc<PaxosStore>,
        log: Logger,
    ) -> Proposer {
        Proposer {
            me,
            cluster,
            ballots,
            acceptor,
            client,
            store,
            log,
        }
    }

    /// propose tries once to get `value` decided for `instance`.
    ///
    /// The decided value may be another proposer's: if any acceptor in the promising majority
    /// has accepted something, the one with the highest ballot is proposed instead of `value`.
    pub async fn propose(
        &self,
        instance: InstanceIdx,
        value: Vec<u8>,
    ) -> Result<Decision, ProposeError> {
        if instance < self.store.gc_floor() {
            return Err(ProposeError::Forgotten(instance));
        }

        if let Some(v) = self.store.decided(instance)? {
            return Ok(Decision { instance, value: v });
        }

        let n = self.cluster.len();
        let q = quorum(n);
        let ballot = self.ballots.next();

        let promises = fan_out(
            &self.cluster,
            |peer| self.prepare_on(peer, instance, ballot),
            Majority::new(q, n, |r: &PrepareReply| r.ok),
        )
        .await;

        if promises.any(|r| r.forgotten) {
            return Err(ProposeError::Forgotten(instance));
        }
        if !promises.reached() {
            self.observe(&promises, |r| r.last_ballot);
            debug!(self.log, "prepare rejected";
                "instance" => instance, "ballot" => %ballot, "oks" => promises.oks.len());
            return Err(ProposeError::NoMajority(Phase::Prepare, q, promises.oks.len()));
        }

        let chosen = promises
            .oks
            .iter()
            .filter_map(|(_, r)| Some((r.accepted_ballot?, r.accepted_value.as_ref()?)))
            .max_by_key(|(b, _)| *b)
            .map(|(_, v)| v.clone())
            .unwrap_or(value);

        let accepts = fan_out(
            &self.cluster,
            |peer| self.accept_on(peer, instance, ballot, chosen.clone()),
            Majority::new(q, n, |r: &AcceptReply| r.ok),
        )
        .await;

        if accepts.any(|r| r.forgotten) {
            return Err(ProposeError::Forgotten(instance));
        }
        if !accepts.reached() {
            self.observe(&accepts, |r| r.last_ballot);
            debug!(self.log, "accept rejected";
                "instance" => instance, "ballot" => %ballot, "oks" => accepts.oks.len());
            return Err(ProposeError::NoMajority(Phase::Accept, q, accepts.oks.len()));
        }

        self.store.record_decision(instance, &chosen)?;
        info!(self.log, "decided"; "instance" => instance, "ballot" => %ballot);

        self.broadcast_decide(instance, &chosen);

        Ok(Decision {
            instance,
            value: chosen,
        })
    }

    // let the next ballot outrun the highest one that turned us down.
    fn observe<T, F: Fn(&T) -> Option<Ballot>>(&self, outcome: &MajorityOutcome<T>, last: F) {
        if let Some(b) = outcome.rejects.iter().filter_map(|(_, r)| last(r)).max() {
            self.ballots.observe(b);
        }
    }

    fn prepare_on(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
        ballot: Ballot,
    ) -> impl Future<Output = Result<PrepareReply, TransportError>> + Send + 'static {
        let local = peer == self.me;
        let acceptor = self.acceptor.clone();
        let client = self.client.clone();

        async move {
            if local {
                acceptor
                    .handle_prepare(instance, ballot)
                    .map_err(|e| TransportError::Remote(e.to_string()))
            } else {
                client.prepare(peer, instance, ballot).await
            }
        }
    }

    fn accept_on(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
        ballot: Ballot,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<AcceptReply, TransportError>> + Send + 'static {
        let local = peer == self.me;
        let acceptor = self.acceptor.clone();
        let client = self.client.clone();

        async move {
            if local {
                acceptor
                    .handle_accept(instance, ballot, value)
                    .map_err(|e| TransportError::Remote(e.to_string()))
            } else {
                client.accept(peer, instance, ballot, value).await
            }
        }
    }

    /// broadcast_decide tells the other nodes about a decision without waiting for them.
    fn broadcast_decide(&self, instance: InstanceIdx, value: &[u8]) {
        for &peer in self.cluster.iter().filter(|p| **p != self.me) {
            let client = self.client.clone();
            let value = value.to_vec();
            let log = self.log.clone();

            tokio::spawn(async move {
                if let Err(e) = client.decide(peer, instance, value).await {
                    debug!(log, "decide not delivered";
                        "peer" => %peer, "instance" => instance, "err" => %e);
                }
            });
        }
    }
}
