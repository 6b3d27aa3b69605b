use std::net::SocketAddr;
use std::sync::Arc;

use slog::debug;
use slog::Logger;

use crate::protocol::InstanceIdx;
use crate::transport::fan_out;
use crate::transport::FirstConclusive;
use crate::transport::MinResponsive;
use crate::transport::PeerClient;

/// Learner asks other nodes what they know.
pub struct Learner {
    peers: Vec<SocketAddr>,
    client: Arc<PeerClient>,
    log: Logger,
}

impl Learner {
    /// `peers` should not include the local node; its state is read locally.
    pub fn new(peers: Vec<SocketAddr>, client: Arc<PeerClient>, log: Logger) -> Learner {
        Learner { peers, client, log }
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    /// learn returns the first decided value of `instance` any peer reports.
    /// None if no reachable peer knows it.
    pub async fn learn(&self, instance: InstanceIdx) -> Option<Vec<u8>> {
        let client = self.client.clone();
        let got = fan_out(
            &self.peers,
            move |peer| {
                let c = client.clone();
                async move { c.learn_value(peer, instance).await }
            },
            FirstConclusive::default(),
        )
        .await;

        debug!(self.log, "learn"; "instance" => instance, "found" => got.is_some());
        got
    }

    /// done returns the lowest done watermark among the peers that answered.
    /// An unreachable peer is left out. None if no peer answered.
    pub async fn done(&self) -> Option<InstanceIdx> {
        let client = self.client.clone();
        fan_out(
            &self.peers,
            move |peer| {
                let c = client.clone();
                async move { c.learn_done(peer).await }
            },
            MinResponsive::default(),
        )
        .await
    }
}
