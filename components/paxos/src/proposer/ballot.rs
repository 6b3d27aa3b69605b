use std::cmp::max;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::protocol::Ballot;
use crate::protocol::NodeId;

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// BallotGen hands out strictly increasing ballots of one node.
/// Rounds start from the wall clock, so a restarted node does not reuse old rounds.
pub struct BallotGen {
    node_id: NodeId,
    round: AtomicU64,
}

impl BallotGen {
    pub fn new(node_id: NodeId) -> BallotGen {
        BallotGen {
            node_id,
            round: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> Ballot {
        let now = now_millis();
        let bump = |r: u64| max(r + 1, now);

        let prev = self
            .round
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| Some(bump(r)))
            .unwrap_or_else(|r| r);

        Ballot {
            round: bump(prev),
            node_id: self.node_id,
        }
    }

    /// observe makes the next ballot higher than `seen`.
    pub fn observe(&self, seen: Ballot) {
        self.round.fetch_max(seen.round, Ordering::SeqCst);
    }
}
