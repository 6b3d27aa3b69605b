use std::future::Future;
use std::net::SocketAddr;

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use super::TransportError;
use crate::protocol::InstanceIdx;

/// Reducer folds peer replies into one outcome.
pub trait Reducer<T> {
    type Output;

    /// feed takes one peer's reply, in arrival order.
    /// It returns true once further replies can not change the outcome.
    fn feed(&mut self, peer: SocketAddr, reply: Result<T, TransportError>) -> bool;

    fn finish(self) -> Self::Output;
}

/// fan_out runs `call` against every peer concurrently and reduces the replies.
///
/// Every call runs in its own task. When the reducer stops early, calls still in
/// flight keep running in the background and their replies are ignored.
pub async fn fan_out<T, F, Fut, R>(peers: &[SocketAddr], call: F, mut reducer: R) -> R::Output
where
    T: Send + 'static,
    F: Fn(SocketAddr) -> Fut,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    R: Reducer<T>,
{
    let mut pending: FuturesUnordered<_> = peers
        .iter()
        .map(|&peer| {
            let task = tokio::spawn(call(peer));
            async move { (peer, task.await) }
        })
        .collect();

    while let Some((peer, joined)) = pending.next().await {
        let reply = match joined {
            Ok(r) => r,
            Err(e) => Err(TransportError::Io(format!("call task failed: {}", e))),
        };

        if reducer.feed(peer, reply) {
            break;
        }
    }

    reducer.finish()
}

/// MajorityOutcome is what a Majority reducer saw before it stopped.
#[derive(Debug)]
pub struct MajorityOutcome<T> {
    pub quorum: usize,
    /// replies that satisfied the predicate.
    pub oks: Vec<(SocketAddr, T)>,
    /// replies that did not.
    pub rejects: Vec<(SocketAddr, T)>,
    pub failed: usize,
}

impl<T> MajorityOutcome<T> {
    pub fn reached(&self) -> bool {
        self.oks.len() >= self.quorum
    }

    /// any tells if some reply, ok or not, matches `f`.
    pub fn any<F: Fn(&T) -> bool>(&self, f: F) -> bool {
        self.oks.iter().chain(self.rejects.iter()).any(|(_, r)| f(r))
    }
}

/// Majority stops as soon as `quorum` replies satisfy `is_ok`,
/// or as soon as so many peers failed or refused that `quorum` can not be reached.
pub struct Majority<T, P> {
    total: usize,
    is_ok: P,
    outcome: MajorityOutcome<T>,
}

impl<T, P: Fn(&T) -> bool> Majority<T, P> {
    pub fn new(quorum: usize, total: usize, is_ok: P) -> Self {
        Majority {
            total,
            is_ok,
            outcome: MajorityOutcome {
                quorum,
                oks: vec![],
                rejects: vec![],
                failed: 0,
            },
        }
    }
}

impl<T, P: Fn(&T) -> bool> Reducer<T> for Majority<T, P> {
    type Output = MajorityOutcome<T>;

    fn feed(&mut self, peer: SocketAddr, reply: Result<T, TransportError>) -> bool {
        let o = &mut self.outcome;
        match reply {
            Ok(r) => {
                if (self.is_ok)(&r) {
                    o.oks.push((peer, r));
                } else {
                    o.rejects.push((peer, r));
                }
            }
            Err(_) => o.failed += 1,
        }

        let received = o.oks.len() + o.rejects.len() + o.failed;
        let remaining = self.total.saturating_sub(received);

        o.oks.len() >= o.quorum || o.oks.len() + remaining < o.quorum
    }

    fn finish(self) -> Self::Output {
        self.outcome
    }
}

/// FirstConclusive takes the first reply that carries a value.
/// Failed peers and empty replies are skipped.
pub struct FirstConclusive<T> {
    found: Option<T>,
}

impl<T> Default for FirstConclusive<T> {
    fn default() -> Self {
        FirstConclusive { found: None }
    }
}

impl<T> Reducer<Option<T>> for FirstConclusive<T> {
    type Output = Option<T>;

    fn feed(&mut self, _peer: SocketAddr, reply: Result<Option<T>, TransportError>) -> bool {
        if let Ok(Some(v)) = reply {
            self.found = Some(v);
            return true;
        }
        false
    }

    fn finish(self) -> Self::Output {
        self.found
    }
}

/// MinResponsive is the minimum over the peers that answered.
/// Unreachable peers are left out. None if no peer answered.
#[derive(Default)]
pub struct MinResponsive {
    min: Option<InstanceIdx>,
}

impl Reducer<InstanceIdx> for MinResponsive {
    type Output = Option<InstanceIdx>;

    fn feed(&mut self, _peer: SocketAddr, reply: Result<InstanceIdx, TransportError>) -> bool {
        if let Ok(v) = reply {
            self.min = Some(match self.min {
                Some(m) => m.min(v),
                None => v,
            });
        }
        false
    }

    fn finish(self) -> Self::Output {
        self.min
    }
}
