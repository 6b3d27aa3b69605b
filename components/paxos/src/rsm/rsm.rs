use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use rand::Rng;
use slog::debug;
use slog::error;
use slog::info;
use slog::Logger;
use storage::WriteEntry;
use tokio::sync::Mutex;

use super::KvStateMachine;
use super::RsmError;
use crate::proposer::now_millis;
use crate::proposer::ProposeError;
use crate::protocol::encode_msg;
use crate::protocol::Command;
use crate::protocol::Entry;
use crate::protocol::InstanceIdx;
use crate::protocol::NodeId;
use crate::protocol::KvReply;
use crate::store::PaxosStore;
use crate::Paxos;

/// StateMachine is what the log drives. Entries are applied one at a time, in instance order.
pub trait StateMachine: Send + Sync {
    /// apply returns the writes that make up the effect of `payload` and the result for the
    /// submitter. The writes are committed together with the new applied position.
    ///
    /// It must be deterministic: every node applies the same payloads in the same order.
    /// A payload the state machine rejects should yield an error result, not an Err;
    /// an Err stops applying until it is retried.
    fn apply(&self, payload: &[u8]) -> Result<(Vec<WriteEntry>, Vec<u8>), RsmError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsmConfig {
    /// how many times a submission is retried after a round failed to reach a majority.
    pub propose_retries: usize,
    /// the base of the randomized wait between retries.
    pub backoff: Duration,
}

impl Default for RsmConfig {
    fn default() -> Self {
        RsmConfig {
            propose_retries: 10,
            backoff: Duration::from_millis(20),
        }
    }
}

/// Rsm is a replicated state machine built on a Paxos log.
pub struct Rsm<S> {
    paxos: Arc<Paxos>,
    sm: S,
    conf: RsmConfig,
    seq: AtomicU64,
    /// the next instance to apply. Holding it serializes submitting and applying.
    next: Mutex<InstanceIdx>,
    log: Logger,
}

pub type KvRsm = Rsm<KvStateMachine>;

/// CaughtUp counts the entries applied by a catch-up,
/// and keeps the result of the one a pending submission is waiting for.
#[derive(Default)]
struct CaughtUp {
    count: usize,
    mine: Option<Vec<u8>>,
}

impl CaughtUp {
    fn add(&mut self, entry: Entry, out: Vec<u8>, mine: Option<(NodeId, u64)>) {
        self.count += 1;
        if let Some((origin, seq)) = mine {
            if entry.is_from(origin, seq) {
                self.mine = Some(out);
            }
        }
    }
}

impl<S: StateMachine> Rsm<S> {
    pub fn new(paxos: Arc<Paxos>, sm: S, conf: RsmConfig) -> Result<Rsm<S>, RsmError> {
        let next = paxos.store().next_instance()?;
        let log = paxos.logger().new(slog::o!("role" => "rsm"));

        info!(log, "rsm created"; "next_instance" => next);

        Ok(Rsm {
            paxos,
            sm,
            conf,
            // a restarted node must not reuse a seq it may have proposed before.
            seq: AtomicU64::new(now_millis() * 1000),
            next: Mutex::new(next),
            log,
        })
    }

    pub fn paxos(&self) -> &Arc<Paxos> {
        &self.paxos
    }

    pub async fn next_instance(&self) -> InstanceIdx {
        *self.next.lock().await
    }

    fn store(&self) -> &PaxosStore {
        self.paxos.store()
    }

    /// submit gets `cmd` into the log and returns its result once it is applied locally.
    ///
    /// Every instance before the one that carries `cmd` is applied first.
    pub async fn submit(&self, cmd: Vec<u8>) -> Result<Vec<u8>, RsmError> {
        let origin = self.paxos.node_id();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let value = encode_msg(&Entry {
            origin,
            seq,
            payload: Some(cmd),
        });

        let mut next = self.next.lock().await;
        let mut failures = 0;

        loop {
            // our entry may have been decided by a proposer that adopted it.
            let caught = self.catch_up_local(&mut next, Some((origin, seq)))?;
            if let Some(out) = caught.mine {
                return Ok(out);
            }

            let instance = *next;
            match self.paxos.propose(instance, value.clone()).await {
                Ok(d) => {
                    let (entry, out) = self.apply(&mut next, d.instance, &d.value)?;
                    if entry.is_from(origin, seq) {
                        return Ok(out);
                    }
                    debug!(self.log, "instance taken by another entry, retry";
                        "instance" => instance, "origin" => entry.origin);
                }
                Err(ProposeError::NoMajority(phase, want, got)) if failures < self.conf.propose_retries => {
                    failures += 1;
                    debug!(self.log, "no majority, retry";
                        "instance" => instance, "phase" => ?phase, "want" => want, "got" => got,
                        "failures" => failures);
                    self.backoff(failures).await;
                }
                Err(ProposeError::Forgotten(i)) => {
                    // the cluster moved past us; learn what we missed and retry.
                    info!(self.log, "instance forgotten by peers"; "instance" => i);
                    let caught = self.catch_up_remote(&mut next, Some((origin, seq))).await?;
                    if let Some(out) = caught.mine {
                        return Ok(out);
                    }
                    if caught.count == 0 {
                        return Err(ProposeError::Forgotten(i).into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn backoff(&self, failures: usize) {
        let base = self.conf.backoff.as_millis() as u64;
        let max = base.saturating_mul(failures as u64).max(1);
        let ms = rand::thread_rng().gen_range(0..=max);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// sync applies instances decided elsewhere. It returns the number of instances applied.
    ///
    /// If a later instance is known decided while the next one is not, a no-op is proposed
    /// for the next one so that a gap does not block applying.
    pub async fn sync(&self) -> Result<usize, RsmError> {
        let mut next = self.next.lock().await;
        let mut n = self.catch_up_remote(&mut next, None).await?.count;

        if let Some(later) = self.store().first_decided_after(*next) {
            let instance = *next;
            debug!(self.log, "fill gap with no-op"; "instance" => instance, "later" => later);

            let noop = encode_msg(&Entry {
                origin: self.paxos.node_id(),
                seq: self.seq.fetch_add(1, Ordering::SeqCst),
                payload: None,
            });
            let d = self.paxos.propose(instance, noop).await?;
            self.apply(&mut next, d.instance, &d.value)?;
            n += 1;
            n += self.catch_up_local(&mut next, None)?.count;
        }

        Ok(n)
    }

    // applies what is already decided in the local store.
    fn catch_up_local(
        &self,
        next: &mut InstanceIdx,
        mine: Option<(NodeId, u64)>,
    ) -> Result<CaughtUp, RsmError> {
        let mut caught = CaughtUp::default();
        while let Some(v) = self.store().decided(*next)? {
            let i = *next;
            let (entry, out) = self.apply(next, i, &v)?;
            caught.add(entry, out, mine);
        }
        Ok(caught)
    }

    // applies what the local store or any peer knows decided.
    async fn catch_up_remote(
        &self,
        next: &mut InstanceIdx,
        mine: Option<(NodeId, u64)>,
    ) -> Result<CaughtUp, RsmError> {
        let mut caught = CaughtUp::default();
        while let Some(v) = self.paxos.learn(*next).await? {
            let i = *next;
            let (entry, out) = self.apply(next, i, &v)?;
            caught.add(entry, out, mine);
        }
        Ok(caught)
    }

    /// apply runs the entry decided for `instance`, which must be the next one to apply.
    /// The state machine writes, the applied position and the done watermark are committed
    /// in one batch.
    fn apply(
        &self,
        next: &mut InstanceIdx,
        instance: InstanceIdx,
        value: &[u8],
    ) -> Result<(Entry, Vec<u8>), RsmError> {
        debug_assert_eq!(*next, instance);

        let entry = match Entry::decode(value) {
            Ok(e) => e,
            Err(e) => {
                // every node sees the same bytes, so every node skips it alike.
                error!(self.log, "undecodable entry applied as no-op";
                    "instance" => instance, "err" => %e);
                Entry::default()
            }
        };

        let (mut writes, out) = match &entry.payload {
            Some(p) => self.sm.apply(p)?,
            None => (vec![], vec![]),
        };

        writes.push(PaxosStore::next_instance_entry(instance + 1));
        writes.push(PaxosStore::done_entry(instance));
        self.store().write_batch(&writes)?;

        *next = instance + 1;
        debug!(self.log, "applied"; "instance" => instance, "noop" => entry.payload.is_none());

        Ok((entry, out))
    }
}

impl Rsm<KvStateMachine> {
    /// execute submits a key-value command and decodes its reply.
    pub async fn execute(&self, cmd: Command) -> Result<KvReply, RsmError> {
        let out = self.submit(encode_msg(&cmd)).await?;
        Ok(KvReply::decode(out.as_slice())?)
    }
}
