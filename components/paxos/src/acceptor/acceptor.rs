use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use slog::debug;
use slog::Logger;
use storage::StorageError;

use crate::protocol::AcceptReply;
use crate::protocol::AcceptorState;
use crate::protocol::Ballot;
use crate::protocol::InstanceIdx;
use crate::protocol::PrepareReply;
use crate::store::PaxosStore;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Acceptor answers prepare and accept for every instance.
///
/// Each instance is guarded by its own lock, so different instances proceed in parallel
/// while two requests for the same instance are serialized.
/// A state is persisted before the reply that reveals it.
pub struct Acceptor {
    store: Arc<PaxosStore>,
    slots: Mutex<HashMap<InstanceIdx, Arc<Mutex<AcceptorState>>>>,
    log: Logger,
}

impl Acceptor {
    pub fn new(store: Arc<PaxosStore>, log: Logger) -> Acceptor {
        Acceptor {
            store,
            slots: Mutex::new(HashMap::new()),
            log,
        }
    }

    fn slot(&self, instance: InstanceIdx) -> Result<Arc<Mutex<AcceptorState>>, StorageError> {
        let mut slots = lock(&self.slots);
        if let Some(s) = slots.get(&instance) {
            return Ok(s.clone());
        }

        let st = self.store.acceptor_state(instance)?.unwrap_or_default();
        let s = Arc::new(Mutex::new(st));
        slots.insert(instance, s.clone());
        Ok(s)
    }

    fn forgotten(&self, instance: InstanceIdx) -> bool {
        instance < self.store.gc_floor()
    }

    /// handle_prepare promises not to accept anything below `ballot`
    /// if `ballot` is higher than every ballot seen for the instance.
    pub fn handle_prepare(
        &self,
        instance: InstanceIdx,
        ballot: Ballot,
    ) -> Result<PrepareReply, StorageError> {
        let forgotten = PrepareReply {
            forgotten: true,
            ..Default::default()
        };
        if self.forgotten(instance) {
            return Ok(forgotten);
        }

        let slot = self.slot(instance)?;
        let mut st = lock(&slot);
        if self.forgotten(instance) {
            return Ok(forgotten);
        }

        let ok = st.promised.map_or(true, |p| ballot > p);
        if ok {
            let mut next = st.clone();
            next.promised = Some(ballot);
            self.store.set_acceptor_state(instance, &next)?;
            *st = next;
        }

        debug!(self.log, "prepare";
            "instance" => instance, "ballot" => %ballot, "ok" => ok);

        Ok(PrepareReply {
            ok,
            last_ballot: st.promised,
            accepted_ballot: st.accepted,
            accepted_value: st.value.clone(),
            forgotten: false,
        })
    }

    /// handle_accept takes `value` unless a higher ballot has been promised.
    pub fn handle_accept(
        &self,
        instance: InstanceIdx,
        ballot: Ballot,
        value: Vec<u8>,
    ) -> Result<AcceptReply, StorageError> {
        let forgotten = AcceptReply {
            forgotten: true,
            ..Default::default()
        };
        if self.forgotten(instance) {
            return Ok(forgotten);
        }

        let slot = self.slot(instance)?;
        let mut st = lock(&slot);
        if self.forgotten(instance) {
            return Ok(forgotten);
        }

        let ok = st.promised.map_or(true, |p| ballot >= p);
        if ok {
            let next = AcceptorState {
                promised: Some(ballot),
                accepted: Some(ballot),
                value: Some(value),
            };
            self.store.set_acceptor_state(instance, &next)?;
            *st = next;
        }

        debug!(self.log, "accept";
            "instance" => instance, "ballot" => %ballot, "ok" => ok);

        Ok(AcceptReply {
            ok,
            last_ballot: st.promised,
            forgotten: false,
        })
    }

    /// forget_below drops cached states of instances below `floor`.
    /// Their durable states are removed by `PaxosStore::forget_below`.
    pub fn forget_below(&self, floor: InstanceIdx) {
        lock(&self.slots).retain(|i, _| *i >= floor);
    }

    pub fn cached(&self) -> usize {
        lock(&self.slots).len()
    }
}
