use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rsm::RsmConfig;
use crate::transport::PoolConfig;

/// Tuning holds timeouts and limits. Every field is optional in yaml.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Tuning {
    pub rpc_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_conns_per_peer: usize,
    pub block_when_exhausted: bool,
    pub acquire_timeout_ms: u64,
    pub propose_retries: usize,
    pub backoff_ms: u64,
    pub sync_interval_ms: u64,
    pub gc_interval_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            rpc_timeout_ms: 1000,
            connect_timeout_ms: 500,
            max_conns_per_peer: 16,
            block_when_exhausted: true,
            acquire_timeout_ms: 1000,
            propose_retries: 10,
            backoff_ms: 20,
            sync_interval_ms: 200,
            gc_interval_ms: 5000,
        }
    }
}

impl Tuning {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_conns_per_peer: self.max_conns_per_peer,
            block_when_exhausted: self.block_when_exhausted,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    pub fn rsm_config(&self) -> RsmConfig {
        RsmConfig {
            propose_retries: self.propose_retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}
