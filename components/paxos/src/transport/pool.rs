use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use slog::debug;
use slog::Logger;
use tokio::net::TcpStream;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use super::codec;
use super::FramedConn;
use super::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// the most connections, idle or in use, to one peer.
    pub max_conns_per_peer: usize,
    /// wait up to `acquire_timeout` for a free slot, or fail at once.
    pub block_when_exhausted: bool,
    pub acquire_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_conns_per_peer: 16,
            block_when_exhausted: true,
            acquire_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_millis(500),
        }
    }
}

// connections to one peer.
struct PeerConns {
    idle: Mutex<Vec<FramedConn>>,
    slots: Arc<Semaphore>,
}

impl PeerConns {
    fn idle(&self) -> MutexGuard<'_, Vec<FramedConn>> {
        // the vec is consistent even if a holder panicked.
        self.idle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Connection is a connection lent out by a ConnectionPool.
/// It holds one of the peer's slots until it is released or dropped.
pub struct Connection {
    peer: SocketAddr,
    framed: FramedConn,
    /// it was taken from the idle set rather than freshly connected.
    reused: bool,
    slot: OwnedSemaphorePermit,
}

impl Connection {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn reused(&self) -> bool {
        self.reused
    }

    pub fn framed(&mut self) -> &mut FramedConn {
        &mut self.framed
    }
}

/// ConnectionPool keeps reusable connections to every peer.
/// At most `max_conns_per_peer` connections to a peer exist at any time.
pub struct ConnectionPool {
    conf: PoolConfig,
    peers: Mutex<HashMap<SocketAddr, Arc<PeerConns>>>,
    log: Logger,
}

impl ConnectionPool {
    pub fn new(conf: PoolConfig, log: Logger) -> ConnectionPool {
        ConnectionPool {
            conf,
            peers: Mutex::new(HashMap::new()),
            log,
        }
    }

    fn peer_conns(&self, peer: SocketAddr) -> Arc<PeerConns> {
        let mut peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        let max = self.conf.max_conns_per_peer;
        peers
            .entry(peer)
            .or_insert_with(|| {
                Arc::new(PeerConns {
                    idle: Mutex::new(Vec::new()),
                    slots: Arc::new(Semaphore::new(max)),
                })
            })
            .clone()
    }

    /// acquire returns an idle connection to `peer` or opens a new one.
    /// When all slots are taken it waits or fails with NoConnectionAvailable, per config.
    pub async fn acquire(&self, peer: SocketAddr) -> Result<Connection, TransportError> {
        let pc = self.peer_conns(peer);

        let slot = if self.conf.block_when_exhausted {
            match timeout(self.conf.acquire_timeout, pc.slots.clone().acquire_owned()).await {
                Ok(Ok(p)) => p,
                _ => return Err(TransportError::NoConnectionAvailable(peer)),
            }
        } else {
            pc.slots
                .clone()
                .try_acquire_owned()
                .map_err(|_| TransportError::NoConnectionAvailable(peer))?
        };

        let idle = pc.idle().pop();
        let (framed, reused) = match idle {
            Some(f) => (f, true),
            None => (self.connect(peer).await?, false),
        };

        Ok(Connection {
            peer,
            framed,
            reused,
            slot,
        })
    }

    async fn connect(&self, peer: SocketAddr) -> Result<FramedConn, TransportError> {
        let stream = match timeout(self.conf.connect_timeout, TcpStream::connect(peer)).await {
            Ok(r) => r?,
            Err(_) => return Err(TransportError::Timeout(peer)),
        };
        stream.set_nodelay(true)?;

        debug!(self.log, "connected"; "peer" => %peer);
        Ok(codec::framed(stream))
    }

    /// release gives a connection back.
    /// A failed connection is closed instead of being reused. Either way its slot is freed.
    pub fn release(&self, conn: Connection, failed: bool) {
        let Connection {
            peer, framed, slot, ..
        } = conn;

        if failed {
            debug!(self.log, "drop failed connection"; "peer" => %peer);
            drop(framed);
            drop(slot);
            return;
        }

        let pc = self.peer_conns(peer);
        pc.idle().push(framed);
        drop(slot);
    }

    /// evict_idle closes every idle connection to `peer`, e.g. after one of them turned out
    /// to be closed by the peer. It returns the number of connections closed.
    pub fn evict_idle(&self, peer: SocketAddr) -> usize {
        let evicted: Vec<FramedConn> = self.peer_conns(peer).idle().drain(..).collect();
        if !evicted.is_empty() {
            debug!(self.log, "evict idle connections"; "peer" => %peer, "n" => evicted.len());
        }
        evicted.len()
    }

    /// idle_count returns the number of pooled connections to `peer` that are not lent out.
    pub fn idle_count(&self, peer: SocketAddr) -> usize {
        self.peer_conns(peer).idle().len()
    }
}
