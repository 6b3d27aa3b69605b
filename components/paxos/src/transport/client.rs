use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slog::debug;
use slog::Logger;
use tokio::time::timeout;

use super::codec;
use super::ConnectionPool;
use super::FramedConn;
use super::TransportError;
use crate::protocol::reply;
use crate::protocol::*;

/// PeerClient sends peer messages over pooled connections.
/// Every call is bounded by `rpc_timeout`.
#[derive(Clone)]
pub struct PeerClient {
    pool: Arc<ConnectionPool>,
    rpc_timeout: Duration,
    log: Logger,
}

impl PeerClient {
    pub fn new(pool: Arc<ConnectionPool>, rpc_timeout: Duration, log: Logger) -> PeerClient {
        PeerClient {
            pool,
            rpc_timeout,
            log,
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// call sends one request and waits for a reply of the same kind.
    ///
    /// A pooled connection may have been closed by the peer while it was idle, e.g. when the
    /// peer restarted. If such a connection fails before a reply arrives, the idle connections
    /// to the peer are dropped and the call is tried once more on a new connection.
    pub async fn call(&self, peer: SocketAddr, req: &Request) -> Result<reply::Body, TransportError> {
        let want = match &req.body {
            Some(b) => b.name(),
            None => return Err(TransportError::MalformedResponse("empty request".into())),
        };

        let rst = self.call_once(peer, req, want).await;
        match rst {
            Err((e, true)) if stale(&e) => {
                let n = self.pool.evict_idle(peer);
                debug!(self.log, "stale connection, retry"; "peer" => %peer, "err" => %e, "evicted" => n);
                self.call_once(peer, req, want).await.map_err(|(e, _)| e)
            }
            _ => rst.map_err(|(e, _)| e),
        }
    }

    /// call_once makes one attempt on one connection.
    /// An error comes with whether the connection was a reused one.
    async fn call_once(
        &self,
        peer: SocketAddr,
        req: &Request,
        want: &str,
    ) -> Result<reply::Body, (TransportError, bool)> {
        let mut conn = self.pool.acquire(peer).await.map_err(|e| (e, false))?;
        let reused = conn.reused();

        let rst = match timeout(self.rpc_timeout, exchange(peer, conn.framed(), req)).await {
            Ok(Ok(body)) if body.name() != want => Err(unexpected(want, &body)),
            Ok(r) => r,
            Err(_) => Err(TransportError::Timeout(peer)),
        };

        let failed = match &rst {
            Ok(_) => false,
            Err(e) => {
                debug!(self.log, "call failed"; "peer" => %peer, "err" => %e, "reused" => reused);
                e.breaks_conn()
            }
        };
        self.pool.release(conn, failed);

        rst.map_err(|e| (e, reused))
    }

    pub async fn prepare(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
        ballot: Ballot,
    ) -> Result<PrepareReply, TransportError> {
        match self.call(peer, &MakeRequest::prepare(instance, ballot)).await? {
            reply::Body::Prepare(r) => Ok(r),
            other => Err(unexpected("prepare", &other)),
        }
    }

    pub async fn accept(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
        ballot: Ballot,
        value: Vec<u8>,
    ) -> Result<AcceptReply, TransportError> {
        match self
            .call(peer, &MakeRequest::accept(instance, ballot, value))
            .await?
        {
            reply::Body::Accept(r) => Ok(r),
            other => Err(unexpected("accept", &other)),
        }
    }

    pub async fn decide(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
        value: Vec<u8>,
    ) -> Result<(), TransportError> {
        match self.call(peer, &MakeRequest::decide(instance, value)).await? {
            reply::Body::Decide(_) => Ok(()),
            other => Err(unexpected("decide", &other)),
        }
    }

    /// learn_value asks `peer` for the decided value of `instance`.
    pub async fn learn_value(
        &self,
        peer: SocketAddr,
        instance: InstanceIdx,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        match self.call(peer, &MakeRequest::learn(instance)).await? {
            reply::Body::Learn(r) => Ok(r.value),
            other => Err(unexpected("learn", &other)),
        }
    }

    /// learn_done asks `peer` for its done watermark.
    pub async fn learn_done(&self, peer: SocketAddr) -> Result<InstanceIdx, TransportError> {
        match self.call(peer, &MakeRequest::done()).await? {
            reply::Body::Done(r) => Ok(r.done),
            other => Err(unexpected("done", &other)),
        }
    }
}

async fn exchange(
    peer: SocketAddr,
    conn: &mut FramedConn,
    req: &Request,
) -> Result<reply::Body, TransportError> {
    codec::send_msg(conn, req).await?;

    let rep: Reply = match codec::recv_msg(conn).await? {
        Some(r) => r,
        None => return Err(TransportError::Closed(peer)),
    };

    match rep.body {
        Some(reply::Body::Error(e)) => Err(TransportError::Remote(e.msg)),
        Some(body) => Ok(body),
        None => Err(TransportError::MalformedResponse("empty reply".into())),
    }
}

fn unexpected(want: &str, got: &reply::Body) -> TransportError {
    TransportError::MalformedResponse(format!("want {} reply, got {}", want, got.name()))
}

// the connection was found dead, not the peer.
fn stale(e: &TransportError) -> bool {
    matches!(e, TransportError::Closed(_) | TransportError::Io(_))
}
