use std::net::SocketAddr;
use std::sync::Arc;

// for boxed()
use futures::future::FutureExt;
use futures::Future;
use slog::debug;
use slog::info;
use slog::warn;
use slog::Logger;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::task::JoinSet;

use crate::protocol::Request;
use crate::transport::framed;
use crate::transport::recv_msg;
use crate::transport::send_msg;
use crate::Paxos;

/// PaxosServer serves peer messages for a Paxos node.
/// Requests on one connection are answered in order.
#[derive(Clone)]
pub struct PaxosServer {
    paxos: Arc<Paxos>,
    log: Logger,
}

impl PaxosServer {
    pub fn new(paxos: Arc<Paxos>) -> PaxosServer {
        let log = paxos.logger().new(slog::o!("server" => "paxos"));
        PaxosServer { paxos, log }
    }

    /// serve_listener serves on an already bound listener until `signal` resolves.
    pub async fn serve_listener<F>(self, lis: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future + Send,
    {
        // impl Unpin
        let mut sig = signal.boxed();

        // connection tasks quit with the server.
        let mut conns = JoinSet::new();

        info!(self.log, "paxos server listened"; "addr" => %lis.local_addr()?);
        loop {
            tokio::select! {
                _v = (&mut sig) => {
                    break;
                },
                Some(_) = conns.join_next(), if !conns.is_empty() => {},
                inc = lis.accept() => {
                    let (sock, peer) = match inc {
                        Ok(x) => x,
                        Err(e) => {
                            warn!(self.log, "accept failed"; "err" => %e);
                            continue;
                        }
                    };
                    let slf = self.clone();
                    conns.spawn(async move {
                        slf.handle_new_conn(sock, peer).await;
                    });
                }
            }
        }

        debug!(self.log, "close connections"; "n" => conns.len());
        conns.shutdown().await;

        info!(self.log, "paxos server stopped");
        Ok(())
    }

    async fn handle_new_conn(self, sock: TcpStream, peer: SocketAddr) {
        debug!(self.log, "new connection"; "peer" => %peer);

        if let Err(e) = sock.set_nodelay(true) {
            warn!(self.log, "set_nodelay failed"; "peer" => %peer, "err" => %e);
        }
        let mut conn = framed(sock);

        loop {
            let req: Request = match recv_msg(&mut conn).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    debug!(self.log, "peer closed"; "peer" => %peer);
                    return;
                }
                Err(e) => {
                    warn!(self.log, "bad request, close connection"; "peer" => %peer, "err" => %e);
                    return;
                }
            };

            let rep = self.paxos.handle(req);

            if let Err(e) = send_msg(&mut conn, &rep).await {
                warn!(self.log, "failed to reply"; "peer" => %peer, "err" => %e);
                return;
            }
        }
    }
}
