use std::net::SocketAddr;
use std::sync::Arc;

// for boxed()
use futures::future::FutureExt;
use futures::Future;
use futures::SinkExt;
use futures::StreamExt;
use slog::debug;
use slog::info;
use slog::warn;
use slog::Logger;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;

use paxos::protocol::Command;
use paxos::protocol::KvReply;
use paxos::protocol::OpCode;
use paxos::rsm::KvRsm;

use super::RedisApiError;
use super::RespCodec;
use super::Response;

/// RedisApi serves a subset of the redis protocol on top of the replicated key-value store.
/// Every command, reads included, goes through the log.
#[derive(Clone)]
pub struct RedisApi {
    rsm: Arc<KvRsm>,
    log: Logger,
}

impl RedisApi {
    pub fn new(rsm: Arc<KvRsm>, log: &Logger) -> RedisApi {
        RedisApi {
            rsm,
            log: log.new(slog::o!("server" => "redisapi")),
        }
    }

    pub async fn serve_listener<F>(self, lis: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future + Send,
    {
        // impl Unpin
        let mut sig = signal.boxed();

        // connection tasks quit with the server.
        let mut conns = JoinSet::new();

        info!(self.log, "redis api listened"; "addr" => %lis.local_addr()?);
        loop {
            tokio::select! {
                _v = (&mut sig) => {
                    break;
                },
                Some(_) = conns.join_next(), if !conns.is_empty() => {},
                inc = lis.accept() => {
                    let (sock, cli) = match inc {
                        Ok(x) => x,
                        Err(e) => {
                            warn!(self.log, "accept failed"; "err" => %e);
                            continue;
                        }
                    };
                    let slf = self.clone();
                    conns.spawn(async move {
                        slf.handle_new_conn(sock, cli).await;
                    });
                }
            }
        }

        debug!(self.log, "close connections"; "n" => conns.len());
        conns.shutdown().await;

        info!(self.log, "redis api stopped");
        Ok(())
    }

    async fn handle_new_conn(self, sock: TcpStream, cli: SocketAddr) {
        debug!(self.log, "new connection"; "client" => %cli);

        let mut conn = Framed::new(sock, RespCodec::default());

        while let Some(req) = conn.next().await {
            let tokens = match req {
                Ok(t) => t,
                Err(e) => {
                    warn!(self.log, "bad request, close connection"; "client" => %cli, "err" => %e);
                    let _ = conn.send(Response::Error(format!("ERR {}", e))).await;
                    return;
                }
            };

            let r = self.exec_redis_cmd(&tokens).await;
            if let Err(e) = conn.send(r).await {
                warn!(self.log, "failed to reply"; "client" => %cli, "err" => %e);
                return;
            }
        }

        debug!(self.log, "client closed"; "client" => %cli);
    }

    /// exec_redis_cmd runs one command. `tokens[0]` is the command name, case insensitive.
    pub async fn exec_redis_cmd(&self, tokens: &[Vec<u8>]) -> Response {
        let (first, args) = match tokens.split_first() {
            Some(x) => x,
            None => return Response::Error("ERR empty command".into()),
        };
        let name = String::from_utf8_lossy(first).to_ascii_uppercase();

        let r = match name.as_str() {
            "PING" => self.cmd_ping(args),
            "GET" => self.cmd_get(args).await,
            "SET" => self.cmd_set(args).await,
            "DEL" => self.cmd_del(args).await,
            // redis-cli asks for command docs on connect.
            "COMMAND" => Ok(Response::Array(vec![])),
            _ => Err(Response::Error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(first)
            ))),
        };

        match r {
            Ok(rr) => rr,
            Err(rr) => rr,
        }
    }

    fn cmd_ping(&self, args: &[Vec<u8>]) -> Result<Response, Response> {
        match args {
            [] => Ok(Response::Status("PONG".into())),
            [msg] => Ok(Response::Data(msg.clone())),
            _ => Err(wrong_arity("ping")),
        }
    }

    async fn cmd_get(&self, args: &[Vec<u8>]) -> Result<Response, Response> {
        let key = match args {
            [key] => key,
            _ => return Err(wrong_arity("get")),
        };

        let r = self.execute(Command::of(OpCode::Get, key, b"")).await?;
        if r.found {
            Ok(Response::Data(r.value))
        } else {
            Ok(Response::Nil)
        }
    }

    async fn cmd_set(&self, args: &[Vec<u8>]) -> Result<Response, Response> {
        let (key, value) = match args {
            [key, value] => (key, value),
            _ => return Err(wrong_arity("set")),
        };

        self.execute(Command::of(OpCode::Set, key, value)).await?;
        Ok(Response::Status("OK".into()))
    }

    /// cmd_del removes every given key and returns the number of keys that existed.
    async fn cmd_del(&self, args: &[Vec<u8>]) -> Result<Response, Response> {
        if args.is_empty() {
            return Err(wrong_arity("del"));
        }

        let mut removed = 0;
        for key in args.iter() {
            let r = self.execute(Command::of(OpCode::Delete, key, b"")).await?;
            if r.found {
                removed += 1;
            }
        }
        Ok(Response::Integer(removed))
    }

    async fn execute(&self, cmd: Command) -> Result<KvReply, Response> {
        let r = self.rsm.execute(cmd).await.map_err(|e| {
            let e = RedisApiError::from(e);
            warn!(self.log, "command failed"; "err" => %e);
            Response::Error(format!("ERR {}", e))
        })?;

        if !r.error.is_empty() {
            return Err(Response::Error(format!("ERR {}", r.error)));
        }
        Ok(r)
    }
}

fn wrong_arity(cmd: &str) -> Response {
    Response::Error(format!("ERR wrong number of arguments for '{}' command", cmd))
}
