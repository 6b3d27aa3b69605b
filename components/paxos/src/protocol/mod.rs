// so that downstream crate does not need use this trait to use FromStr.
pub use std::str::FromStr;

use std::convert::TryFrom;
use std::fmt;

use derive_more;
use enum_utils;
use prost::Message;

pub mod errors;
pub mod quorums;

pub use errors::*;
pub use quorums::*;

#[cfg(test)]
mod test_protocol;

#[cfg(test)]
mod test_quorums;

/// InstanceIdx is the position of a slot in the replicated log.
/// `-1` stands for "no instance", e.g. the done watermark of a node that applied nothing.
pub type InstanceIdx = i64;

/// NodeId is the global identity of a node in the cluster.
pub type NodeId = u64;

/// Ballot is a proposal number.
/// Ballots compare by `round` first; `node_id` breaks ties between proposers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Message, derive_more::From)]
pub struct Ballot {
    #[prost(uint64, tag = "1")]
    pub round: u64,
    #[prost(uint64, tag = "2")]
    pub node_id: u64,
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.round, self.node_id)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    enum_utils::FromStr,
)]
#[repr(i32)]
pub enum OpCode {
    NoOp = 0,
    Get = 1,
    Set = 2,
    Delete = 3,
}

/// Command is a key-value operation carried in the payload of a log entry.
#[derive(Clone, PartialEq, Message)]
pub struct Command {
    #[prost(enumeration = "OpCode", tag = "1")]
    pub op: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

impl Command {
    pub fn of(op: OpCode, key: &[u8], value: &[u8]) -> Command {
        Command {
            op: op as i32,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    /// kind returns None for an op code this build does not know.
    pub fn kind(&self) -> Option<OpCode> {
        OpCode::try_from(self.op).ok()
    }
}

impl From<(&str, &str, &str)> for Command {
    fn from(t: (&str, &str, &str)) -> Command {
        let op = OpCode::from_str(t.0).unwrap_or(OpCode::NoOp);
        Command::of(op, t.1.as_bytes(), t.2.as_bytes())
    }
}

/// KvReply is the result of applying a Command.
#[derive(Clone, PartialEq, Message)]
pub struct KvReply {
    /// whether the key existed before the command applied.
    #[prost(bool, tag = "1")]
    pub found: bool,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    /// a non-empty error means the command was rejected, e.g. an unknown op code.
    #[prost(string, tag = "3")]
    pub error: String,
}

/// Entry is what the replicated state machine proposes for an instance.
/// `(origin, seq)` identifies a submission; an entry without payload is a no-op.
#[derive(Clone, PartialEq, Message)]
pub struct Entry {
    #[prost(uint64, tag = "1")]
    pub origin: u64,
    #[prost(uint64, tag = "2")]
    pub seq: u64,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
}

impl Entry {
    pub fn is_from(&self, origin: NodeId, seq: u64) -> bool {
        self.origin == origin && self.seq == seq
    }
}

/// AcceptorState is what an acceptor remembers about one instance.
#[derive(Clone, PartialEq, Message)]
pub struct AcceptorState {
    /// the highest ballot seen in a prepare or accept.
    #[prost(message, optional, tag = "1")]
    pub promised: Option<Ballot>,
    #[prost(message, optional, tag = "2")]
    pub accepted: Option<Ballot>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub value: Option<Vec<u8>>,
}

/// Decision is an instance with its chosen value. It never changes once made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub instance: InstanceIdx,
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareRequest {
    #[prost(int64, tag = "1")]
    pub instance: i64,
    #[prost(message, optional, tag = "2")]
    pub ballot: Option<Ballot>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareReply {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(message, optional, tag = "2")]
    pub last_ballot: Option<Ballot>,
    #[prost(message, optional, tag = "3")]
    pub accepted_ballot: Option<Ballot>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub accepted_value: Option<Vec<u8>>,
    /// the instance is below the acceptor's gc floor.
    #[prost(bool, tag = "5")]
    pub forgotten: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct AcceptRequest {
    #[prost(int64, tag = "1")]
    pub instance: i64,
    #[prost(message, optional, tag = "2")]
    pub ballot: Option<Ballot>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AcceptReply {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(message, optional, tag = "2")]
    pub last_ballot: Option<Ballot>,
    #[prost(bool, tag = "3")]
    pub forgotten: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct DecideRequest {
    #[prost(int64, tag = "1")]
    pub instance: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DecideReply {}

#[derive(Clone, PartialEq, Message)]
pub struct LearnRequest {
    #[prost(int64, tag = "1")]
    pub instance: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct LearnReply {
    /// None if the peer has not seen the instance decided.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DoneRequest {}

#[derive(Clone, PartialEq, Message)]
pub struct DoneReply {
    #[prost(int64, tag = "1")]
    pub done: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorReply {
    #[prost(string, tag = "1")]
    pub msg: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Request {
    #[prost(oneof = "request::Body", tags = "1, 2, 3, 4, 5")]
    pub body: Option<request::Body>,
}

pub mod request {
    use super::*;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Prepare(PrepareRequest),
        #[prost(message, tag = "2")]
        Accept(AcceptRequest),
        #[prost(message, tag = "3")]
        Decide(DecideRequest),
        #[prost(message, tag = "4")]
        Learn(LearnRequest),
        #[prost(message, tag = "5")]
        Done(DoneRequest),
    }

    impl Body {
        /// name is the kind of reply this request expects.
        pub fn name(&self) -> &'static str {
            match self {
                Body::Prepare(_) => "prepare",
                Body::Accept(_) => "accept",
                Body::Decide(_) => "decide",
                Body::Learn(_) => "learn",
                Body::Done(_) => "done",
            }
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Reply {
    #[prost(oneof = "reply::Body", tags = "1, 2, 3, 4, 5, 6")]
    pub body: Option<reply::Body>,
}

pub mod reply {
    use super::*;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Prepare(PrepareReply),
        #[prost(message, tag = "2")]
        Accept(AcceptReply),
        #[prost(message, tag = "3")]
        Decide(DecideReply),
        #[prost(message, tag = "4")]
        Learn(LearnReply),
        #[prost(message, tag = "5")]
        Done(DoneReply),
        #[prost(message, tag = "6")]
        Error(ErrorReply),
    }

    impl Body {
        /// name is used in error messages when a reply does not match its request.
        pub fn name(&self) -> &'static str {
            match self {
                Body::Prepare(_) => "prepare",
                Body::Accept(_) => "accept",
                Body::Decide(_) => "decide",
                Body::Learn(_) => "learn",
                Body::Done(_) => "done",
                Body::Error(_) => "error",
            }
        }
    }
}

pub struct MakeRequest {}

/// MakeRequest builds a `Request` for every kind of peer message.
///
/// ```ignore
/// let req = MakeRequest::prepare(3, (10, 1).into());
/// ```
impl MakeRequest {
    pub fn prepare(instance: InstanceIdx, ballot: Ballot) -> Request {
        Request {
            body: Some(request::Body::Prepare(PrepareRequest {
                instance,
                ballot: Some(ballot),
            })),
        }
    }

    pub fn accept(instance: InstanceIdx, ballot: Ballot, value: Vec<u8>) -> Request {
        Request {
            body: Some(request::Body::Accept(AcceptRequest {
                instance,
                ballot: Some(ballot),
                value,
            })),
        }
    }

    pub fn decide(instance: InstanceIdx, value: Vec<u8>) -> Request {
        Request {
            body: Some(request::Body::Decide(DecideRequest { instance, value })),
        }
    }

    pub fn learn(instance: InstanceIdx) -> Request {
        Request {
            body: Some(request::Body::Learn(LearnRequest { instance })),
        }
    }

    pub fn done() -> Request {
        Request {
            body: Some(request::Body::Done(DoneRequest {})),
        }
    }
}

pub struct MakeReply {}

impl MakeReply {
    pub fn of(body: reply::Body) -> Reply {
        Reply { body: Some(body) }
    }

    pub fn error<E: fmt::Display>(e: E) -> Reply {
        Reply {
            body: Some(reply::Body::Error(ErrorReply {
                msg: format!("{}", e),
            })),
        }
    }
}

/// encode_msg encodes a prost message into a fresh buffer.
pub fn encode_msg<M: Message>(m: &M) -> Vec<u8> {
    m.encode_to_vec()
}
