use bytes::Buf;
use bytes::BytesMut;
use redis::Value;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use super::RedisApiError;

/// The most args a command may have.
const MAX_ARGS: usize = 1024 * 1024;
/// The most bytes buffered for one command that is not complete yet.
const MAX_REQUEST: usize = 512 * 1024 * 1024;
/// `*` and the decimal digits of MAX_ARGS and CRLF fit in it.
const MAX_HEADER: usize = 16;

/// A command response to send to a client
#[derive(PartialEq, Debug)]
pub enum Response {
    /// No data
    Nil,
    /// A number
    Integer(i64),
    /// Binary data
    Data(Vec<u8>),
    /// A simple error string
    Error(String),
    /// A simple status string
    Status(String),
    /// An array of responses that may mix different types
    Array(Vec<Response>),
}

impl Response {
    /// Serializes the response into an array of bytes using Redis protocol.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = vec![];
        self.write_to(&mut buf);
        buf
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Nil => buf.extend_from_slice(b"$-1\r\n"),
            Response::Integer(i) => buf.extend_from_slice(format!(":{}\r\n", i).as_bytes()),
            Response::Data(d) => {
                buf.extend_from_slice(format!("${}\r\n", d.len()).as_bytes());
                buf.extend_from_slice(d);
                buf.extend_from_slice(b"\r\n");
            }
            Response::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(one_line(s).as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Response::Status(s) => {
                buf.push(b'+');
                buf.extend_from_slice(one_line(s).as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Response::Array(a) => {
                buf.extend_from_slice(format!("*{}\r\n", a.len()).as_bytes());
                for el in a.iter() {
                    el.write_to(buf);
                }
            }
        }
    }
}

// a simple string must not break the framing.
fn one_line(s: &str) -> String {
    s.replace(|c| c == '\r' || c == '\n', " ")
}

/// RespCodec decodes client commands and encodes responses.
///
/// A command is an array of bulk strings, as redis clients send it.
/// Values are parsed by `redis::parse_redis_value`. A command is accepted only in its canonical
/// encoding, so that the bytes it took from the stream are known.
#[derive(Debug, Default)]
pub struct RespCodec {}

impl Decoder for RespCodec {
    type Item = Vec<Vec<u8>>;
    type Error = RedisApiError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        if !check_header(src)? {
            return Ok(None);
        }

        let v = match redis::parse_redis_value(&src[..]) {
            Ok(v) => v,
            Err(e) if e.is_io_error() => {
                if src.len() > MAX_REQUEST {
                    return Err(protocol_err("request too large"));
                }
                return Ok(None);
            }
            Err(e) => return Err(RedisApiError::Protocol(e.to_string())),
        };

        let args = to_args(v)?;

        let enc = encode_args(&args);
        if !src.starts_with(&enc) {
            return Err(protocol_err("non-canonical command"));
        }
        src.advance(enc.len());

        Ok(Some(args))
    }
}

impl Encoder<Response> for RespCodec {
    type Error = RedisApiError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_vec());
        Ok(())
    }
}

fn protocol_err(msg: &str) -> RedisApiError {
    RedisApiError::Protocol(msg.to_string())
}

/// check_header checks the `*<n>` line before anything is parsed, so that the arg count is
/// bounded by MAX_ARGS. It returns false if the line is not complete yet.
fn check_header(src: &[u8]) -> Result<bool, RedisApiError> {
    if src[0] != b'*' {
        return Err(protocol_err("expected '*'"));
    }

    let window = &src[..src.len().min(MAX_HEADER)];
    let end = match window.iter().position(|b| *b == b'\n') {
        Some(i) => i,
        None if src.len() >= MAX_HEADER => return Err(protocol_err("invalid multibulk length")),
        None => return Ok(false),
    };

    let line = &src[1..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let cnt: i64 = std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| protocol_err("invalid multibulk length"))?;

    if cnt < 0 || cnt as usize > MAX_ARGS {
        return Err(protocol_err("invalid multibulk length"));
    }
    Ok(true)
}

fn to_args(v: Value) -> Result<Vec<Vec<u8>>, RedisApiError> {
    let items = match v {
        Value::Bulk(items) => items,
        _ => return Err(protocol_err("expected an array")),
    };

    items
        .into_iter()
        .map(|it| match it {
            Value::Data(d) => Ok(d),
            _ => Err(protocol_err("expected a bulk string")),
        })
        .collect()
}

fn encode_args(args: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for a in args.iter() {
        buf.extend_from_slice(format!("${}\r\n", a.len()).as_bytes());
        buf.extend_from_slice(a);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}
