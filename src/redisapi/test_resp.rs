use bytes::BytesMut;
use pretty_assertions::assert_eq;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use super::*;

fn decode_all(input: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut codec = RespCodec::default();
    let mut buf = BytesMut::from(input);
    let mut rst = vec![];
    while let Some(cmd) = codec.decode(&mut buf).unwrap() {
        rst.push(cmd);
    }
    rst
}

fn args(words: &[&str]) -> Vec<Vec<u8>> {
    words.iter().map(|w| w.as_bytes().to_vec()).collect()
}

#[test]
fn test_response_to_vec() {
    let cases: Vec<(Response, &[u8])> = vec![
        (Response::Nil, b"$-1\r\n"),
        (Response::Integer(-3), b":-3\r\n"),
        (Response::Data(b"ab".to_vec()), b"$2\r\nab\r\n"),
        (Response::Data(vec![]), b"$0\r\n\r\n"),
        (Response::Status("OK".into()), b"+OK\r\n"),
        (Response::Error("ERR a\r\nb".into()), b"-ERR a  b\r\n"),
        (
            Response::Array(vec![Response::Integer(1), Response::Nil]),
            b"*2\r\n:1\r\n$-1\r\n",
        ),
        (Response::Array(vec![]), b"*0\r\n"),
    ];

    for (r, want) in cases {
        assert_eq!(want.to_vec(), r.to_vec(), "{:?}", r);
    }
}

#[test]
fn test_decode_multibulk() {
    let got = decode_all(b"*3\r\n$3\r\nSET\r\n$1\r\nx\r\n$4\r\na\r\nb\r\n*1\r\n$4\r\nPING\r\n");
    assert_eq!(
        vec![
            vec![b"SET".to_vec(), b"x".to_vec(), b"a\r\nb".to_vec()],
            args(&["PING"]),
        ],
        got
    );
}

#[test]
fn test_decode_empty_array() {
    let got = decode_all(b"*0\r\n*1\r\n$0\r\n\r\n");
    assert_eq!(vec![vec![], vec![Vec::<u8>::new()]], got);
}

#[test]
fn test_decode_partial() {
    let full: &[u8] = b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n";
    let mut codec = RespCodec::default();

    // feeding one byte at a time yields the command only at the last byte.
    let mut buf = BytesMut::new();
    for (i, b) in full.iter().enumerate() {
        buf.extend_from_slice(&[*b]);
        let got = codec.decode(&mut buf).unwrap();
        if i + 1 < full.len() {
            assert_eq!(None, got, "at byte {}", i);
        } else {
            assert_eq!(Some(args(&["GET", "key"])), got);
        }
    }
    assert!(buf.is_empty());
}

#[test]
fn test_decode_pipelined_partial() {
    let mut codec = RespCodec::default();
    let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$3\r\nk"[..]);

    assert_eq!(Some(args(&["PING"])), codec.decode(&mut buf).unwrap());
    assert_eq!(None, codec.decode(&mut buf).unwrap());

    // the partial command stays buffered.
    assert_eq!(&b"*2\r\n$3\r\nGET\r\n$3\r\nk"[..], &buf[..]);

    buf.extend_from_slice(b"ey\r\n");
    assert_eq!(Some(args(&["GET", "key"])), codec.decode(&mut buf).unwrap());
    assert!(buf.is_empty());
}

#[test]
fn test_decode_errors() {
    let cases: Vec<&[u8]> = vec![
        // not an array.
        b"PING\r\n",
        b"$4\r\nPING\r\n",
        b"*x\r\n",
        b"*-2\r\n",
        // not a bulk string.
        b"*1\r\n+OK\r\n",
        b"*1\r\n:1\r\n",
        b"*1\r\n$-1\r\n",
        b"*1\r\n*1\r\n$1\r\na\r\n",
        // bulk string not ended by CRLF.
        b"*1\r\n$2\r\nabc\r\n",
        // lengths that are not in canonical form.
        b"*1\r\n$03\r\nGET\r\n",
        b"*01\r\n$3\r\nGET\r\n",
    ];

    for input in cases {
        let mut buf = BytesMut::from(input);
        let rst = RespCodec::default().decode(&mut buf);
        assert!(
            matches!(rst, Err(RedisApiError::Protocol(_))),
            "{:?}",
            String::from_utf8_lossy(input)
        );
    }

}

#[test]
fn test_decode_arg_count_bounded() {
    // the count is rejected before any arg arrives.
    for input in [&b"*1048577\r\n"[..], &b"*99999999999999999"[..]] {
        let mut buf = BytesMut::from(input);
        let rst = RespCodec::default().decode(&mut buf);
        assert!(matches!(rst, Err(RedisApiError::Protocol(_))), "{:?}", rst);
    }

    // a count within bound waits for its args.
    let mut buf = BytesMut::from(&b"*1048576\r\n"[..]);
    assert_eq!(None, RespCodec::default().decode(&mut buf).unwrap());

    let mut buf = BytesMut::from(&b"*104"[..]);
    assert_eq!(None, RespCodec::default().decode(&mut buf).unwrap());
}

#[test]
fn test_encode() {
    let mut buf = BytesMut::new();
    RespCodec::default()
        .encode(Response::Status("PONG".into()), &mut buf)
        .unwrap();
    assert_eq!(&b"+PONG\r\n"[..], &buf[..]);
}
