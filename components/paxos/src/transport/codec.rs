use bytes::Bytes;
use futures::SinkExt;
use futures::StreamExt;
use prost::Message;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::codec::LengthDelimitedCodec;

use super::TransportError;

/// The largest frame a peer accepts.
pub const MAX_FRAME: usize = 64 * 1024 * 1024;

/// FramedConn is a tcp stream carrying length prefixed prost messages.
pub type FramedConn = Framed<TcpStream, LengthDelimitedCodec>;

pub fn framed(stream: TcpStream) -> FramedConn {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME)
        .new_codec();
    Framed::new(stream, codec)
}

pub async fn send_msg<M: Message>(conn: &mut FramedConn, msg: &M) -> Result<(), TransportError> {
    conn.send(Bytes::from(msg.encode_to_vec())).await?;
    Ok(())
}

/// recv_msg returns Ok(None) if the other end closed the connection.
pub async fn recv_msg<M: Message + Default>(
    conn: &mut FramedConn,
) -> Result<Option<M>, TransportError> {
    let frame = match conn.next().await {
        Some(f) => f?,
        None => return Ok(None),
    };
    Ok(Some(M::decode(frame.freeze())?))
}
