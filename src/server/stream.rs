//! Stream (TCP) responder loop.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::core::{IoContext, PingPongError, ProtocolError, Result};
use crate::protocol::{Request, new_message, read_sequence};
use crate::transport::timing::within;

/// Echo `request.repetitions()` messages of `request.message_size()` bytes.
///
/// Each message must carry the next sequence number, starting at 1. Every
/// individual read is bounded by `recv_timeout`. Returns the number of
/// rounds served.
pub async fn tcp_pong<S>(
    stream: &mut S,
    request: &Request,
    recv_timeout: Option<Duration>,
) -> Result<u32>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = new_message(request.message_size());

    for expected in 1..=request.repetitions() {
        read_message(stream, &mut buffer, recv_timeout).await?;

        let actual = read_sequence(&buffer)?;
        trace!(expected, actual, "tcp pong got sequence number");
        if actual != expected {
            return Err(ProtocolError::SequenceMismatch { expected, actual }.into());
        }

        stream
            .write_all(&buffer)
            .await
            .op("TCP Pong failed sending data back")?;
    }

    debug!(rounds = request.repetitions(), "tcp pong done");
    Ok(request.repetitions())
}

/// Fill `buffer` completely, failing if the peer closes first.
async fn read_message<S>(
    stream: &mut S,
    buffer: &mut [u8],
    recv_timeout: Option<Duration>,
) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut offset = 0;
    while offset < buffer.len() {
        let n = within(
            recv_timeout,
            "TCP Pong failed receiving data",
            stream.read(&mut buffer[offset..]),
        )
        .await?;
        if n == 0 {
            return Err(PingPongError::Closed(
                "TCP Pong received fewer bytes than expected",
            ));
        }
        offset += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Transport, write_sequence};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    fn message(size: usize, seq: u32) -> Vec<u8> {
        let mut buf = vec![b'.'; size];
        write_sequence(&mut buf, seq).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_echoes_in_order_rounds() {
        let request = Request::new(Transport::Stream, 64, 150).unwrap();
        let (mut ping, mut pong) = duplex(4096);

        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });

        for seq in 1..=150 {
            let msg = message(64, seq);
            ping.write_all(&msg).await.unwrap();
            let mut back = vec![0u8; 64];
            ping.read_exact(&mut back).await.unwrap();
            assert_eq!(back, msg);
        }

        assert_eq!(server.await.unwrap().unwrap(), 150);
    }

    #[tokio::test]
    async fn test_handles_fragmented_writes() {
        let request = Request::new(Transport::Stream, 32, 2).unwrap();
        let (mut ping, mut pong) = duplex(8);

        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });

        for seq in 1..=2 {
            let msg = message(32, seq);
            for chunk in msg.chunks(5) {
                ping.write_all(chunk).await.unwrap();
            }
            let mut back = vec![0u8; 32];
            ping.read_exact(&mut back).await.unwrap();
            assert_eq!(back, msg);
        }

        assert_eq!(server.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mismatched_sequence_fails() {
        let request = Request::new(Transport::Stream, 16, 5).unwrap();
        let (mut ping, mut pong) = duplex(4096);

        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });

        ping.write_all(&message(16, 1)).await.unwrap();
        let mut back = vec![0u8; 16];
        ping.read_exact(&mut back).await.unwrap();
        ping.write_all(&message(16, 3)).await.unwrap();

        let err = server.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            PingPongError::Protocol(ProtocolError::SequenceMismatch { expected: 2, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_garbage_message_fails() {
        let request = Request::new(Transport::Stream, 16, 1).unwrap();
        let (mut ping, mut pong) = duplex(4096);

        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });
        ping.write_all(&[b'z'; 16]).await.unwrap();

        let err = server.await.unwrap().unwrap_err();
        assert!(matches!(err, PingPongError::Protocol(ProtocolError::MissingSequence)));
    }

    #[tokio::test]
    async fn test_early_close_fails() {
        let request = Request::new(Transport::Stream, 64, 1).unwrap();
        let (mut ping, mut pong) = duplex(4096);

        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });
        ping.write_all(&message(64, 1)[..10]).await.unwrap();
        drop(ping);

        let err = server.await.unwrap().unwrap_err();
        assert!(matches!(err, PingPongError::Closed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        let request = Request::new(Transport::Stream, 16, 1).unwrap();
        let (_ping, mut pong) = duplex(4096);

        let err = tcp_pong(&mut pong, &request, Some(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, PingPongError::Timeout { .. }));
    }
}
