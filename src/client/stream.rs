//! Stream (TCP) initiator rounds.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::core::{IoContext, PingPongError, Result};
use crate::protocol::{new_message, write_sequence};
use crate::transport::timing::{delta_ms, now};

/// Drives timed rounds over a byte stream.
///
/// The outgoing message is allocated once and its sequence number is
/// rewritten in place for every round.
#[derive(Debug)]
pub struct StreamPinger<S> {
    stream: S,
    message: Vec<u8>,
    reply: Vec<u8>,
}

impl<S> StreamPinger<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a pinger sending `message_size`-byte messages on `stream`.
    pub fn new(stream: S, message_size: usize) -> Self {
        Self {
            stream,
            message: new_message(message_size),
            reply: new_message(message_size),
        }
    }

    /// Run one round and return its RTT in milliseconds.
    pub async fn do_ping(&mut self, sequence: u32) -> Result<f64> {
        write_sequence(&mut self.message, sequence)?;

        let send_time = now();
        self.stream
            .write_all(&self.message)
            .await
            .op("TCP Ping failed sending data")?;

        let mut offset = 0;
        while offset < self.reply.len() {
            let n = self
                .stream
                .read(&mut self.reply[offset..])
                .await
                .op("TCP Ping failed receiving data")?;
            if n == 0 {
                return Err(PingPongError::Closed("TCP Ping received fewer bytes than expected"));
            }
            trace!(received = n, "tcp ping received bytes back");
            offset += n;
        }
        let recv_time = now();

        Ok(delta_ms(recv_time, send_time))
    }

    /// Run rounds `1..=repetitions` and collect their RTTs in order.
    pub async fn run(&mut self, repetitions: u32) -> Result<Vec<f64>> {
        let mut samples = Vec::with_capacity(repetitions as usize);
        for round in 1..=repetitions {
            let rtt_ms = self.do_ping(round).await?;
            debug!(round, rtt_ms, "round trip time");
            samples.push(rtt_ms);
        }
        Ok(samples)
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[cfg(feature = "pong")]
    #[tokio::test]
    async fn test_against_tcp_pong() {
        use crate::protocol::{Request, Transport};
        use crate::server::tcp_pong;

        let request = Request::new(Transport::Stream, 64, 150).unwrap();
        let (ping, mut pong) = duplex(1024);
        let server = tokio::spawn(async move { tcp_pong(&mut pong, &request, None).await });

        let mut pinger = StreamPinger::new(ping, 64);
        let samples = pinger.run(150).await.unwrap();

        assert_eq!(samples.len(), 150);
        assert!(samples.iter().all(|s| *s >= 0.0));
        assert_eq!(server.await.unwrap().unwrap(), 150);
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let (ping, mut pong) = duplex(4);
        let echo = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            pong.read_exact(&mut buf).await.unwrap();
            for chunk in buf.chunks(3) {
                pong.write_all(chunk).await.unwrap();
            }
            buf
        });

        let mut pinger = StreamPinger::new(ping, 16);
        pinger.do_ping(7).await.unwrap();
        let sent = echo.await.unwrap();
        assert_eq!(&sent[..2], b"7\n");
    }

    #[tokio::test]
    async fn test_peer_closes() {
        let (ping, pong) = duplex(64);
        drop(pong);
        let mut pinger = StreamPinger::new(ping, 16);
        assert!(pinger.do_ping(1).await.is_err());
    }
}
