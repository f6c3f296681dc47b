//! Datagram (UDP) initiator rounds with retransmission.
//!
//! Each round sends one datagram and waits up to a fixed timeout for the
//! echo. On timeout the same datagram is resent, at most `max_resend`
//! times. The RTT of a round is measured from its *first* send, so a lost
//! reply shows up as a long sample rather than being hidden.

use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use crate::core::{IoContext, PingPongError, ProtocolError, Result};
use crate::protocol::{new_message, read_sequence, write_sequence};
use crate::transport::DatagramEndpoint;
use crate::transport::timing::{delta_ms, now};

/// Drives timed rounds over a connected datagram endpoint.
#[derive(Debug)]
pub struct DatagramPinger {
    endpoint: DatagramEndpoint,
    message: Vec<u8>,
    reply_timeout: Duration,
    max_resend: u32,
    resends: u32,
}

impl DatagramPinger {
    /// Create a pinger on an endpoint already connected to the pong port.
    pub fn new(
        mut endpoint: DatagramEndpoint,
        message_size: usize,
        reply_timeout: Duration,
        max_resend: u32,
    ) -> Self {
        endpoint.set_recv_buffer_size(message_size);
        Self {
            endpoint,
            message: new_message(message_size),
            reply_timeout,
            max_resend,
            resends: 0,
        }
    }

    /// Run one round and return its RTT in milliseconds.
    pub async fn do_ping(&mut self, sequence: u32) -> Result<f64> {
        write_sequence(&mut self.message, sequence)?;

        let send_time = now();
        self.send().await?;
        let mut deadline = Instant::now() + self.reply_timeout;
        let mut attempts = 0;

        loop {
            let len = match timeout_at(deadline, self.endpoint.recv()).await {
                Ok(received) => received.op("UDP Ping recv failed")?,
                Err(_) => {
                    attempts += 1;
                    if attempts > self.max_resend {
                        return Err(PingPongError::Timeout {
                            op: "UDP Ping did not get a reply",
                            after: self.reply_timeout * (self.max_resend + 1),
                        });
                    }
                    warn!(sequence, attempt = attempts, "no reply, resending datagram");
                    self.resends += 1;
                    self.send().await?;
                    deadline = Instant::now() + self.reply_timeout;
                    continue;
                }
            };

            let size = self.message.len();
            if len < size {
                return Err(ProtocolError::ShortMessage {
                    expected: size,
                    actual: len,
                }
                .into());
            }

            let received = read_sequence(self.endpoint.recv_data(len))?;
            if received < sequence {
                trace!(sequence, received, "discarding late echo");
                continue;
            }
            if received > sequence {
                return Err(ProtocolError::SequenceMismatch {
                    expected: sequence,
                    actual: received,
                }
                .into());
            }
            break;
        }

        Ok(delta_ms(now(), send_time))
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

    /// Datagrams resent so far.
    pub fn resends(&self) -> u32 {
        self.resends
    }

    async fn send(&self) -> Result<()> {
        let sent = self
            .endpoint
            .send(&self.message)
            .await
            .op("UDP Ping failed sending datagram")?;
        if sent < self.message.len() {
            return Err(PingPongError::Io {
                op: "UDP Ping failed sending datagram",
                source: std::io::ErrorKind::WriteZero.into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MAX_RESEND, UDP_TIMEOUT};

    async fn pair() -> (DatagramEndpoint, DatagramEndpoint) {
        let pong = DatagramEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let ping = DatagramEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        ping.connect(pong.local_addr().unwrap()).await.unwrap();
        (ping, pong)
    }

    #[cfg(feature = "pong")]
    #[tokio::test]
    async fn test_against_udp_pong() {
        use crate::protocol::{Request, Transport};
        use crate::server::udp_pong;

        let (ping, mut pong) = pair().await;
        let request = Request::new(Transport::Datagram, 32, 5).unwrap();
        let server =
            tokio::spawn(async move { udp_pong(&mut pong, &request, MAX_RESEND, None).await });

        let mut pinger = DatagramPinger::new(ping, 32, UDP_TIMEOUT, MAX_RESEND);
        let samples = pinger.run(5).await.unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(pinger.resends(), 0);
        assert!(server.await.unwrap().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_resends_after_lost_reply() {
        let (ping, mut pong) = pair().await;
        let echo = tokio::spawn(async move {
            // Drop the first delivery, echo the retransmission.
            let (len, _) = pong.recv_from().await.unwrap();
            assert_eq!(read_sequence(pong.recv_data(len)).unwrap(), 1);
            let (len, from) = pong.recv_from().await.unwrap();
            let data = pong.recv_data(len).to_vec();
            pong.send_to(&data, from).await.unwrap();
        });

        let mut pinger = DatagramPinger::new(ping, 16, Duration::from_millis(50), MAX_RESEND);
        let rtt = pinger.do_ping(1).await.unwrap();
        echo.await.unwrap();

        assert_eq!(pinger.resends(), 1);
        assert!(rtt >= 50.0, "rtt measured from first send, got {rtt}");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_resend() {
        let (ping, _pong) = pair().await;
        let mut pinger = DatagramPinger::new(ping, 16, Duration::from_millis(10), 2);
        let err = pinger.do_ping(1).await.unwrap_err();
        assert!(matches!(err, PingPongError::Timeout { .. }));
        assert_eq!(pinger.resends(), 2);
    }

    #[tokio::test]
    async fn test_discards_late_echo() {
        let (ping, mut pong) = pair().await;
        let echo = tokio::spawn(async move {
            let (len, from) = pong.recv_from().await.unwrap();
            let mut stale = pong.recv_data(len).to_vec();
            let current = stale.clone();
            write_sequence(&mut stale, 1).unwrap();
            pong.send_to(&stale, from).await.unwrap();
            pong.send_to(&current, from).await.unwrap();
        });

        let mut pinger = DatagramPinger::new(ping, 16, UDP_TIMEOUT, MAX_RESEND);
        pinger.do_ping(2).await.unwrap();
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn test_future_sequence_fails() {
        let (ping, mut pong) = pair().await;
        tokio::spawn(async move {
            let (len, from) = pong.recv_from().await.unwrap();
            let mut reply = pong.recv_data(len).to_vec();
            write_sequence(&mut reply, 9).unwrap();
            pong.send_to(&reply, from).await.unwrap();
        });

        let mut pinger = DatagramPinger::new(ping, 16, UDP_TIMEOUT, MAX_RESEND);
        let err = pinger.do_ping(1).await.unwrap_err();
        assert!(matches!(
            err,
            PingPongError::Protocol(ProtocolError::SequenceMismatch { expected: 1, actual: 9 })
        ));
    }
}
