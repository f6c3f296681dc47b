//! Datagram (UDP) responder loop with resend tolerance.
//!
//! The responder echoes every datagram back to its source. The initiator may
//! retransmit its last datagram when a reply gets lost, so the same sequence
//! number can arrive again; such repeats are echoed up to a fixed number of
//! times. Anything older than the last acknowledged round is rejected.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::core::{IoContext, PingPongError, ProtocolError, Result};
use crate::protocol::{Request, read_sequence};
use crate::transport::DatagramEndpoint;
use crate::transport::timing::within;

/// Classification of an accepted datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// First delivery of a new round.
    New,
    /// Repeated delivery of the last acknowledged round (n-th repeat).
    Resend(u32),
}

/// Tracks acknowledged rounds and retransmissions for one session.
#[derive(Debug, Clone)]
pub struct ResendTracker {
    repetitions: u32,
    max_resend: u32,
    highest_acked: u32,
    resend_count: u32,
}

impl ResendTracker {
    /// Create a tracker for `repetitions` rounds.
    pub fn new(repetitions: u32, max_resend: u32) -> Self {
        Self {
            repetitions,
            max_resend,
            highest_acked: 0,
            resend_count: 0,
        }
    }

    /// Record a received sequence number.
    ///
    /// Rounds may be skipped forward but never revisited, except for the
    /// last acknowledged one which may repeat up to `max_resend` times.
    pub fn observe(&mut self, sequence: u32) -> Result<Delivery, ProtocolError> {
        if sequence < 1 || sequence > self.repetitions || sequence < self.highest_acked {
            return Err(ProtocolError::SequenceOutOfRange {
                actual: sequence,
                acked: self.highest_acked,
                repetitions: self.repetitions,
            });
        }

        if sequence > self.highest_acked {
            self.highest_acked = sequence;
            self.resend_count = 0;
            return Ok(Delivery::New);
        }

        self.resend_count += 1;
        if self.resend_count > self.max_resend {
            return Err(ProtocolError::ResendLimitExceeded { sequence });
        }
        Ok(Delivery::Resend(self.resend_count))
    }

    /// Whether the final round has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.highest_acked == self.repetitions
    }

    /// Highest sequence number acknowledged so far.
    pub fn highest_acked(&self) -> u32 {
        self.highest_acked
    }

    /// Repeats seen for the current round.
    pub fn resend_count(&self) -> u32 {
        self.resend_count
    }
}

/// Echo datagrams until the last round has been acknowledged.
///
/// Datagrams shorter than the negotiated size are fatal; longer ones are
/// truncated to it. Returns the tracker so callers can inspect the session.
pub async fn udp_pong(
    endpoint: &mut DatagramEndpoint,
    request: &Request,
    max_resend: u32,
    recv_timeout: Option<Duration>,
) -> Result<ResendTracker> {
    let size = request.message_size();
    endpoint.set_recv_buffer_size(size);
    let mut tracker = ResendTracker::new(request.repetitions(), max_resend);

    while !tracker.is_complete() {
        let (len, from) = within(recv_timeout, "UDP Pong recv failed", endpoint.recv_from()).await?;
        if len < size {
            return Err(ProtocolError::ShortMessage {
                expected: size,
                actual: len,
            }
            .into());
        }

        let data = endpoint.recv_data(len);
        let sequence = read_sequence(data)?;
        match tracker.observe(sequence)? {
            Delivery::New => trace!(sequence, %from, "udp pong got datagram"),
            Delivery::Resend(n) => warn!(sequence, resend = n, %from, "udp pong got resent datagram"),
        }

        let sent = endpoint
            .send_to(data, from)
            .await
            .op("UDP Pong failed sending datagram back")?;
        if sent < len {
            return Err(PingPongError::Io {
                op: "UDP Pong failed sending datagram back",
                source: std::io::ErrorKind::WriteZero.into(),
            });
        }
    }

    debug!(rounds = tracker.highest_acked(), "udp pong done");
    Ok(tracker)
}
