//! Error types for the ping-pong protocol.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Violations of the ping-pong protocol by the peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The request line was missing or malformed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The responder's answer did not start with `OK`.
    #[error("unexpected answer from pong server: {0:?}")]
    UnexpectedAnswer(String),

    /// An exchange message did not start with a decimal sequence number.
    #[error("message does not carry a sequence number")]
    MissingSequence,

    /// A stream message arrived out of order.
    #[error("wrong sequence number: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Expected sequence number.
        expected: u32,
        /// Actual sequence number.
        actual: u32,
    },

    /// A datagram carried a sequence number outside the acceptable window.
    #[error("sequence number {actual} out of range (last acked {acked}, repetitions {repetitions})")]
    SequenceOutOfRange {
        /// Sequence number received.
        actual: u32,
        /// Highest sequence number acknowledged so far.
        acked: u32,
        /// Negotiated repetition count.
        repetitions: u32,
    },

    /// The same datagram was retransmitted too many times.
    #[error("maximum resend count exceeded for sequence number {sequence}")]
    ResendLimitExceeded {
        /// The retransmitted sequence number.
        sequence: u32,
    },

    /// A datagram was shorter than the negotiated message size.
    #[error("received {actual} bytes, expected {expected}")]
    ShortMessage {
        /// Negotiated message size.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// The sequence number does not fit into the message buffer.
    #[error("sequence number {sequence} does not fit in a {size}-byte message")]
    SequenceTooWide {
        /// The sequence number.
        sequence: u32,
        /// Message size.
        size: usize,
    },
}

/// Top-level errors.
#[derive(Debug, Error)]
pub enum PingPongError {
    /// Protocol violation by the peer.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O failure, tagged with the operation that failed.
    #[error("{op}: {source}")]
    Io {
        /// Operation that failed.
        op: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// No ephemeral port could be bound.
    #[error("could not find any free ephemeral port")]
    PortsExhausted,

    /// A blocking operation did not complete in time.
    #[error("{op}: timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        op: &'static str,
        /// Elapsed limit.
        after: Duration,
    },

    /// The peer closed the connection early.
    #[error("{0}: connection closed by peer")]
    Closed(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PingPongError {
    /// Check if this error is a protocol violation rather than an I/O failure.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Build an I/O error for the named operation.
    ///
    /// `UnexpectedEof` becomes [`PingPongError::Closed`].
    pub fn io(op: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Self::Closed(op)
        } else {
            Self::Io { op, source }
        }
    }
}

/// Attaches the failing operation to `io::Result`s.
pub trait IoContext<T> {
    /// Map the error into [`PingPongError::Io`] named after `op`.
    fn op(self, op: &'static str) -> Result<T, PingPongError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn op(self, op: &'static str) -> Result<T, PingPongError> {
        self.map_err(|e| PingPongError::io(op, e))
    }
}

/// Result alias used across the crate.
pub type Result<T, E = PingPongError> = std::result::Result<T, E>;
