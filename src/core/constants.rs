//! Protocol constants shared by the ping and pong sides.
//!
//! These values are part of the wire contract and MUST NOT be changed
//! independently on one side.

use std::time::Duration;

// =============================================================================
// MESSAGE SIZES
// =============================================================================

/// Minimum exchange message size in bytes.
pub const MIN_SIZE: usize = 16;

/// Maximum exchange message size over TCP (1 MiB).
pub const MAX_STREAM_SIZE: usize = 1024 * 1024;

/// Maximum exchange message size over UDP.
pub const MAX_DATAGRAM_SIZE: usize = 65500;

// =============================================================================
// REPETITIONS
// =============================================================================

/// Lowest repetition count an initiator will ask for.
pub const MIN_REPEATS: u32 = 101;

/// Repetition count used when none (or a non-numeric one) is given.
pub const DEFAULT_REPEATS: u32 = 301;

/// Highest repetition count either side accepts.
pub const MAX_REPEATS: u32 = 1501;

// =============================================================================
// DATAGRAM RESEND TOLERANCE
// =============================================================================

/// Retransmissions of one sequence number tolerated by the responder, and
/// attempted by the initiator after the first send.
pub const MAX_RESEND: u32 = 3;

/// How long the datagram initiator waits for a reply before resending.
pub const UDP_TIMEOUT: Duration = Duration::from_millis(1500);

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Responder receive timeout on the negotiation connection.
pub const PONG_RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Initiator connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// EPHEMERAL PORTS (IANA dynamic/private range)
// =============================================================================

/// Lowest IANA ephemeral port.
pub const IANA_EPHEMERAL_MIN: u16 = 49152;

/// Highest IANA ephemeral port.
pub const IANA_EPHEMERAL_MAX: u16 = 65535;

// =============================================================================
// NEGOTIATION
// =============================================================================

/// Longest request line the responder will read, newline included.
pub const MAX_REQUEST_LEN: usize = 30;

/// Longest answer the initiator will read, newline included.
pub const MAX_ANSWER_LEN: usize = 10;

/// Wire token for the stream transport.
pub const TOKEN_TCP: &str = "TCP";

/// Wire token for the datagram transport.
pub const TOKEN_UDP: &str = "UDP";

/// Positive answer prefix.
pub const ANSWER_OK: &str = "OK";

/// Negative answer.
pub const ANSWER_ERROR: &str = "ERROR";
