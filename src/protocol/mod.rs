//! Wire protocol: negotiation lines and exchange message framing.
//!
//! ```text
//! ping                                   pong
//!  │ ── "TCP 64 150\n" ──────────────────▶ │
//!  │ ◀───────────────────────────── "OK\n" │
//!  │ ── "1\n" + padding (64 bytes) ──────▶ │
//!  │ ◀──────────────────────── same bytes  │
//!  │              ... 150 rounds ...       │
//! ```
//!
//! For UDP the answer is `"OK <port>\n"` and the rounds run as datagrams
//! against that port.

mod answer;
mod message;
mod request;

pub use answer::Answer;
pub use message::{new_message, read_sequence, write_sequence};
pub use request::{Request, Transport, repetitions_from_arg};
