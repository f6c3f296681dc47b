//! Transport helpers shared by both roles.
//!
//! - **Timing**: monotonic timestamps and millisecond deltas ([`timing`])
//! - **Datagram endpoints**: [`DatagramEndpoint`] wrapper for tokio UDP
//! - **Port allocation**: [`allocate_port`] over the IANA ephemeral range

mod ports;
mod socket;
pub mod timing;

pub use ports::{DEFAULT_BIND_IP, PortError, allocate_port, ephemeral_range};
pub use socket::*;
