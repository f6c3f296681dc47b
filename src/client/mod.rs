//! Ping initiator.
//!
//! [`PingClient`] negotiates a request and drives the matching engine:
//! [`StreamPinger`] over the negotiation connection or [`DatagramPinger`]
//! against the port the server allocated.

#[allow(clippy::module_inception)]
mod client;
mod datagram;
mod stream;

pub use client::*;
pub use datagram::DatagramPinger;
pub use stream::StreamPinger;
