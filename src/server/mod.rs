//! Pong responder.
//!
//! [`PongServer`] accepts negotiation connections and runs each one as an
//! independent task: [`serve_client`] negotiates, then hands off to
//! [`tcp_pong`] or [`udp_pong`].

mod datagram;
#[allow(clippy::module_inception)]
mod server;
mod session;
mod stream;

pub use datagram::{Delivery, ResendTracker, udp_pong};
pub use server::*;
pub use session::{read_request, serve_client};
pub use stream::tcp_pong;
