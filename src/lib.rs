//! # Pingpong
//!
//! Round-trip latency measurement between a *ping* initiator and a *pong*
//! responder, over TCP or UDP.
//!
//! The initiator opens a TCP connection and sends a one-line request naming
//! the transport, the message size and the number of repetitions. The
//! responder validates it and answers `OK` (TCP, the exchange continues on
//! the same connection), `OK <port>` (UDP, the exchange moves to a freshly
//! allocated datagram port) or `ERROR`. The initiator then times each
//! echo round and hands the samples to a [`stats::StatisticsSink`].
//!
//! ## Feature Flags
//!
//! - `ping` (default): initiator API ([`client`])
//! - `pong` (default): responder API ([`server`])
//!
//! ## Modules
//!
//! - [`core`]: constants and error types
//! - [`protocol`]: request, answer and exchange message formats
//! - [`transport`]: timing, datagram endpoints and port allocation
//! - [`stats`]: RTT statistics and reports
//!
//! ## Example Usage
//!
//! ```no_run
//! use pingpong::prelude::*;
//!
//! # async fn run() -> pingpong::Result<()> {
//! let server = PongServer::bind(PongServerBuilder::new().port(1491).build()).await?;
//! tokio::spawn(server.run());
//!
//! let config = PingClientBuilder::new().host("127.0.0.1").port(1491).build();
//! let report = PingClient::connect(config)
//!     .await?
//!     .run(Request::clamped(Transport::Datagram, 512, 301))
//!     .await?;
//! report.report_to(&mut WriterSink::stdout(), "UDP Ping: ").ok();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod protocol;
pub mod stats;
pub mod transport;

// Initiator API (feature-gated)
#[cfg(feature = "ping")]
#[cfg_attr(docsrs, doc(cfg(feature = "ping")))]
pub mod client;

// Responder API (feature-gated)
#[cfg(feature = "pong")]
#[cfg_attr(docsrs, doc(cfg(feature = "pong")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{PingPongError, ProtocolError, Result};
    pub use crate::protocol::{Answer, Request, Transport};
    pub use crate::stats::{Statistics, StatisticsSink, WriterSink};

    #[cfg(feature = "ping")]
    pub use crate::client::{ClientConfig, PingClient, PingClientBuilder, PingReport};

    #[cfg(feature = "pong")]
    pub use crate::server::{PongServer, PongServerBuilder, ServerConfig};
}

// Re-export commonly used items at crate root
pub use crate::core::{PingPongError, ProtocolError, Result};
pub use crate::protocol::{Answer, Request, Transport};
