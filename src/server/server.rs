//! Pong server: accepts negotiation connections and spawns one session task
//! per connection.

use std::future::{Future, pending};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, warn};

use super::session::serve_client;
use crate::core::{IoContext, MAX_RESEND, PONG_RECV_TIMEOUT, PingPongError, Result};
use crate::transport::{DEFAULT_BIND_IP, ephemeral_range};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the rendezvous (negotiation) listener.
    pub bind_addr: SocketAddr,

    /// Receive timeout for the negotiation connection and the echo loops.
    pub recv_timeout: Duration,

    /// Local address for datagram endpoints.
    pub datagram_ip: IpAddr,

    /// Ports scanned for datagram endpoints.
    pub port_range: RangeInclusive<u16>,

    /// Retransmissions of one datagram tolerated per round.
    pub max_resend: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(DEFAULT_BIND_IP, 0),
            recv_timeout: PONG_RECV_TIMEOUT,
            datagram_ip: DEFAULT_BIND_IP,
            port_range: ephemeral_range(),
            max_resend: MAX_RESEND,
        }
    }
}

/// Builder for creating a [`ServerConfig`].
#[derive(Debug, Default)]
pub struct PongServerBuilder {
    config: ServerConfig,
}

impl PongServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendezvous address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Listen on all IPv4 interfaces at `port`.
    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_addr = SocketAddr::new(DEFAULT_BIND_IP, port);
        self
    }

    /// Set the receive timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout = timeout;
        self
    }

    /// Set the local address for datagram endpoints.
    pub fn datagram_ip(mut self, ip: IpAddr) -> Self {
        self.config.datagram_ip = ip;
        self
    }

    /// Set the ports scanned for datagram endpoints.
    pub fn port_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.config.port_range = range;
        self
    }

    /// Set the datagram resend tolerance.
    pub fn max_resend(mut self, max: u32) -> Self {
        self.config.max_resend = max;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// A pong server.
///
/// # Example
///
/// ```no_run
/// use pingpong::server::{PongServer, PongServerBuilder};
///
/// # async fn run() -> pingpong::core::Result<()> {
/// let config = PongServerBuilder::new().port(1491).build();
/// let server = PongServer::bind(config).await?;
/// server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PongServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl PongServer {
    /// Bind the rendezvous listener.
    ///
    /// The accept backlog is left to tokio's default; sessions run in their
    /// own tasks, so pending connections are drained as fast as they come.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .op("Pong Server cannot bind socket")?;
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// Get the local address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .op("Pong Server cannot read local address")
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(pending::<()>()).await
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %self.local_addr()?, "pong server listening");
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => {
                    info!("pong server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) if is_transient(&e) => {
                        warn!(error = %e, "accept interrupted, retrying");
                        continue;
                    }
                    Err(e) => {
                        return Err(PingPongError::io(
                            "Pong server could not accept client connection",
                            e,
                        ));
                    }
                },
            };

            let config = Arc::clone(&self.config);
            let span = info_span!("session", %peer);
            tokio::spawn(
                async move {
                    match serve_client(stream, peer, &config).await {
                        Ok(request) => info!(%request, "session complete"),
                        Err(e) => error!(error = %e, "session failed"),
                    }
                }
                .instrument(span),
            );
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = PongServerBuilder::new()
            .port(1491)
            .recv_timeout(Duration::from_secs(3))
            .port_range(50000..=50010)
            .max_resend(5)
            .build();

        assert_eq!(config.bind_addr.port(), 1491);
        assert_eq!(config.recv_timeout, Duration::from_secs(3));
        assert_eq!(config.port_range, 50000..=50010);
        assert_eq!(config.max_resend, 5);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.recv_timeout, PONG_RECV_TIMEOUT);
        assert_eq!(config.port_range, ephemeral_range());
        assert_eq!(config.max_resend, MAX_RESEND);
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let config = PongServerBuilder::new()
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .build();
        let server = PongServer::bind(config).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        server.run_until(async {}).await.unwrap();
    }
}
