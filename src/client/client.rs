//! High-level ping client.
//!
//! [`PingClient`] opens the negotiation connection, sends the request and
//! runs the exchange engine matching the negotiated transport.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, info, warn};

use super::datagram::DatagramPinger;
use super::stream::StreamPinger;
use crate::core::{
    CONNECT_TIMEOUT, IoContext, MAX_ANSWER_LEN, MAX_RESEND, PingPongError, ProtocolError, Result,
    UDP_TIMEOUT,
};
use crate::protocol::{Answer, Request, Transport};
use crate::stats::StatisticsSink;
use crate::transport::DatagramEndpoint;
use crate::transport::timing::{resolution_ms, within};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or address of the pong server.
    pub host: String,

    /// Port of the pong server's negotiation listener.
    pub port: u16,

    /// Timeout for establishing the connection and reading the answer.
    pub connect_timeout: Duration,

    /// How long a datagram round waits for its echo before resending.
    pub reply_timeout: Duration,

    /// Retransmissions of one datagram before the run fails.
    pub max_resend: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: 0,
            connect_timeout: CONNECT_TIMEOUT,
            reply_timeout: UDP_TIMEOUT,
            max_resend: MAX_RESEND,
        }
    }
}

/// Builder for creating a [`ClientConfig`].
#[derive(Debug, Default)]
pub struct PingClientBuilder {
    config: ClientConfig,
}

impl PingClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set host and port from a socket address.
    pub fn server_addr(mut self, addr: SocketAddr) -> Self {
        self.config.host = addr.ip().to_string();
        self.config.port = addr.port();
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the datagram reply timeout.
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    /// Set the datagram retransmission limit.
    pub fn max_resend(mut self, max: u32) -> Self {
        self.config.max_resend = max;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct PingReport {
    /// The negotiated request.
    pub request: Request,
    /// RTT samples in milliseconds, in round order.
    pub samples: Vec<f64>,
    /// Clock resolution in milliseconds.
    pub resolution_ms: f64,
}

impl PingReport {
    /// Hand the samples to a statistics sink.
    pub fn report_to<K: StatisticsSink>(&self, sink: &mut K, name: &str) -> io::Result<()> {
        sink.consume(
            name,
            &self.samples,
            self.request.message_size(),
            self.resolution_ms,
        )
    }
}

/// A connected ping client.
///
/// # Example
///
/// ```no_run
/// use pingpong::client::{PingClient, PingClientBuilder};
/// use pingpong::protocol::{Request, Transport};
/// use pingpong::stats::WriterSink;
///
/// # async fn run() -> pingpong::core::Result<()> {
/// let config = PingClientBuilder::new().host("localhost").port(1491).build();
/// let client = PingClient::connect(config).await?;
/// let report = client.run(Request::clamped(Transport::Stream, 64, 301)).await?;
/// report.report_to(&mut WriterSink::stdout(), "TCP Ping: ").ok();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PingClient {
    stream: TcpStream,
    peer: SocketAddr,
    config: ClientConfig,
}

impl PingClient {
    /// Resolve the server and open the negotiation connection.
    ///
    /// Every resolved address is tried in turn; the last failure is returned
    /// when none accepts.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let addrs: Vec<SocketAddr> = lookup_host((config.host.as_str(), config.port))
            .await
            .op("Ping cannot resolve server address")?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match within(
                Some(config.connect_timeout),
                "Ping cannot connect to server",
                TcpStream::connect(addr),
            )
            .await
            {
                Ok(stream) => {
                    stream
                        .set_nodelay(true)
                        .op("Ping cannot disable Nagle's algorithm")?;
                    info!(peer = %addr, "connected to pong server");
                    return Ok(Self {
                        stream,
                        peer: addr,
                        config,
                    });
                }
                Err(e) => {
                    debug!(peer = %addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            PingPongError::Config(format!("{} resolved to no addresses", config.host))
        }))
    }

    /// Address of the pong server.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send `request` and read the server's answer.
    ///
    /// Anything other than an `OK` answer is a protocol error, as is a
    /// datagram acceptance without a port.
    pub async fn negotiate(&mut self, request: &Request) -> Result<Answer> {
        self.stream
            .write_all(request.to_line().as_bytes())
            .await
            .op("Ping failed sending request")?;

        let mut answer = [0u8; MAX_ANSWER_LEN];
        let mut len = 0;
        while len < answer.len() && !answer[..len].contains(&b'\n') {
            let n = within(
                Some(self.config.connect_timeout),
                "Ping failed reading answer",
                self.stream.read(&mut answer[len..]),
            )
            .await?;
            if n == 0 {
                break;
            }
            len += n;
        }

        let answer = Answer::parse(&answer[..len])?;
        if request.transport() == Transport::Datagram && answer.port().is_none() {
            return Err(ProtocolError::UnexpectedAnswer(answer.to_string()).into());
        }
        info!(%request, %answer, "request accepted");
        Ok(answer)
    }

    /// Negotiate `request` and run the full exchange.
    pub async fn run(mut self, request: Request) -> Result<PingReport> {
        let answer = self.negotiate(&request).await?;
        let samples = match (request.transport(), answer.port()) {
            (Transport::Datagram, Some(port)) => self.run_datagram(&request, port).await?,
            _ => self.run_stream(&request).await?,
        };
        Ok(PingReport {
            request,
            samples,
            resolution_ms: resolution_ms(),
        })
    }

    /// Run the stream exchange on the negotiation connection.
    ///
    /// The request must already have been accepted with a plain `OK`.
    pub async fn run_stream(self, request: &Request) -> Result<Vec<f64>> {
        let mut pinger = StreamPinger::new(self.stream, request.message_size());
        let samples = pinger.run(request.repetitions()).await?;

        let mut stream = pinger.into_inner();
        if let Err(e) = stream.shutdown().await {
            warn!(error = %e, "failed to shut down connection");
        }
        Ok(samples)
    }

    /// Run the datagram exchange against the server's `port`.
    ///
    /// The negotiation connection is closed first; the timed rounds use a
    /// fresh local endpoint connected to the same server address.
    pub async fn run_datagram(self, request: &Request, port: u16) -> Result<Vec<f64>> {
        let Self {
            mut stream,
            peer,
            config,
        } = self;
        if let Err(e) = stream.shutdown().await {
            warn!(error = %e, "failed to shut down connection");
        }
        drop(stream);

        let local_ip = match peer.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let endpoint = DatagramEndpoint::bind(SocketAddr::new(local_ip, 0))
            .await
            .op("UDP Ping cannot bind socket")?;
        let target = SocketAddr::new(peer.ip(), port);
        endpoint
            .connect(target)
            .await
            .op("UDP Ping cannot connect socket")?;
        debug!(%target, "datagram endpoint ready");

        let mut pinger = DatagramPinger::new(
            endpoint,
            request.message_size(),
            config.reply_timeout,
            config.max_resend,
        );
        let samples = pinger.run(request.repetitions()).await?;
        if pinger.resends() > 0 {
            info!(resends = pinger.resends(), "datagrams were retransmitted");
        }
        Ok(samples)
    }
}
