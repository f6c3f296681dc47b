//! Per-connection responder session.
//!
//! A session reads the request line, replies once with `OK`, `OK <port>` or
//! `ERROR`, and then runs the echo loop for the negotiated transport. The
//! negotiation connection is shut down on every exit path.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::datagram::udp_pong;
use super::server::ServerConfig;
use super::stream::tcp_pong;
use crate::core::{IoContext, MAX_REQUEST_LEN, PingPongError, ProtocolError, Result};
use crate::protocol::{Answer, Request, Transport};
use crate::transport::timing::within;
use crate::transport::{DatagramEndpoint, PortError, allocate_port};

/// What the negotiation settled on.
#[derive(Debug)]
enum Accepted {
    /// Stream exchange on the negotiation connection.
    Stream(Request),
    /// Datagram exchange on a freshly allocated endpoint.
    Datagram(Request, DatagramEndpoint),
}

impl Accepted {
    fn answer(&self) -> Answer {
        match self {
            Self::Stream(_) => Answer::Ok,
            Self::Datagram(_, endpoint) => Answer::OkPort(endpoint.port()),
        }
    }
}

/// Serve one accepted connection to completion.
///
/// Returns the request that was served.
pub async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    config: &ServerConfig,
) -> Result<Request> {
    debug!(%peer, "got connection");
    let mut reader = BufReader::new(stream);

    let outcome = negotiate(&mut reader, config).await;
    let answer = match &outcome {
        Ok(accepted) => accepted.answer(),
        Err(_) => Answer::Error,
    };

    if let Err(e) = write_answer(&mut reader, answer).await {
        close(reader).await;
        return Err(match outcome {
            Err(negotiation) => negotiation,
            Ok(_) => e,
        });
    }

    match outcome {
        Err(e) => {
            close(reader).await;
            Err(e)
        }
        Ok(Accepted::Stream(request)) => {
            info!(%peer, %request, "serving TCP pong");
            let result = tcp_pong(&mut reader, &request, Some(config.recv_timeout)).await;
            close(reader).await;
            result.map(|_| request)
        }
        Ok(Accepted::Datagram(request, mut endpoint)) => {
            info!(%peer, %request, port = endpoint.port(), "serving UDP pong");
            close(reader).await;
            udp_pong(
                &mut endpoint,
                &request,
                config.max_resend,
                Some(config.recv_timeout),
            )
            .await
            .map(|_| request)
        }
    }
}

/// Read and validate the request, then acquire what the transport needs.
async fn negotiate(reader: &mut BufReader<TcpStream>, config: &ServerConfig) -> Result<Accepted> {
    let request = read_request(reader, config).await?;

    match request.transport() {
        Transport::Stream => {
            reader
                .get_ref()
                .set_nodelay(true)
                .op("Pong Server TCP cannot set TCP_NODELAY option")?;
            Ok(Accepted::Stream(request))
        }
        Transport::Datagram => {
            match allocate_port(config.datagram_ip, config.port_range.clone()).await {
                Ok(endpoint) => Ok(Accepted::Datagram(request, endpoint)),
                Err(PortError::Exhausted { start, end }) => {
                    warn!(start, end, "UDP Pong could not find any free ephemeral port");
                    Err(PingPongError::PortsExhausted)
                }
                Err(PortError::Bind { source, .. }) => Err(PingPongError::io(
                    "UDP Pong could not bind the socket",
                    source,
                )),
            }
        }
    }
}

/// Read one request line, bounded in length and time.
pub async fn read_request<R>(reader: &mut BufReader<R>, config: &ServerConfig) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let mut limited = (&mut *reader).take(MAX_REQUEST_LEN as u64);
    let n = within(
        Some(config.recv_timeout),
        "Pong server could not read request",
        limited.read_line(&mut line),
    )
    .await
    .map_err(|e| match e {
        PingPongError::Io { source, .. } if source.kind() == std::io::ErrorKind::InvalidData => {
            ProtocolError::MalformedRequest("request is not valid UTF-8".into()).into()
        }
        e => e,
    })?;

    if n == 0 {
        return Err(ProtocolError::MalformedRequest("no request received".into()).into());
    }
    if n == MAX_REQUEST_LEN && !line.ends_with('\n') {
        return Err(ProtocolError::MalformedRequest("request line too long".into()).into());
    }

    Ok(Request::parse(&line)?)
}

async fn write_answer(reader: &mut BufReader<TcpStream>, answer: Answer) -> Result<()> {
    debug!(%answer, "sending answer");
    reader
        .get_mut()
        .write_all(answer.to_line().as_bytes())
        .await
        .op("Pong server cannot send answer to the client")
}

async fn close(reader: BufReader<TcpStream>) {
    let mut stream = reader.into_inner();
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "shutdown of request connection failed");
    }
}
