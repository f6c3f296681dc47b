//! TCP ping initiator: times TCP echo rounds against a pong server.

use std::process::ExitCode;

use clap::Parser;
use pingpong::client::{PingClient, PingClientBuilder};
use pingpong::protocol::{Request, Transport, repetitions_from_arg};
use pingpong::stats::WriterSink;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "tcp-ping", about = "Measure TCP round-trip latency against a pong server")]
struct Args {
    /// Host name or address of the pong server
    host: String,

    /// Port of the pong server
    port: u16,

    /// Message size in bytes (clamped to the TCP bounds)
    size: usize,

    /// Number of repetitions (non-numeric values select the default)
    repetitions: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let repetitions = repetitions_from_arg(args.repetitions.as_deref());
    let request = Request::clamped(Transport::Stream, args.size, repetitions);

    let config = PingClientBuilder::new().host(args.host).port(args.port).build();
    let report = match PingClient::connect(config).await {
        Ok(client) => client.run(request).await,
        Err(e) => Err(e),
    };

    match report {
        Ok(report) => match report.report_to(&mut WriterSink::stdout(), "TCP Ping: ") {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "cannot write report");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "TCP ping failed");
            ExitCode::FAILURE
        }
    }
}
