//! Pong responder: answers ping requests over TCP and UDP.

use std::process::ExitCode;

use clap::Parser;
use pingpong::server::{PongServer, PongServerBuilder};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "pong-server", about = "Answer tcp-ping and udp-ping latency requests")]
struct Args {
    /// Port of the negotiation listener
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = PongServerBuilder::new().port(args.port).build();

    let server = match PongServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "pong server failed to start");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c");
        }
    };
    match server.run_until(shutdown).await {
        Ok(()) => {
            info!("pong server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "pong server failed");
            ExitCode::FAILURE
        }
    }
}
