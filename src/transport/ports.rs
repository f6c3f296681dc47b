//! Ephemeral port allocation for the datagram phase.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;

use thiserror::Error;
use tracing::{debug, trace};

use super::socket::DatagramEndpoint;
use crate::core::{IANA_EPHEMERAL_MAX, IANA_EPHEMERAL_MIN};

/// Errors from [`allocate_port`].
#[derive(Debug, Error)]
pub enum PortError {
    /// Every port in the range is already in use.
    #[error("no free port in {start}..={end}")]
    Exhausted {
        /// First port tried.
        start: u16,
        /// Last port tried.
        end: u16,
    },

    /// Binding failed for a reason other than the port being in use.
    #[error("could not bind UDP port {port}: {source}")]
    Bind {
        /// Port being bound.
        port: u16,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// The IANA dynamic/private port range.
pub fn ephemeral_range() -> RangeInclusive<u16> {
    IANA_EPHEMERAL_MIN..=IANA_EPHEMERAL_MAX
}

/// Default local address for datagram endpoints (all IPv4 interfaces).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Bind a UDP endpoint on the first free port of `range`, in ascending order.
///
/// A port already in use is skipped; any other bind failure stops the scan.
/// The returned endpoint keeps the port reserved until it is dropped.
pub async fn allocate_port(
    ip: IpAddr,
    range: RangeInclusive<u16>,
) -> Result<DatagramEndpoint, PortError> {
    let (start, end) = (*range.start(), *range.end());
    for port in range {
        match DatagramEndpoint::bind(SocketAddr::new(ip, port)).await {
            Ok(endpoint) => {
                debug!(port, "allocated datagram port");
                return Ok(endpoint);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                trace!(port, "port in use");
            }
            Err(source) => return Err(PortError::Bind { port, source }),
        }
    }
    Err(PortError::Exhausted { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_allocates_within_ephemeral_range() {
        let endpoint = allocate_port(LOOPBACK, ephemeral_range()).await.unwrap();
        assert!(ephemeral_range().contains(&endpoint.port()));
    }

    #[tokio::test]
    async fn test_never_returns_held_port() {
        let first = allocate_port(LOOPBACK, ephemeral_range()).await.unwrap();
        let second = allocate_port(LOOPBACK, ephemeral_range()).await.unwrap();
        assert_ne!(first.port(), second.port());
    }

    #[tokio::test]
    async fn test_skips_port_in_use() {
        let held = DatagramEndpoint::bind(SocketAddr::new(LOOPBACK, 0))
            .await
            .unwrap();
        let port = held.port();
        if port == u16::MAX {
            return;
        }
        let endpoint = allocate_port(LOOPBACK, port..=port + 1).await;
        // port + 1 may be taken by someone else; either way `port` is skipped.
        match endpoint {
            Ok(endpoint) => assert_eq!(endpoint.port(), port + 1),
            Err(e) => assert!(matches!(e, PortError::Exhausted { .. })),
        }
    }

    #[tokio::test]
    async fn test_exhausted_range() {
        let held = DatagramEndpoint::bind(SocketAddr::new(LOOPBACK, 0))
            .await
            .unwrap();
        let port = held.port();
        let err = allocate_port(LOOPBACK, port..=port).await.unwrap_err();
        assert!(matches!(err, PortError::Exhausted { start, end } if start == port && end == port));
    }

    #[tokio::test]
    async fn test_empty_range_is_exhausted() {
        #[allow(clippy::reversed_empty_ranges)]
        let err = allocate_port(LOOPBACK, 2..=1).await.unwrap_err();
        assert!(matches!(err, PortError::Exhausted { .. }));
    }
}
