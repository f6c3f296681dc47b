//! Monotonic timestamps and millisecond arithmetic for RTT samples.

use std::future::Future;
use std::io;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::core::{IoContext, PingPongError};

/// Timing constants.
pub mod constants {
    /// Samples taken when probing the clock resolution.
    pub const RESOLUTION_PROBES: usize = 64;

    /// Upper bound on spins while waiting for the clock to tick once.
    pub const RESOLUTION_MAX_SPINS: usize = 1_000_000;
}

/// Capture a monotonic timestamp.
#[inline]
pub fn now() -> Instant {
    Instant::now()
}

/// Milliseconds elapsed from `previous` to `last`.
///
/// Saturates to zero if `last` is earlier than `previous`.
pub fn delta_ms(last: Instant, previous: Instant) -> f64 {
    duration_ms(last.saturating_duration_since(previous))
}

/// A duration expressed in fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Estimated resolution of the monotonic clock.
///
/// The standard library does not expose the clock's nominal resolution, so
/// this measures the smallest non-zero step between consecutive readings.
/// The probe runs once per process.
pub fn clock_resolution() -> Duration {
    static RESOLUTION: OnceLock<Duration> = OnceLock::new();
    *RESOLUTION.get_or_init(probe_resolution)
}

/// [`clock_resolution`] in milliseconds.
pub fn resolution_ms() -> f64 {
    duration_ms(clock_resolution())
}

/// Await an I/O operation, giving up after `limit` when one is set.
pub async fn within<T>(
    limit: Option<Duration>,
    op: &'static str,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T, PingPongError> {
    match limit {
        None => fut.await.op(op),
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| PingPongError::Timeout { op, after })?
            .op(op),
    }
}

fn probe_resolution() -> Duration {
    let mut best: Option<Duration> = None;
    for _ in 0..constants::RESOLUTION_PROBES {
        let start = Instant::now();
        for _ in 0..constants::RESOLUTION_MAX_SPINS {
            let step = Instant::now().saturating_duration_since(start);
            if !step.is_zero() {
                best = Some(best.map_or(step, |b| b.min(step)));
                break;
            }
        }
    }
    // A clock that never ticked within the spin budget is reported at 1 ms.
    best.unwrap_or(Duration::from_millis(1))
}
