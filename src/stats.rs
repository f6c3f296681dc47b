//! RTT statistics and report rendering.
//!
//! The initiator hands its full sample sequence to a [`StatisticsSink`]
//! once the exchange is over. [`WriterSink`] renders a plain-text report.

use std::fmt;
use std::io::{self, Write};

/// Summary of an RTT sample sequence, all values in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Number of samples.
    pub count: usize,
    /// Message size in bytes.
    pub message_size: usize,
    /// Smallest RTT.
    pub min: f64,
    /// Largest RTT.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (mean of the two middle samples for even counts).
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Clock resolution the samples were taken with.
    pub resolution: f64,
}

impl Statistics {
    /// Summarize `samples`. Returns `None` when there are no samples.
    pub fn compute(samples: &[f64], message_size: usize, resolution: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Some(Self {
            count,
            message_size,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
            std_dev: variance.sqrt(),
            resolution,
        })
    }

    /// Throughput estimate in KiB/s from the median one-way time.
    ///
    /// The one-way time is half the median RTT, never less than half the
    /// clock resolution, so a zero-duration sample cannot divide by zero.
    pub fn throughput_kib_s(&self) -> f64 {
        let rtt_ms = self.median.max(self.resolution).max(f64::MIN_POSITIVE);
        let one_way_s = rtt_ms / 2.0 / 1000.0;
        self.message_size as f64 / 1024.0 / one_way_s
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} samples of {} bytes", self.count, self.message_size)?;
        writeln!(
            f,
            "min/avg/max/median = {:.3}/{:.3}/{:.3}/{:.3} ms",
            self.min, self.mean, self.max, self.median
        )?;
        writeln!(f, "standard deviation = {:.3} ms", self.std_dev)?;
        writeln!(f, "clock resolution = {:.6} ms", self.resolution)?;
        write!(f, "median throughput = {:.3} KiB/s", self.throughput_kib_s())
    }
}

/// Consumer of a finished RTT sample sequence.
pub trait StatisticsSink {
    /// Consume the samples of one run.
    fn consume(
        &mut self,
        name: &str,
        samples: &[f64],
        message_size: usize,
        resolution: f64,
    ) -> io::Result<()>;
}

/// Renders reports as text to any writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    /// Create a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterSink<io::Stdout> {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StatisticsSink for WriterSink<W> {
    fn consume(
        &mut self,
        name: &str,
        samples: &[f64],
        message_size: usize,
        resolution: f64,
    ) -> io::Result<()> {
        match Statistics::compute(samples, message_size, resolution) {
            Some(stats) => {
                for line in stats.to_string().lines() {
                    writeln!(self.out, "{name}{line}")?;
                }
            }
            None => writeln!(self.out, "{name}no samples")?,
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_odd() {
        let stats = Statistics::compute(&[3.0, 1.0, 2.0], 64, 0.001).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.median, 2.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.std_dev - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_compute_even_median() {
        let stats = Statistics::compute(&[4.0, 1.0, 3.0, 2.0], 64, 0.001).unwrap();
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn test_compute_empty() {
        assert!(Statistics::compute(&[], 64, 0.001).is_none());
    }

    #[test]
    fn test_throughput() {
        // 1024 bytes, 2 ms RTT => 1 KiB per 1 ms one-way => 1000 KiB/s.
        let stats = Statistics::compute(&[2.0], 1024, 0.001).unwrap();
        assert!((stats.throughput_kib_s() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_throughput_clamped_to_resolution() {
        let stats = Statistics::compute(&[0.0, 0.0], 1024, 2.0).unwrap();
        assert!((stats.throughput_kib_s() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.consume("TCP Ping: ", &[1.0, 2.0, 3.0], 64, 0.001).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.starts_with("TCP Ping: 3 samples of 64 bytes\n"));
        assert!(text.contains("TCP Ping: min/avg/max/median = 1.000/2.000/3.000/2.000 ms"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_writer_sink_empty() {
        let mut sink = WriterSink::new(Vec::new());
        sink.consume("UDP Ping: ", &[], 64, 0.001).unwrap();
        assert_eq!(sink.into_inner(), b"UDP Ping: no samples\n");
    }
}
