//! Metric declarations for the session engine.
//!
//! Metrics go through the `metrics` facade; nothing is recorded unless the
//! host installs a recorder.
//!
//! ```rust,ignore
//! use ebi_device::metrics::{describe_metrics, metric_defs};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::FRAMES_SENT.name).increment(1);
//! ```

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "ebi.frames.sent").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement.
    pub unit: Unit,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric.
    pub const fn counter(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
            unit: Unit::Count,
            labels: &[],
        }
    }

    /// Creates a new histogram metric.
    pub const fn histogram(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description,
            unit,
            labels: &[],
        }
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All metric definitions for the session engine.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Frames written to the transport.
    pub const FRAMES_SENT: Metric = Metric::counter("ebi.frames.sent", "Frames written to the module");

    /// Frames read from the transport that passed length and checksum checks.
    pub const FRAMES_RECEIVED: Metric =
        Metric::counter("ebi.frames.received", "Valid frames read from the module");

    /// Protocol faults, by kind.
    ///
    /// Labels: kind
    pub const PROTOCOL_FAULTS: Metric =
        Metric::counter("ebi.protocol.faults", "Malformed or misaligned exchanges")
            .with_labels(&["kind"]);

    /// Receive calls that timed out with nothing to read.
    pub const RECEIVE_TIMEOUTS: Metric =
        Metric::counter("ebi.receive.timeouts", "Receive calls that returned no packet");

    /// Round trip time of a command exchange.
    pub const EXCHANGE_DURATION: Metric = Metric::histogram(
        "ebi.exchange.duration_ms",
        "Time from writing a command to decoding its response",
        Unit::Milliseconds,
    );

    /// All metrics, for registration.
    pub const ALL: &[Metric] = &[
        FRAMES_SENT,
        FRAMES_RECEIVED,
        PROTOCOL_FAULTS,
        RECEIVE_TIMEOUTS,
        EXCHANGE_DURATION,
    ];
}

/// Describe every metric with the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("ebi.")));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
        assert_eq!(metric_defs::PROTOCOL_FAULTS.labels, &["kind"]);
        assert_eq!(metric_defs::EXCHANGE_DURATION.kind, MetricKind::Histogram);
    }
}
