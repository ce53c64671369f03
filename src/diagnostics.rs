//! Call-scoped capture of decision-engine diagnostics.
//!
//! The external engine narrates its reasoning as free text while it works.
//! That output is captured through a [`DiagnosticSink`] owned by the single
//! engine consultation that produced it: the adapter creates a fresh
//! [`DebugBuffer`] per decision cycle, threads it through every engine call,
//! and drains it into the returned [`CycleLog`]. Nothing process-wide is
//! touched, so a failing engine call cannot leak captured output into later
//! cycles or runs.

use serde::{Deserialize, Serialize};

use crate::engine::BasalRecommendation;
use crate::time::SimTime;

/// Receiver for diagnostic text emitted during an engine call.
pub trait DiagnosticSink {
    /// Records one diagnostic entry.
    fn record(&mut self, entry: &str);
}

/// The standard sink: accumulates trimmed, non-empty entries in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugBuffer {
    entries: Vec<String>,
}

impl DebugBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Consumes the buffer, yielding the recorded entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DiagnosticSink for DebugBuffer {
    fn record(&mut self, entry: &str) {
        let trimmed = entry.trim();
        if !trimmed.is_empty() {
            self.entries.push(trimmed.to_string());
        }
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _entry: &str) {}
}

/// Splits an engine reason string on commas and semicolons into trimmed,
/// non-empty segments.
#[must_use]
pub fn split_reason(reason: &str) -> Vec<String> {
    reason
        .split([',', ';'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// One predicted glucose point, placed on the simulation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedBg {
    /// Simulation minute the prediction refers to.
    pub t: SimTime,
    /// Predicted glucose concentration in mg/dl.
    #[serde(rename = "BG")]
    pub bg: f64,
}

/// Diagnostic output of one decision cycle.
///
/// Produced only on minutes where the engine was consulted; purely for
/// logging and visualization, never consulted for dosing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleLog {
    /// The engine's reason text, split into ordered segments.
    pub reason: Vec<String>,
    /// Diagnostic text captured during the engine calls of this cycle.
    pub debug: Vec<String>,
    /// Predicted glucose trajectory on the simulation timeline, if the engine
    /// supplied one.
    #[serde(rename = "predictedBG")]
    pub predicted_bg: Vec<PredictedBg>,
    /// The full engine recommendation this cycle acted on.
    pub recommendation: BasalRecommendation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_trims_and_drops_empty_entries() {
        let mut buffer = DebugBuffer::new();
        buffer.record("  IOB: 0.35  ");
        buffer.record("   ");
        buffer.record("");
        buffer.record("target 100");

        assert_eq!(buffer.entries(), ["IOB: 0.35", "target 100"]);
    }

    #[test]
    fn reason_splits_on_commas_and_semicolons() {
        let segments = split_reason("COB: 24, Dev: -2; adding 0.3 U/h, temp 1.3 >~ req 1.3U/hr");
        assert_eq!(
            segments,
            [
                "COB: 24",
                "Dev: -2",
                "adding 0.3 U/h",
                "temp 1.3 >~ req 1.3U/hr"
            ]
        );
    }

    #[test]
    fn reason_splitting_skips_empty_segments() {
        assert_eq!(split_reason("a,, b; "), ["a", "b"]);
        assert!(split_reason("").is_empty());
    }

    #[test]
    fn predicted_bg_serializes_uppercase_field() {
        let point = PredictedBg {
            t: SimTime::from_minutes(15),
            bg: 112.0,
        };
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["t"], 15);
        assert_eq!(json["BG"], 112.0);
    }
}
