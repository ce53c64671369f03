//! The per-minute measurement handed in by the host simulation.

use serde::{Deserialize, Serialize};

/// One observation of the patient, delivered once per simulated minute.
///
/// Only the glucose concentration is consumed by the dosing strategies; the
/// struct is non-exhaustive so further sensor channels can be added without
/// breaking hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Observation {
    /// Plasma glucose concentration in mg/dl.
    pub glucose: f64,
}

impl Observation {
    /// Creates an observation from a glucose concentration in mg/dl.
    #[must_use]
    pub const fn new(glucose: f64) -> Self {
        Self { glucose }
    }
}
