//! Error types for glucoloop.
//!
//! All errors are strongly typed using thiserror. The layers mirror who is at
//! fault: `ValidationError` for bad configuration, `ContractError` for
//! caller-contract violations, `EngineError` for failures at the external
//! decision-engine boundary.

use thiserror::Error;

use crate::time::SimTime;

/// Validation errors raised while checking configuration parameters.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A numeric parameter was NaN or infinite.
    #[error("Parameter '{name}' must be finite, got {value}")]
    NonFinite {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A numeric parameter was negative where only zero or more is allowed.
    #[error("Parameter '{name}' must be non-negative, got {value}")]
    Negative {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A basal schedule with no entries cannot be handed to the engine.
    #[error("Basal schedule must contain at least one entry")]
    EmptyBasalSchedule,
}

/// Caller-contract violations. These are programming errors in the host, not
/// recoverable runtime conditions, and are surfaced instead of being masked.
#[derive(Debug, Error)]
pub enum ContractError {
    /// `compute_treatment` was called before `reset()` armed the run.
    #[error("compute_treatment called before reset() on the {strategy} strategy")]
    ResetRequired {
        /// Which strategy rejected the call.
        strategy: &'static str,
    },

    /// The adapter needs the patient's basal rate before it can dose.
    #[error("No patient profile bound; call set_patient before compute_treatment")]
    PatientNotBound,

    /// Simulation time must advance strictly; going backwards (or standing
    /// still) would corrupt the minute-keyed histories.
    #[error("Simulation time did not advance: last seen t={last}, got t={got}")]
    TimeRegression {
        /// The most recent minute the controller was called with.
        last: SimTime,
        /// The offending minute.
        got: SimTime,
    },
}

/// Failures at the external decision-engine boundary.
///
/// The host decides whether to retain the previous dosing or abort the run;
/// the adapter never swallows these.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An engine call raised an error.
    #[error("Decision engine {stage} call failed: {message}")]
    CallFailed {
        /// Which engine entry point failed (e.g. "determine-basal").
        stage: String,
        /// Engine-provided failure detail.
        message: String,
    },

    /// The engine answered, but the recommendation cannot be applied.
    #[error("Decision engine returned an invalid recommendation: {reason}")]
    InvalidRecommendation {
        /// Why the recommendation was rejected.
        reason: String,
    },
}

/// Top-level error type for glucoloop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Configuration validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The host violated the controller calling contract.
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// The external decision engine failed.
    #[error("Decision engine error: {0}")]
    Engine(#[from] EngineError),

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable description.
        message: String,
    },
}

impl LoopError {
    /// Creates an internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`LoopError`].
pub type LoopResult<T> = Result<T, LoopError>;
