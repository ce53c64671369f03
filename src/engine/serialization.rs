//! JSON helpers for the engine boundary.
//!
//! Serde already provides the serialization; this module centralizes the
//! conversions used when the decision engine runs out of process (the
//! reference engine is a JavaScript program) and keeps formatting stable.

use crate::engine::payload::{BasalRecommendation, BasalRequest};
use crate::error::{LoopError, LoopResult};

/// Serializes a basal request to pretty JSON.
///
/// # Errors
///
/// Returns an internal error if serialization fails.
pub fn request_to_json_pretty(request: &BasalRequest<'_>) -> LoopResult<String> {
    serde_json::to_string_pretty(request)
        .map_err(|e| LoopError::internal(format!("serialize basal request: {e}")))
}

/// Deserializes an engine recommendation from JSON.
///
/// # Errors
///
/// Returns an internal error if the JSON does not parse.
pub fn recommendation_from_json(s: &str) -> LoopResult<BasalRecommendation> {
    serde_json::from_str::<BasalRecommendation>(s)
        .map_err(|e| LoopError::internal(format!("deserialize recommendation: {e}")))
}
