#![warn(missing_docs)]
//! # ophtalm-contract
//!
//! ## Purpose
//! Defines the inference endpoint response schema and the deterministic
//! transform from a raw model score to a user-facing assessment.
//!
//! ## Responsibilities
//! - Parse `/predict` response payloads.
//! - Derive glaucoma flag, confidence percentage and severity tier.
//! - Preserve the opaque `prediction` field for audit/display.
//!
//! ## Data flow
//! Raw JSON response -> [`parse_prediction_response`] -> [`interpret`] ->
//! [`AnalysisResult`] stored in the session.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs to avoid borrowing from transient network
//! buffers.
//!
//! ## Error model
//! Invalid JSON or an out-of-range `prediction_value` return
//! [`ContractError`]. [`interpret`] itself is total and never fails.
//!
//! ## Contract notes
//! The computation reads `prediction_value`, while the passthrough reads
//! `prediction`. The two keys are kept distinct because that is what the
//! endpoint emits; they are never merged or cross-checked here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scores at or below this value are classified as glaucoma.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Lowest confidence ever reported.
pub const CONFIDENCE_FLOOR: f64 = 70.0;

/// Highest confidence ever reported.
pub const CONFIDENCE_CEILING: f64 = 100.0;

/// Glaucoma scores strictly below this value are severe.
pub const SEVERE_BELOW: f64 = 0.20;

/// Glaucoma scores strictly below this value (and not severe) are moderate.
pub const MODERATE_BELOW: f64 = 0.35;

/// Parsed response from the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Normalized model score in [0, 1]; lower means glaucoma is more likely.
    pub prediction_value: f64,
    /// Opaque display-only value, passed through untouched.
    #[serde(default)]
    pub prediction: serde_json::Value,
}

impl RawPrediction {
    /// Creates a prediction with a null passthrough field.
    pub fn from_value(prediction_value: f64) -> Self {
        Self {
            prediction_value,
            prediction: serde_json::Value::Null,
        }
    }
}

/// Ordinal severity tier; [`Severity::None`] iff no glaucoma was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Severity {
    /// No glaucoma detected.
    None,
    /// Mild glaucoma signs.
    Mild,
    /// Moderate glaucoma signs.
    Moderate,
    /// Severe glaucoma signs.
    Severe,
}

impl Severity {
    /// Numeric tier in `0..=3`.
    pub fn level(self) -> u8 {
        match self {
            Severity::None => 0,
            Severity::Mild => 1,
            Severity::Moderate => 2,
            Severity::Severe => 3,
        }
    }

    /// Human-readable tier label.
    pub fn label(self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }

    /// Number of filled segments on the three-segment severity meter.
    pub fn filled_segments(self) -> usize {
        usize::from(self.level())
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

/// Normalized assessment derived from one successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    has_glaucoma: bool,
    confidence: f64,
    severity: Severity,
    raw_prediction: serde_json::Value,
}

impl AnalysisResult {
    /// Whether signs of glaucoma were detected.
    pub fn has_glaucoma(&self) -> bool {
        self.has_glaucoma
    }

    /// Confidence percentage in [70, 100], rounded to two decimals.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence formatted with two decimals, e.g. `"87.50"`.
    pub fn confidence_text(&self) -> String {
        format!("{:.2}", self.confidence)
    }

    /// Severity tier.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Passthrough of the response's `prediction` field.
    pub fn raw_prediction(&self) -> &serde_json::Value {
        &self.raw_prediction
    }
}

/// Parses raw response bytes into a validated prediction.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON or a missing
/// `prediction_value`.
/// Returns [`ContractError::InvalidContract`] when `prediction_value` lies
/// outside [0, 1].
pub fn parse_prediction_response(raw: &[u8]) -> Result<RawPrediction, ContractError> {
    let parsed: RawPrediction = serde_json::from_slice(raw)?;

    if !(0.0..=1.0).contains(&parsed.prediction_value) {
        return Err(ContractError::InvalidContract(format!(
            "prediction_value {} is outside [0, 1]",
            parsed.prediction_value
        )));
    }

    Ok(parsed)
}

/// Derives the normalized assessment from a raw prediction.
///
/// Pure and deterministic: equal inputs give bit-identical outputs.
pub fn interpret(raw: &RawPrediction) -> AnalysisResult {
    let value = raw.prediction_value;
    let has_glaucoma = value <= DECISION_THRESHOLD;

    AnalysisResult {
        has_glaucoma,
        confidence: confidence_for(value, has_glaucoma),
        severity: severity_for(value, has_glaucoma),
        raw_prediction: raw.prediction.clone(),
    }
}

/// Unclamped confidence: 100 per half-unit of distance on either side of the
/// decision threshold, measured from the opposite extreme.
pub fn raw_confidence(value: f64, has_glaucoma: bool) -> f64 {
    if has_glaucoma {
        (1.0 - value) * 2.0 * 100.0
    } else {
        value * 2.0 * 100.0 - 100.0
    }
}

fn confidence_for(value: f64, has_glaucoma: bool) -> f64 {
    // `max` before `min` so a NaN score lands on the floor.
    let clamped = raw_confidence(value, has_glaucoma)
        .max(CONFIDENCE_FLOOR)
        .min(CONFIDENCE_CEILING);
    round_to_hundredths(clamped)
}

fn severity_for(value: f64, has_glaucoma: bool) -> Severity {
    if !has_glaucoma {
        Severity::None
    } else if value < SEVERE_BELOW {
        Severity::Severe
    } else if value < MODERATE_BELOW {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Rounds the exact binary value to two decimals, ties away from zero.
fn round_to_hundredths(value: f64) -> f64 {
    // Only odd multiples of 1/8 sit exactly between two hundredths.
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths.rem_euclid(2.0) == 1.0 {
        return (value * 100.0).ceil() / 100.0;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Response contract errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure.
    #[error("prediction decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("prediction contract violation: {0}")]
    InvalidContract(String),
}
