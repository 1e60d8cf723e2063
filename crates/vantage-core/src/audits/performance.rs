//! Load performance checks.

use serde_json::{json, Value};

use crate::audit::{Audit, AuditError, AuditMeta, AuditOutput};
use crate::driver::Artifacts;

pub const FIRST_MEANINGFUL_PAINT: &str = "first-meaningful-paint";

/// At or below this paint time the score is 1.
const FMP_GOOD_MS: f64 = 1_600.0;
/// At or above this paint time the score is 0.
const FMP_POOR_MS: f64 = 10_000.0;

pub struct FirstMeaningfulPaint {
    meta: AuditMeta,
}

impl FirstMeaningfulPaint {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                FIRST_MEANINGFUL_PAINT,
                "Performance",
                "First meaningful paint",
                ["Timings"],
            ),
        }
    }

    /// Linear score between the good and poor bounds.
    fn score(paint_ms: f64) -> f64 {
        ((FMP_POOR_MS - paint_ms) / (FMP_POOR_MS - FMP_GOOD_MS)).clamp(0.0, 1.0)
    }
}

impl Default for FirstMeaningfulPaint {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for FirstMeaningfulPaint {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let paint_ms = artifacts
            .require("Timings")?
            .get("firstMeaningfulPaint")
            .and_then(Value::as_f64)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .ok_or_else(|| {
                AuditError::malformed(
                    "Timings",
                    "expected a non-negative `firstMeaningfulPaint` in milliseconds",
                )
            })?;

        Ok(AuditOutput::numeric(Self::score(paint_ms))
            .with_display_value(format!("{paint_ms:.1}ms"))
            .with_details(json!({ "firstMeaningfulPaint": paint_ms })))
    }
}
