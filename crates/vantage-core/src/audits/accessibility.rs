//! Accessibility checks over rule violations reported by the driver.

use serde_json::{json, Value};

use crate::audit::{Audit, AuditError, AuditMeta, AuditOutput};
use crate::driver::Artifacts;

pub const COLOR_CONTRAST: &str = "color-contrast";

pub struct ColorContrast {
    meta: AuditMeta,
}

impl ColorContrast {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                COLOR_CONTRAST,
                "Accessibility",
                "Background and foreground colors have a sufficient contrast ratio",
                ["Accessibility"],
            ),
        }
    }
}

impl Default for ColorContrast {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for ColorContrast {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let violations = artifacts
            .require("Accessibility")?
            .get("violations")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AuditError::malformed("Accessibility", "expected a `violations` array")
            })?;

        let nodes: Vec<&Value> = violations
            .iter()
            .filter(|v| v.get("id").and_then(Value::as_str) == Some(COLOR_CONTRAST))
            .filter_map(|v| v.get("nodes").and_then(Value::as_array))
            .flatten()
            .collect();

        let output = AuditOutput::binary(nodes.is_empty());
        if nodes.is_empty() {
            return Ok(output);
        }
        Ok(output
            .with_display_value(format!("{} element(s) fail", nodes.len()))
            .with_details(json!({ "nodes": nodes })))
    }
}
