//! Progressive web app checks.

use serde_json::{json, Value};

use crate::audit::{Audit, AuditError, AuditMeta, AuditOutput};
use crate::driver::Artifacts;

pub const IS_ON_HTTPS: &str = "is-on-https";
pub const REDIRECTS_HTTP: &str = "redirects-http";
pub const SERVICE_WORKER: &str = "service-worker";
pub const VIEWPORT: &str = "viewport";
pub const THEME_COLOR_META: &str = "theme-color-meta";
pub const WITHOUT_JAVASCRIPT: &str = "without-javascript";

const SECURITY: &str = "Security";
const OFFLINE: &str = "Offline";
const MOBILE_FRIENDLY: &str = "Mobile Friendly";
const PROGRESSIVE_ENHANCEMENT: &str = "Progressive Enhancement";

/// Read `{ "value": bool }`.
fn flag_value(artifacts: &Artifacts, artifact: &str) -> Result<bool, AuditError> {
    artifacts
        .require(artifact)?
        .get("value")
        .and_then(Value::as_bool)
        .ok_or_else(|| AuditError::malformed(artifact, "expected an object with a boolean `value`"))
}

/// Read a string artifact; `null` means the element was absent.
fn optional_text<'a>(artifacts: &'a Artifacts, artifact: &str) -> Result<Option<&'a str>, AuditError> {
    match artifacts.require(artifact)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        other => Err(AuditError::malformed(
            artifact,
            format!("expected a string or null, got {other}"),
        )),
    }
}

pub struct IsOnHttps {
    meta: AuditMeta,
}

impl IsOnHttps {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                IS_ON_HTTPS,
                SECURITY,
                "Site is on HTTPS",
                ["HTTPS"],
            ),
        }
    }
}

impl Default for IsOnHttps {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for IsOnHttps {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        Ok(AuditOutput::binary(flag_value(artifacts, "HTTPS")?))
    }
}

pub struct RedirectsHttp {
    meta: AuditMeta,
}

impl RedirectsHttp {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                REDIRECTS_HTTP,
                SECURITY,
                "Site redirects HTTP traffic to HTTPS",
                ["HTTPRedirect"],
            ),
        }
    }
}

impl Default for RedirectsHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for RedirectsHttp {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        Ok(AuditOutput::binary(flag_value(artifacts, "HTTPRedirect")?))
    }
}

pub struct ServiceWorker {
    meta: AuditMeta,
}

impl ServiceWorker {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                SERVICE_WORKER,
                OFFLINE,
                "Has a registered service worker",
                ["ServiceWorker"],
            ),
        }
    }
}

impl Default for ServiceWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for ServiceWorker {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let artifact = artifacts.require("ServiceWorker")?;
        if !artifact.is_object() {
            return Err(AuditError::malformed(
                "ServiceWorker",
                "expected an object with an optional `version`",
            ));
        }
        let output = match artifact.get("version").filter(|v| !v.is_null()) {
            Some(version) => AuditOutput::binary(true).with_details(json!({ "version": version })),
            None => AuditOutput::binary(false),
        };
        Ok(output)
    }
}

pub struct Viewport {
    meta: AuditMeta,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                VIEWPORT,
                MOBILE_FRIENDLY,
                "HTML has a viewport <meta>",
                ["Viewport"],
            ),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for Viewport {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let content = optional_text(artifacts, "Viewport")?;
        let passed = content
            .map(|c| c.contains("width=") || c.contains("initial-scale"))
            .unwrap_or(false);
        let output = AuditOutput::binary(passed);
        Ok(match content {
            Some(c) => output.with_display_value(c),
            None => output,
        })
    }
}

pub struct ThemeColorMeta {
    meta: AuditMeta,
}

impl ThemeColorMeta {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                THEME_COLOR_META,
                MOBILE_FRIENDLY,
                "HTML has a theme-color <meta>",
                ["ThemeColor"],
            ),
        }
    }
}

impl Default for ThemeColorMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for ThemeColorMeta {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let color = optional_text(artifacts, "ThemeColor")?
            .map(str::trim)
            .filter(|c| !c.is_empty());
        Ok(match color {
            Some(c) => AuditOutput::binary(true).with_display_value(c),
            None => AuditOutput::binary(false),
        })
    }
}

pub struct WithoutJavaScript {
    meta: AuditMeta,
}

impl WithoutJavaScript {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                WITHOUT_JAVASCRIPT,
                PROGRESSIVE_ENHANCEMENT,
                "Page contains some content when its scripts are not available",
                ["HTMLWithoutJavaScript"],
            ),
        }
    }
}

impl Default for WithoutJavaScript {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit for WithoutJavaScript {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError> {
        let text = optional_text(artifacts, "HTMLWithoutJavaScript")?.unwrap_or_default();
        Ok(AuditOutput::binary(!text.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Score;

    fn artifacts(name: &str, value: Value) -> Artifacts {
        [(name, value)].into_iter().collect()
    }

    #[test]
    fn test_is_on_https() {
        let audit = IsOnHttps::new();
        let out = audit
            .audit(&artifacts("HTTPS", json!({ "value": true })))
            .unwrap();
        assert_eq!(out.score, Score::Binary(true));

        let err = audit
            .audit(&artifacts("HTTPS", json!("yes")))
            .unwrap_err();
        assert!(matches!(err, AuditError::MalformedArtifact { .. }));
    }

    #[test]
    fn test_service_worker_version_in_details() {
        let audit = ServiceWorker::new();
        let out = audit
            .audit(&artifacts("ServiceWorker", json!({ "version": "v3" })))
            .unwrap();
        assert_eq!(out.score, Score::Binary(true));
        assert_eq!(out.details, Some(json!({ "version": "v3" })));

        let out = audit
            .audit(&artifacts("ServiceWorker", json!({ "version": null })))
            .unwrap();
        assert_eq!(out.score, Score::Binary(false));
    }

    #[test]
    fn test_viewport_requires_width_or_scale() {
        let audit = Viewport::new();
        let ok = audit
            .audit(&artifacts("Viewport", json!("width=device-width")))
            .unwrap();
        assert_eq!(ok.score, Score::Binary(true));
        assert_eq!(ok.display_value.as_deref(), Some("width=device-width"));

        let missing = audit.audit(&artifacts("Viewport", Value::Null)).unwrap();
        assert_eq!(missing.score, Score::Binary(false));

        let bogus = audit
            .audit(&artifacts("Viewport", json!("user-scalable=no")))
            .unwrap();
        assert_eq!(bogus.score, Score::Binary(false));
    }

    #[test]
    fn test_theme_color_blank_fails() {
        let audit = ThemeColorMeta::new();
        let out = audit.audit(&artifacts("ThemeColor", json!("  "))).unwrap();
        assert_eq!(out.score, Score::Binary(false));
        let out = audit
            .audit(&artifacts("ThemeColor", json!("#317EFB")))
            .unwrap();
        assert_eq!(out.display_value.as_deref(), Some("#317EFB"));
    }

    #[test]
    fn test_without_javascript() {
        let audit = WithoutJavaScript::new();
        let out = audit
            .audit(&artifacts("HTMLWithoutJavaScript", json!("Please enable JS")))
            .unwrap();
        assert_eq!(out.score, Score::Binary(true));
        let out = audit
            .audit(&artifacts("HTMLWithoutJavaScript", json!("")))
            .unwrap();
        assert_eq!(out.score, Score::Binary(false));
    }
}
