//! Builtin audit catalog.
//!
//! Each audit reads only the artifacts it declares. Scores are either
//! binary or numeric in `[0, 1]`.

pub mod accessibility;
pub mod performance;
pub mod pwa;

use std::sync::Arc;

use crate::audit::Audit;

pub use accessibility::ColorContrast;
pub use performance::FirstMeaningfulPaint;
pub use pwa::{IsOnHttps, RedirectsHttp, ServiceWorker, ThemeColorMeta, Viewport, WithoutJavaScript};

pub const PWA_GROUP: &str = "pwa";
pub const PERFORMANCE_GROUP: &str = "performance";
pub const ACCESSIBILITY_GROUP: &str = "accessibility";

/// Every builtin audit.
pub fn builtin() -> Vec<Arc<dyn Audit>> {
    vec![
        Arc::new(IsOnHttps::new()),
        Arc::new(RedirectsHttp::new()),
        Arc::new(ServiceWorker::new()),
        Arc::new(Viewport::new()),
        Arc::new(ThemeColorMeta::new()),
        Arc::new(WithoutJavaScript::new()),
        Arc::new(FirstMeaningfulPaint::new()),
        Arc::new(ColorContrast::new()),
    ]
}

const PWA_AUDITS: &[&str] = &[
    pwa::SERVICE_WORKER,
    pwa::IS_ON_HTTPS,
    pwa::REDIRECTS_HTTP,
    pwa::VIEWPORT,
    pwa::THEME_COLOR_META,
    pwa::WITHOUT_JAVASCRIPT,
];
const PERFORMANCE_AUDITS: &[&str] = &[performance::FIRST_MEANINGFUL_PAINT];
const ACCESSIBILITY_AUDITS: &[&str] = &[accessibility::COLOR_CONTRAST];

/// Builtin audit groups.
pub fn builtin_groups() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        (PWA_GROUP, PWA_AUDITS),
        (PERFORMANCE_GROUP, PERFORMANCE_AUDITS),
        (ACCESSIBILITY_GROUP, ACCESSIBILITY_AUDITS),
    ]
}
