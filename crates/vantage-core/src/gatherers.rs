//! Builtin gatherer descriptors.
//!
//! Only identity lives here. How a gatherer extracts its signal from the
//! live session is the driver's business.

use crate::registry::GathererSpec;

/// `(config reference, descriptor)` for every builtin gatherer.
pub fn builtin() -> Vec<(&'static str, GathererSpec)> {
    vec![
        ("url", GathererSpec::new("URL", "Final URL after redirects")),
        (
            "https",
            GathererSpec::new("HTTPS", "Whether the page was served over HTTPS"),
        ),
        (
            "http-redirect",
            GathererSpec::new(
                "HTTPRedirect",
                "Whether the plain-HTTP origin redirects to HTTPS",
            ),
        ),
        (
            "service-worker",
            GathererSpec::new("ServiceWorker", "Service worker registration for the page"),
        ),
        (
            "viewport",
            GathererSpec::new("Viewport", "Content of the viewport meta tag"),
        ),
        (
            "theme-color",
            GathererSpec::new("ThemeColor", "Content of the theme-color meta tag"),
        ),
        (
            "html-without-javascript",
            GathererSpec::new(
                "HTMLWithoutJavaScript",
                "Body text rendered with scripting disabled",
            ),
        ),
        (
            "screen-timings",
            GathererSpec::new("Timings", "Paint timings extracted from the trace"),
        ),
        (
            "accessibility",
            GathererSpec::new("Accessibility", "Accessibility rule violations"),
        ),
    ]
}
