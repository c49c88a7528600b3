//! Logging utilities for aeo-tracker
//!
//! Re-exports tracing macros with log_* naming convention for consistency,
//! plus the redaction helper applied to any provider-supplied text before it
//! is logged or stored.

use once_cell::sync::Lazy;
use regex::Regex;

// Re-export tracing macros with log_* naming
pub use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    trace as log_trace,
    warn as log_warn,
};

static SECRET_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let patterns = [
        // JSON fields: "token": "abc"
        (
            r#"(?i)("(?:password|passwd|token|access_token|refresh_token|authorization|api_key|api-key|key)"\s*:\s*")[^"]*(")"#,
            "${1}***REDACTED***${2}",
        ),
        // Query / form parameters: key=abc&...
        (
            r"(?i)((?:password|passwd|token|access_token|refresh_token|api_key|key)=)[^&\s]+",
            "${1}***REDACTED***",
        ),
        (r"(?i)(Bearer\s+)[A-Za-z0-9\-_.~+/=]+", "${1}***REDACTED***"),
    ];

    patterns
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
});

/// Mask credentials that may appear inside provider error bodies or URLs.
pub fn redact_secrets(text: &str) -> String {
    let mut redacted = text.to_string();
    for (pattern, replacement) in SECRET_PATTERNS.iter() {
        redacted = pattern.replace_all(&redacted, *replacement).into_owned();
    }
    redacted
}
