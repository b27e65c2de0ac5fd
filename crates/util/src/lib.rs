//! Helpers shared by the advisory widget crates.

pub mod attributes;
pub mod date_handling;
mod path_processing;

pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*bearer\s+)([^\s,;]+)",
        r"(?i)(bearer\s+)([\w\-\.=:/+~]+)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
        r#"(?i)("bearerToken"\s*:\s*")([^"]*)"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("secret pattern must compile"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// ```rust
/// use advisory_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Bearer abc.def"), "Authorization: Bearer <redacted>");
/// assert_eq!(redact_sensitive("ADVISORY_BEARER_TOKEN=xyz other"), "ADVISORY_BEARER_TOKEN=<redacted> other");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}<redacted>")
            })
            .into_owned();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_tokens_in_headers_and_json() {
        let line = r#"authorization: Bearer eyJhbGciOi.abc headers {"bearerToken":"s3cr3t","organizationId":"o"}"#;
        let redacted = redact_sensitive(line);
        assert!(!redacted.contains("eyJhbGciOi"));
        assert!(!redacted.contains("s3cr3t"));
        assert!(redacted.contains(r#""organizationId":"o""#));
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let text = "GET https://api.wxcc-us1.cisco.com/organization/o/cad-variable/v";
        assert_eq!(redact_sensitive(text), text);
    }
}
