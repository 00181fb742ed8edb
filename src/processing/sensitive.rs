//! Pattern gate that keeps secret-shaped text out of the vector index.
//!
//! The patterns are tuned for credentials people paste into notes by accident: provider API
//! keys, bearer tokens, JWTs, PEM private keys, and `password = ...` style assignments.
//! Matching is best-effort; false positives and negatives are accepted.

use regex::Regex;
use std::sync::LazyLock;

struct SecretPattern {
    name: &'static str,
    regex: Regex,
}

const PATTERN_SOURCES: &[(&str, &str)] = &[
    ("openai_api_key", r"\bsk-(?:proj-|ant-)?[A-Za-z0-9_-]{20,}"),
    ("aws_access_key_id", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
    ("github_token", r"\b(?:gh[pousr]_[A-Za-z0-9]{36,}|github_pat_[A-Za-z0-9_]{22,})"),
    ("slack_token", r"\bxox[abprs]-[A-Za-z0-9-]{10,}"),
    ("google_api_key", r"\bAIza[0-9A-Za-z_-]{35}"),
    ("stripe_secret_key", r"\b[rs]k_live_[0-9A-Za-z]{16,}"),
    ("bearer_token", r"(?i)\bbearer\s+[A-Za-z0-9._~+/-]{20,}=*"),
    (
        "json_web_token",
        r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
    ),
    ("private_key_block", r"-----BEGIN (?:[A-Z]+ )?PRIVATE KEY-----"),
    (
        "credential_assignment",
        r#"(?i)\b(?:password|passwd|pwd|secret|api[_-]?key|access[_-]?token|auth[_-]?token|client[_-]?secret)\s*[:=]\s*["']?[^\s"']{6,}"#,
    ),
];

static PATTERNS: LazyLock<Vec<SecretPattern>> = LazyLock::new(|| {
    PATTERN_SOURCES
        .iter()
        .map(|(name, source)| SecretPattern {
            name,
            regex: Regex::new(source).expect("secret patterns are valid regexes"),
        })
        .collect()
});

/// Report whether `text` contains anything shaped like a secret.
pub fn is_sensitive(text: &str) -> bool {
    matched_pattern(text).is_some()
}

/// Name of the first secret pattern found in `text`, for logging.
///
/// Only the pattern name is returned so callers never log the matched secret.
pub fn matched_pattern(text: &str) -> Option<&'static str> {
    PATTERNS
        .iter()
        .find(|pattern| pattern.regex.is_match(text))
        .map(|pattern| pattern.name)
}
