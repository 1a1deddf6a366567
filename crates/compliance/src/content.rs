//! Message content review. Findings here are warnings: they lower the
//! compliance score but never block a send.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static OPT_OUT_INSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(stop|unsubscribe|opt[- ]?out)\b").expect("Invalid opt-out pattern")
});

static MANIPULATIVE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("100% guaranteed", r"(?i)100%\s*guaranteed"),
        ("act now", r"(?i)\bact\s+now\b"),
        ("urgent offer", r"(?i)\burgent\b.*\boffer\b"),
        ("limited time", r"(?i)\blimited\b.*\btime\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("Invalid content pattern")))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentWarningKind {
    MissingOptOut,
    MessageLength,
    ProhibitedContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentWarning {
    pub kind: ContentWarningKind,
    pub description: String,
}

pub fn check_content(message: &str, max_length: usize) -> Vec<ContentWarning> {
    let mut warnings = Vec::new();

    if !OPT_OUT_INSTRUCTION.is_match(message) {
        warnings.push(ContentWarning {
            kind: ContentWarningKind::MissingOptOut,
            description: "Message does not include opt-out instructions (e.g. \"Reply STOP to unsubscribe\")"
                .to_string(),
        });
    }

    let length = message.chars().count();
    if length > max_length {
        warnings.push(ContentWarning {
            kind: ContentWarningKind::MessageLength,
            description: format!(
                "Message is {length} characters; over {max_length} it is split into multiple segments"
            ),
        });
    }

    for (label, pattern) in MANIPULATIVE_PATTERNS.iter() {
        if pattern.is_match(message) {
            warnings.push(ContentWarning {
                kind: ContentWarningKind::ProhibitedContent,
                description: format!("Message contains high-pressure phrasing: \"{label}\""),
            });
        }
    }

    warnings
}
