//! Reserved SMS reply keywords.
//!
//! Keywords are matched as whole words, case-insensitively, so "send" or
//! "weekend" never trip the END opt-out. Opt-out always wins over opt-in
//! when a message carries both.

use serde::{Deserialize, Serialize};

pub const OPT_OUT_KEYWORDS: &[&str] = &[
    "STOP",
    "STOPALL",
    "QUIT",
    "UNSUBSCRIBE",
    "CANCEL",
    "END",
    "OPT-OUT",
    "OPTOUT",
];

pub const OPT_IN_KEYWORDS: &[&str] = &["START", "UNSTOP", "YES", "SUBSCRIBE", "JOIN", "OPT-IN", "OPTIN"];

pub const HELP_KEYWORDS: &[&str] = &["HELP", "INFO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordIntent {
    OptOut,
    OptIn,
    Help,
    None,
}

/// Classify an inbound message body by its reserved keywords.
pub fn classify(body: &str) -> KeywordIntent {
    let upper = body.to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let contains_any = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

    if contains_any(OPT_OUT_KEYWORDS) || upper.contains("OPT OUT") {
        KeywordIntent::OptOut
    } else if contains_any(OPT_IN_KEYWORDS) || upper.contains("OPT IN") {
        KeywordIntent::OptIn
    } else if contains_any(HELP_KEYWORDS) {
        KeywordIntent::Help
    } else {
        KeywordIntent::None
    }
}
