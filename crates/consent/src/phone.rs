//! Phone number normalization to an E.164-like key.

use outreach_core::{OutreachError, OutreachResult};

const MIN_DIGITS: usize = 10;
const MAX_DIGITS: usize = 15;

/// Normalize a phone number to the key used by the consent store.
///
/// Formatting characters (spaces, dashes, dots, parentheses, a leading
/// `+`) are stripped. Ten-digit numbers are treated as US numbers and get
/// `+1`; eleven digits starting with `1` get `+`. Any other length in the
/// E.164 range is prefixed with `+` as-is: international numbers are not
/// validated beyond their digit count.
pub fn normalize_phone(phone: &str) -> OutreachResult<String> {
    let trimmed = phone.trim();
    if trimmed.chars().any(|c| c.is_alphabetic()) {
        return Err(OutreachError::InvalidPhoneNumber(phone.to_string()));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Ok(format!("+1{digits}")),
        11 if digits.starts_with('1') => Ok(format!("+{digits}")),
        n if (MIN_DIGITS..=MAX_DIGITS).contains(&n) => Ok(format!("+{digits}")),
        _ => Err(OutreachError::InvalidPhoneNumber(phone.to_string())),
    }
}
