//! Template personalization for SMS outreach.

use outreach_core::Prospect;

pub const OPT_OUT_SUFFIX: &str = "Reply STOP to unsubscribe";

/// Substitute `{placeholder}`s with prospect fields and custom fields, then
/// append the opt-out instruction if the result never mentions "stop".
///
/// Known fields without a value are replaced with an empty string;
/// placeholders that match nothing are left as written.
pub fn personalize(template: &str, prospect: &Prospect) -> String {
    let full_name = prospect.full_name();
    let builtin: [(&str, &str); 7] = [
        ("first_name", prospect.first_name.as_str()),
        ("last_name", prospect.last_name.as_str()),
        ("full_name", full_name.as_str()),
        ("company", prospect.company.as_deref().unwrap_or_default()),
        ("title", prospect.title.as_deref().unwrap_or_default()),
        ("email", prospect.email.as_deref().unwrap_or_default()),
        ("phone", prospect.phone.as_deref().unwrap_or_default()),
    ];

    let mut message = template.to_string();
    for (key, value) in builtin {
        message = message.replace(&format!("{{{key}}}"), value);
    }
    for (key, value) in &prospect.custom_fields {
        message = message.replace(&format!("{{{key}}}"), value);
    }

    if !message.to_lowercase().contains("stop") {
        message = format!("{} {}", message.trim_end(), OPT_OUT_SUFFIX);
    }
    message
}
