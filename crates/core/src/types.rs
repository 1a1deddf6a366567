use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outreach channel a prospect can be contacted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
    Phone,
    Linkedin,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Linkedin => "linkedin",
        }
    }
}

/// Consent lifecycle state, shared by prospects and consent records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Granted,
    Pending,
    Denied,
    Revoked,
    Expired,
    #[default]
    Unknown,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Pending => "pending",
            Self::Denied => "denied",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

/// Interaction that raises a prospect's engagement score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Opened,
    Clicked,
    Replied,
    MeetingBooked,
}

impl Interaction {
    pub fn weight(&self) -> f64 {
        match self {
            Self::Opened => 0.05,
            Self::Clicked => 0.10,
            Self::Replied => 0.20,
            Self::MeetingBooked => 0.30,
        }
    }
}

/// A sales prospect targeted by outreach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub consent: BTreeMap<Channel, ConsentStatus>,
    #[serde(default)]
    pub last_contacted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_response: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement_score: f64,
    /// Recipient's offset from UTC; quiet hours are evaluated in this zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Extra `{placeholder}` values for message personalization.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl Prospect {
    pub fn new(id: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: String::new(),
            email: None,
            phone: None,
            company: None,
            title: None,
            consent: BTreeMap::new(),
            last_contacted: None,
            last_response: None,
            engagement_score: 0.0,
            utc_offset_minutes: None,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn consent_for(&self, channel: Channel) -> ConsentStatus {
        self.consent.get(&channel).copied().unwrap_or_default()
    }

    /// Raise the engagement score for a completed interaction. The score
    /// never decreases and is capped at 1.0.
    pub fn update_engagement(&mut self, interaction: Interaction, at: DateTime<Utc>) {
        let raised = (self.engagement_score + interaction.weight()).min(1.0);
        self.engagement_score = self.engagement_score.max(raised);
        if matches!(interaction, Interaction::Replied | Interaction::MeetingBooked) {
            self.last_response = Some(at);
        }
    }

    /// Local time zone of the prospect, falling back to `default_offset_minutes`.
    pub fn timezone(&self, default_offset_minutes: i32) -> FixedOffset {
        let minutes = self.utc_offset_minutes.unwrap_or(default_offset_minutes);
        FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_is_capped_and_monotonic() {
        let now = Utc::now();
        let mut prospect = Prospect::new("p-1", "Ada");
        prospect.engagement_score = 0.85;

        prospect.update_engagement(Interaction::MeetingBooked, now);
        assert_eq!(prospect.engagement_score, 1.0);
        assert_eq!(prospect.last_response, Some(now));

        prospect.update_engagement(Interaction::Opened, now);
        assert_eq!(prospect.engagement_score, 1.0);
    }

    #[test]
    fn test_open_does_not_stamp_response() {
        let mut prospect = Prospect::new("p-2", "Grace");
        prospect.update_engagement(Interaction::Opened, Utc::now());
        assert!((prospect.engagement_score - 0.05).abs() < f64::EPSILON);
        assert!(prospect.last_response.is_none());
    }

    #[test]
    fn test_consent_defaults_to_unknown() {
        let mut prospect = Prospect::new("p-3", "Alan");
        assert_eq!(prospect.consent_for(Channel::Sms), ConsentStatus::Unknown);
        prospect.consent.insert(Channel::Sms, ConsentStatus::Granted);
        assert_eq!(prospect.consent_for(Channel::Sms), ConsentStatus::Granted);
    }

    #[test]
    fn test_timezone_offset() {
        let mut prospect = Prospect::new("p-4", "Linus");
        assert_eq!(prospect.timezone(0).local_minus_utc(), 0);
        prospect.utc_offset_minutes = Some(-300);
        assert_eq!(prospect.timezone(0).local_minus_utc(), -300 * 60);
    }
}
