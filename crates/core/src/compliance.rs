//! Compliance audit records produced by every outreach validation.

use crate::types::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    RequiresReview,
    Approved,
    Blocked,
}

/// Rule a prospective send failed. Every variant blocks the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    ConsentViolation,
    QuietHoursViolation,
    WeekendViolation,
    FrequencyViolation,
    DailyLimitViolation,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsentViolation => "consent_violation",
            Self::QuietHoursViolation => "quiet_hours_violation",
            Self::WeekendViolation => "weekend_violation",
            Self::FrequencyViolation => "frequency_violation",
            Self::DailyLimitViolation => "daily_limit_violation",
        }
    }

    pub fn is_timing(&self) -> bool {
        matches!(self, Self::QuietHoursViolation | Self::WeekendViolation)
    }

    pub fn is_frequency(&self) -> bool {
        matches!(self, Self::FrequencyViolation | Self::DailyLimitViolation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub violation_type: ViolationType,
    pub description: String,
}

/// Audit record of one compliance validation.
///
/// Violations can only be added through [`ComplianceRecord::add_violation`]
/// and resolution only set through [`ComplianceRecord::resolve_violation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub id: Uuid,
    pub prospect_id: String,
    pub phone_number: Option<String>,
    pub channel: Channel,
    pub compliance_score: f64,
    pub created_at: DateTime<Utc>,
    status: ComplianceStatus,
    violations: Vec<ComplianceViolation>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    resolution_notes: Option<String>,
}

impl ComplianceRecord {
    pub fn new(
        prospect_id: impl Into<String>,
        phone_number: Option<String>,
        channel: Channel,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prospect_id: prospect_id.into(),
            phone_number,
            channel,
            compliance_score: 1.0,
            created_at,
            status: ComplianceStatus::Compliant,
            violations: Vec::new(),
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
        }
    }

    pub fn add_violation(&mut self, violation_type: ViolationType, description: impl Into<String>) {
        self.violations.push(ComplianceViolation {
            violation_type,
            description: description.into(),
        });
        self.status = ComplianceStatus::NonCompliant;
    }

    /// Mark the record's violations as reviewed. Returns false if the
    /// record has nothing to resolve or was already resolved.
    pub fn resolve_violation(
        &mut self,
        resolved_by: impl Into<String>,
        notes: impl Into<String>,
        at: DateTime<Utc>,
    ) -> bool {
        if self.violations.is_empty() || self.resolved_at.is_some() {
            return false;
        }
        self.resolved_at = Some(at);
        self.resolved_by = Some(resolved_by.into());
        self.resolution_notes = Some(notes.into());
        self.status = ComplianceStatus::Approved;
        true
    }

    pub fn status(&self) -> ComplianceStatus {
        self.status
    }

    pub fn violations(&self) -> &[ComplianceViolation] {
        &self.violations
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn resolved_by(&self) -> Option<&str> {
        self.resolved_by.as_deref()
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ComplianceRecord {
        ComplianceRecord::new("p-1", Some("+15551234567".into()), Channel::Sms, Utc::now())
    }

    #[test]
    fn test_add_violation_marks_non_compliant() {
        let mut rec = record();
        assert_eq!(rec.status(), ComplianceStatus::Compliant);
        rec.add_violation(ViolationType::ConsentViolation, "No consent record found");
        assert_eq!(rec.status(), ComplianceStatus::NonCompliant);
        assert_eq!(rec.violations().len(), 1);
        assert_eq!(
            rec.violations()[0].violation_type.as_str(),
            "consent_violation"
        );
    }

    #[test]
    fn test_resolve_violation_once() {
        let mut rec = record();
        assert!(!rec.resolve_violation("ops", "nothing to do", Utc::now()));

        rec.add_violation(ViolationType::QuietHoursViolation, "22:00 local");
        assert!(rec.resolve_violation("ops@example.com", "rescheduled", Utc::now()));
        assert_eq!(rec.status(), ComplianceStatus::Approved);
        assert_eq!(rec.resolved_by(), Some("ops@example.com"));
        assert!(!rec.resolve_violation("someone-else", "again", Utc::now()));
    }

    #[test]
    fn test_violation_type_serializes_snake_case() {
        let json = serde_json::to_string(&ViolationType::QuietHoursViolation).unwrap();
        assert_eq!(json, "\"quiet_hours_violation\"");
    }
}
