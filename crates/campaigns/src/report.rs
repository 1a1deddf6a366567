//! Campaign launch and performance reports.

use chrono::{DateTime, Utc};
use outreach_compliance::ContentWarning;
use outreach_core::ComplianceViolation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a prospect did not receive the campaign message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    /// One or more TCPA rules failed.
    PolicyViolation {
        violations: Vec<ComplianceViolation>,
        compliance_score: f64,
        suggested_send_time: DateTime<Utc>,
    },
    /// The prospect's phone number is missing or unparseable.
    InvalidPhone { error: String },
    /// The transport rejected the send, errored, or timed out.
    TransportFailed { error: String },
    CampaignPaused,
}

impl BlockReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PolicyViolation { .. } => "policy_violation",
            Self::InvalidPhone { .. } => "invalid_phone",
            Self::TransportFailed { .. } => "transport_failed",
            Self::CampaignPaused => "campaign_paused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub prospect_id: String,
    pub phone_number: String,
    pub message_id: Uuid,
    pub provider_message_id: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub compliance_score: f64,
    pub warnings: Vec<ContentWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedMessage {
    pub prospect_id: String,
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub reason: BlockReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLaunchReport {
    pub campaign_id: String,
    pub prospects_targeted: usize,
    pub messages_queued: usize,
    pub messages_blocked: usize,
    /// Total policy violations across all blocked prospects.
    pub compliance_violations: usize,
    pub scheduled_messages: Vec<ScheduledMessage>,
    pub blocked_messages: Vec<BlockedMessage>,
    pub launched_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignPerformance {
    pub campaign_id: String,
    pub launches: usize,
    pub prospects_targeted: usize,
    pub messages_queued: usize,
    pub messages_blocked: usize,
    /// Share of targeted prospects that passed compliance and were queued.
    pub compliance_rate: f64,
    pub messages_delivered: usize,
    pub messages_replied: usize,
    pub messages_unsubscribed: usize,
    /// Delivered (or further along) over queued.
    pub delivery_rate: f64,
    /// Replied over delivered.
    pub response_rate: f64,
    pub paused_at: Option<DateTime<Utc>>,
}

pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
