//! Outreach messages and their delivery lifecycle.

use crate::types::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery status of an outreach message.
///
/// Successful delivery climbs the engagement ladder
/// `queued → sent → delivered → read → clicked → replied → unsubscribed`.
/// `bounced`, `failed` and `blocked` end the lifecycle before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Clicked,
    Replied,
    Bounced,
    Failed,
    Blocked,
    Unsubscribed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Clicked => "clicked",
            Self::Replied => "replied",
            Self::Bounced => "bounced",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Unsubscribed => "unsubscribed",
        }
    }

    /// Position on the engagement ladder; `None` for terminal failures.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Queued => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Clicked => Some(4),
            Self::Replied => Some(5),
            Self::Unsubscribed => Some(6),
            Self::Bounced | Self::Failed | Self::Blocked => None,
        }
    }

    pub fn is_terminal_failure(&self) -> bool {
        self.rank().is_none()
    }

    /// Whether the message reached the handset.
    pub fn is_delivered(&self) -> bool {
        matches!(self.rank(), Some(rank) if rank >= 2)
    }

    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        match (self.rank(), next.rank()) {
            (None, _) => false,
            (Some(current), Some(target)) => target > current,
            (Some(current), None) => match next {
                Self::Blocked => current == 0,
                _ => current <= 1,
            },
        }
    }
}

/// A single send attempt on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: Uuid,
    pub prospect_id: Option<String>,
    pub campaign_id: Option<String>,
    pub channel: Channel,
    pub to: String,
    pub content: String,
    pub status: DeliveryStatus,
    pub provider_message_id: Option<String>,
    pub segments: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub opened: bool,
    pub clicked: bool,
    pub replied: bool,
    pub unsubscribed: bool,
    pub retry_count: u32,
    pub error_message: Option<String>,
}

impl OutreachMessage {
    pub fn new(channel: Channel, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prospect_id: None,
            campaign_id: None,
            channel,
            to: to.into(),
            content: content.into(),
            status: DeliveryStatus::Queued,
            provider_message_id: None,
            segments: 1,
            created_at: Utc::now(),
            scheduled_time: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            clicked_at: None,
            replied_at: None,
            failed_at: None,
            unsubscribed_at: None,
            opened: false,
            clicked: false,
            replied: false,
            unsubscribed: false,
            retry_count: 0,
            error_message: None,
        }
    }

    /// Move the message to `status`, stamping the matching timestamp and
    /// derived flags. Returns false (and leaves the message untouched) for
    /// transitions that would move backwards or leave a terminal failure.
    pub fn update_status(&mut self, status: DeliveryStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(status) {
            tracing::debug!(
                message_id = %self.id,
                from = self.status.as_str(),
                to = status.as_str(),
                "Ignoring out-of-order status transition"
            );
            return false;
        }

        self.status = status;
        match status {
            DeliveryStatus::Queued => {}
            DeliveryStatus::Sent => self.sent_at = Some(at),
            DeliveryStatus::Delivered => self.delivered_at = Some(at),
            DeliveryStatus::Read => {
                self.read_at = Some(at);
                self.opened = true;
            }
            DeliveryStatus::Clicked => {
                self.clicked_at = Some(at);
                self.opened = true;
                self.clicked = true;
            }
            DeliveryStatus::Replied => {
                self.replied_at = Some(at);
                self.opened = true;
                self.replied = true;
            }
            DeliveryStatus::Unsubscribed => {
                self.unsubscribed_at = Some(at);
                self.unsubscribed = true;
            }
            DeliveryStatus::Bounced | DeliveryStatus::Failed | DeliveryStatus::Blocked => {
                self.failed_at = Some(at);
            }
        }
        true
    }
}

/// Provider-agnostic delivery status update, produced by a transport's
/// webhook handler after mapping the provider's native status string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryUpdate {
    pub message_id: Uuid,
    pub status: DeliveryStatus,
    pub timestamp: DateTime<Utc>,
    pub error_code: Option<String>,
}
