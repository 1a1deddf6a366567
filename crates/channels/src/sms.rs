//! SMS transport boundary and the Twilio provider.
//!
//! The provider keeps an in-memory message store and provider-id index so
//! Twilio status callbacks can be mapped back onto `OutreachMessage`s.

use crate::segments::calculate_segments;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use outreach_core::config::TwilioConfig;
use outreach_core::{Channel, DeliveryStatus, DeliveryUpdate, OutreachError, OutreachMessage, OutreachResult};
use uuid::Uuid;

/// Twilio rejects bodies longer than this.
pub const MAX_BODY_CHARS: usize = 1600;

/// Capability to hand an SMS to a carrier-facing provider.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(
        &self,
        to_phone: &str,
        message: &str,
        scheduled_time: Option<DateTime<Utc>>,
        callback_url: Option<&str>,
    ) -> OutreachResult<OutreachMessage>;
}

/// Map a Twilio message status onto the provider-agnostic lifecycle.
pub fn map_twilio_status(status: &str) -> Option<DeliveryStatus> {
    match status.to_ascii_lowercase().as_str() {
        "accepted" | "scheduled" | "queued" | "sending" => Some(DeliveryStatus::Queued),
        "sent" => Some(DeliveryStatus::Sent),
        "delivered" => Some(DeliveryStatus::Delivered),
        "read" => Some(DeliveryStatus::Read),
        "undelivered" => Some(DeliveryStatus::Bounced),
        "failed" | "canceled" => Some(DeliveryStatus::Failed),
        _ => None,
    }
}

/// Twilio SMS provider with in-memory message store and delivery tracking.
pub struct TwilioSmsProvider {
    config: TwilioConfig,
    messages: DashMap<Uuid, OutreachMessage>,
    /// Maps provider_id -> message Uuid for webhook lookups.
    provider_index: DashMap<String, Uuid>,
    /// Delivery updates keyed by recipient phone number.
    delivery_events: DashMap<String, Vec<DeliveryUpdate>>,
}

impl TwilioSmsProvider {
    pub fn new(config: TwilioConfig) -> Self {
        tracing::info!(
            account_sid = %config.account_sid,
            from = %config.from_number,
            "Twilio SMS provider initialized"
        );
        Self {
            config,
            messages: DashMap::new(),
            provider_index: DashMap::new(),
            delivery_events: DashMap::new(),
        }
    }

    fn create_message(
        &self,
        to: &str,
        body: &str,
        scheduled_time: Option<DateTime<Utc>>,
        callback_url: Option<&str>,
    ) -> OutreachResult<OutreachMessage> {
        if to.trim().is_empty() {
            return Err(OutreachError::Transport("missing recipient".into()));
        }
        if body.is_empty() {
            return Err(OutreachError::Transport("empty message body".into()));
        }
        let length = body.chars().count();
        if length > MAX_BODY_CHARS {
            return Err(OutreachError::Transport(format!(
                "message body is {length} characters; limit is {MAX_BODY_CHARS}"
            )));
        }

        let provider_id = format!("SM{}", Uuid::new_v4().simple());
        let mut msg = OutreachMessage::new(Channel::Sms, to, body);
        msg.provider_message_id = Some(provider_id.clone());
        msg.segments = calculate_segments(body);
        msg.scheduled_time = scheduled_time;

        let callback = callback_url.or(self.config.status_callback_url.as_deref());
        tracing::info!(
            id = %msg.id,
            to = %to,
            provider_id = %provider_id,
            segments = msg.segments,
            scheduled = scheduled_time.is_some(),
            callback = callback.unwrap_or("-"),
            "SMS message queued"
        );
        metrics::counter!("sms.messages_sent").increment(1);

        self.messages.insert(msg.id, msg.clone());
        self.provider_index.insert(provider_id, msg.id);
        Ok(msg)
    }

    pub fn get_message(&self, id: Uuid) -> Option<OutreachMessage> {
        self.messages.get(&id).map(|m| m.clone())
    }

    /// Handle a Twilio status callback webhook. Looks up the message by
    /// provider id, advances its status and records the update. Returns
    /// `None` for unknown provider ids, unknown statuses, or out-of-order
    /// transitions.
    pub fn handle_status_callback(
        &self,
        provider_id: &str,
        status: &str,
        error_code: Option<&str>,
    ) -> Option<DeliveryUpdate> {
        let message_id = match self.provider_index.get(provider_id) {
            Some(entry) => *entry.value(),
            None => {
                tracing::warn!(provider_id = %provider_id, "Status callback for unknown provider_id");
                return None;
            }
        };

        let Some(new_status) = map_twilio_status(status) else {
            tracing::warn!(status = %status, "Unknown SMS status in callback");
            return None;
        };

        let now = Utc::now();
        let to_number = {
            let mut msg = self.messages.get_mut(&message_id)?;
            if msg.status != new_status && !msg.update_status(new_status, now) {
                return None;
            }
            if let Some(code) = error_code {
                msg.error_message = Some(format!("Twilio error: {code}"));
            }
            msg.to.clone()
        };

        let update = DeliveryUpdate {
            message_id,
            status: new_status,
            timestamp: now,
            error_code: error_code.map(str::to_string),
        };
        self.delivery_events
            .entry(to_number)
            .or_default()
            .push(update.clone());

        tracing::debug!(provider_id = %provider_id, status = %status, "SMS status callback processed");
        metrics::counter!("sms.status_callbacks", "status" => new_status.as_str()).increment(1);

        Some(update)
    }

    /// Up to `limit` most recently created messages.
    pub fn list_messages(&self, limit: usize) -> Vec<OutreachMessage> {
        let mut messages: Vec<OutreachMessage> =
            self.messages.iter().map(|entry| entry.value().clone()).collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit);
        messages
    }

    pub fn get_delivery_events(&self, to: &str) -> Vec<DeliveryUpdate> {
        self.delivery_events
            .get(to)
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }
}

#[async_trait]
impl SmsTransport for TwilioSmsProvider {
    async fn send_sms(
        &self,
        to_phone: &str,
        message: &str,
        scheduled_time: Option<DateTime<Utc>>,
        callback_url: Option<&str>,
    ) -> OutreachResult<OutreachMessage> {
        self.create_message(to_phone, message, scheduled_time, callback_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC_test_sid".to_string(),
            auth_token: "test_auth_token".to_string(),
            from_number: "+15551234567".to_string(),
            messaging_service_sid: None,
            status_callback_url: Some("https://example.com/callback".to_string()),
        }
    }

    async fn send(provider: &TwilioSmsProvider, to: &str, body: &str) -> OutreachMessage {
        provider.send_sms(to, body, None, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_send_and_retrieve() {
        let provider = TwilioSmsProvider::new(test_config());
        let msg = send(&provider, "+15559876543", "Hello! Reply STOP to opt out.").await;

        assert_eq!(msg.to, "+15559876543");
        assert_eq!(msg.status, DeliveryStatus::Queued);
        assert_eq!(msg.segments, 1);
        assert!(msg.provider_message_id.as_deref().unwrap().starts_with("SM"));

        let retrieved = provider.get_message(msg.id).unwrap();
        assert_eq!(retrieved.content, "Hello! Reply STOP to opt out.");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_bodies() {
        let provider = TwilioSmsProvider::new(test_config());
        assert!(matches!(
            provider.send_sms("+15559876543", "", None, None).await,
            Err(OutreachError::Transport(_))
        ));
        let huge = "A".repeat(MAX_BODY_CHARS + 1);
        assert!(provider.send_sms("+15559876543", &huge, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_status_callback_advances_message() {
        let provider = TwilioSmsProvider::new(test_config());
        let msg = send(&provider, "+15559876543", "Test callback").await;
        let provider_id = msg.provider_message_id.clone().unwrap();

        let sent = provider.handle_status_callback(&provider_id, "sent", None).unwrap();
        assert_eq!(sent.status, DeliveryStatus::Sent);
        let delivered = provider
            .handle_status_callback(&provider_id, "delivered", None)
            .unwrap();
        assert_eq!(delivered.message_id, msg.id);

        let retrieved = provider.get_message(msg.id).unwrap();
        assert_eq!(retrieved.status, DeliveryStatus::Delivered);
        assert!(retrieved.delivered_at.is_some());
        assert_eq!(provider.get_delivery_events("+15559876543").len(), 2);
    }

    #[tokio::test]
    async fn test_status_callback_with_error() {
        let provider = TwilioSmsProvider::new(test_config());
        let msg = send(&provider, "+15559876543", "Test failure").await;
        let provider_id = msg.provider_message_id.clone().unwrap();

        let update = provider
            .handle_status_callback(&provider_id, "undelivered", Some("30006"))
            .unwrap();
        assert_eq!(update.status, DeliveryStatus::Bounced);
        assert_eq!(update.error_code.as_deref(), Some("30006"));
        assert_eq!(
            provider.get_message(msg.id).unwrap().error_message.as_deref(),
            Some("Twilio error: 30006")
        );
    }

    #[tokio::test]
    async fn test_out_of_order_callback_ignored() {
        let provider = TwilioSmsProvider::new(test_config());
        let msg = send(&provider, "+15559876543", "Order").await;
        let provider_id = msg.provider_message_id.clone().unwrap();

        provider.handle_status_callback(&provider_id, "delivered", None).unwrap();
        assert!(provider.handle_status_callback(&provider_id, "sent", None).is_none());
        assert_eq!(provider.get_message(msg.id).unwrap().status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_callback_unknown_provider_id() {
        let provider = TwilioSmsProvider::new(test_config());
        assert!(provider
            .handle_status_callback("SM_nonexistent", "delivered", None)
            .is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_twilio_status("Delivered"), Some(DeliveryStatus::Delivered));
        assert_eq!(map_twilio_status("sending"), Some(DeliveryStatus::Queued));
        assert_eq!(map_twilio_status("canceled"), Some(DeliveryStatus::Failed));
        assert_eq!(map_twilio_status("teleported"), None);
    }

    #[tokio::test]
    async fn test_list_messages_limit() {
        let provider = TwilioSmsProvider::new(test_config());
        for to in ["+15551111111", "+15552222222", "+15553333333"] {
            send(&provider, to, "Bulk msg").await;
        }
        assert_eq!(provider.list_messages(2).len(), 2);
    }
}
