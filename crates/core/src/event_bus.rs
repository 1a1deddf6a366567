//! Outreach event bus: trait for emitting domain events from any component.
//!
//! Components accept an `Arc<dyn EventSink>` to publish consent changes,
//! compliance outcomes and send results to downstream consumers (CRM sync,
//! analytics, operator alerts).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutreachEventType {
    ConsentGranted,
    ConsentRevoked,
    OptInRequested,
    ComplianceChecked,
    MessageQueued,
    MessageBlocked,
    CampaignPaused,
    DeliveryUpdated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachEvent {
    pub event_id: Uuid,
    pub event_type: OutreachEventType,
    pub phone_number: Option<String>,
    pub prospect_id: Option<String>,
    pub campaign_id: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: OutreachEvent);
}

/// No-op sink for tests and components that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: OutreachEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<OutreachEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<OutreachEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn count_type(&self, event_type: OutreachEventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: OutreachEvent) {
        self.events.lock().push(event);
    }
}

/// Convenience builder for creating an `OutreachEvent` with minimal boilerplate.
pub fn make_event(
    event_type: OutreachEventType,
    phone_number: Option<String>,
    prospect_id: Option<String>,
    campaign_id: Option<String>,
    details: serde_json::Value,
) -> OutreachEvent {
    OutreachEvent {
        event_id: Uuid::new_v4(),
        event_type,
        phone_number,
        prospect_id,
        campaign_id,
        details,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
