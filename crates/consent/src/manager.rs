//! Consent manager: authoritative source of whether a phone number may
//! currently receive SMS. Records grants with expiry, revocations, and an
//! append-only audit trail per number, and turns inbound STOP/START
//! replies into consent transitions.

use crate::dnc::{DncRegistry, NoDncRegistry};
use crate::keywords::{self, KeywordIntent};
use crate::phone::normalize_phone;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use outreach_core::clock::{system_clock, Clock};
use outreach_core::config::ConsentConfig;
use outreach_core::event_bus::{make_event, noop_sink, EventSink, OutreachEventType};
use outreach_core::{ConsentStatus, OutreachResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const OPT_OUT_RESPONSE: &str =
    "You have been unsubscribed and will receive no further messages. Reply START to resubscribe.";
pub const OPT_IN_CONFIRMATION_REQUEST: &str =
    "Reply YES to confirm you want to receive text messages from us. Msg & data rates may apply. Reply STOP to opt out.";
pub const HELP_RESPONSE: &str =
    "Reply STOP to unsubscribe or START to resubscribe. Msg & data rates may apply.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentAction {
    Granted,
    Revoked,
}

/// One entry of a record's append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentAuditEntry {
    pub action: ConsentAction,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub source: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub phone_number: String,
    pub prospect_id: Option<String>,
    pub status: ConsentStatus,
    pub consent_method: String,
    pub consent_source: String,
    pub opt_in_message: Option<String>,
    pub consent_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_method: Option<String>,
    pub audit_trail: Vec<ConsentAuditEntry>,
}

impl ConsentRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Status as of `now`: a grant past its expiry reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ConsentStatus {
        if self.status == ConsentStatus::Granted && self.is_expired(now) {
            ConsentStatus::Expired
        } else {
            self.status
        }
    }
}

/// Outcome of a consent verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentVerification {
    pub granted: bool,
    pub reason: String,
}

impl ConsentVerification {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundAction {
    OptOut,
    OptInRequested,
    Help,
    NoAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundResponse {
    pub phone_number: String,
    pub action: InboundAction,
    pub auto_response: Option<String>,
    pub consent_revoked: bool,
    pub processed_at: DateTime<Utc>,
}

/// Read-only projection of a number's consent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentStatusView {
    pub phone_number: String,
    pub status: ConsentStatus,
    pub has_consent: bool,
    pub consent_method: Option<String>,
    pub consent_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub audit_entries: usize,
}

pub struct ConsentManager {
    config: ConsentConfig,
    /// Keyed by normalized phone number; one record per number.
    records: DashMap<String, ConsentRecord>,
    dnc: Arc<dyn DncRegistry>,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn EventSink>,
}

impl ConsentManager {
    pub fn new(config: ConsentConfig) -> Self {
        info!(expiry_days = config.expiry_days, "Consent manager initialized");
        Self {
            config,
            records: DashMap::new(),
            dnc: Arc::new(NoDncRegistry),
            clock: system_clock(),
            event_sink: noop_sink(),
        }
    }

    pub fn with_dnc_registry(mut self, dnc: Arc<dyn DncRegistry>) -> Self {
        self.dnc = dnc;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Check whether `phone` may receive SMS right now. Fails closed: an
    /// unparseable number, a missing record, a non-granted or expired
    /// consent, or a DNC listing all deny.
    pub fn verify_consent(&self, phone: &str, prospect_id: Option<&str>) -> ConsentVerification {
        let normalized = match normalize_phone(phone) {
            Ok(p) => p,
            Err(e) => return ConsentVerification::denied(e.to_string()),
        };
        let now = self.clock.now();

        let verification = match self.records.get(&normalized) {
            None => ConsentVerification::denied("No consent record found"),
            Some(record) if record.status != ConsentStatus::Granted => {
                ConsentVerification::denied(format!("Consent status: {}", record.status.as_str()))
            }
            Some(record) if record.is_expired(now) => ConsentVerification::denied(format!(
                "Consent expired on {}",
                record.expiry_date.format("%Y-%m-%d")
            )),
            Some(_) if self.dnc.is_listed(&normalized) => {
                ConsentVerification::denied("Number is on the Do Not Call registry")
            }
            Some(_) => ConsentVerification {
                granted: true,
                reason: "Consent verified".to_string(),
            },
        };

        debug!(
            phone = %normalized,
            prospect_id = prospect_id.unwrap_or("-"),
            granted = verification.granted,
            reason = %verification.reason,
            "Consent verified"
        );
        verification
    }

    /// Record a granted consent. A second grant for the same number
    /// replaces the record's state; earlier audit entries are carried over.
    pub fn record_consent(
        &self,
        phone: &str,
        prospect_id: Option<&str>,
        method: &str,
        opt_in_message: Option<&str>,
        source: &str,
    ) -> OutreachResult<ConsentRecord> {
        let normalized = normalize_phone(phone)?;
        let now = self.clock.now();

        let mut audit_trail = self
            .records
            .get(&normalized)
            .map(|r| r.audit_trail.clone())
            .unwrap_or_default();
        audit_trail.push(ConsentAuditEntry {
            action: ConsentAction::Granted,
            timestamp: now,
            method: method.to_string(),
            source: Some(source.to_string()),
            message: opt_in_message.map(str::to_string),
        });

        let record = ConsentRecord {
            phone_number: normalized.clone(),
            prospect_id: prospect_id.map(str::to_string),
            status: ConsentStatus::Granted,
            consent_method: method.to_string(),
            consent_source: source.to_string(),
            opt_in_message: opt_in_message.map(str::to_string),
            consent_date: now,
            expiry_date: now + Duration::days(self.config.expiry_days),
            revoked_at: None,
            revocation_method: None,
            audit_trail,
        };
        self.records.insert(normalized.clone(), record.clone());

        info!(phone = %normalized, method, source, "SMS consent recorded");
        metrics::counter!("consent.granted").increment(1);
        self.event_sink.emit(make_event(
            OutreachEventType::ConsentGranted,
            Some(normalized),
            prospect_id.map(str::to_string),
            None,
            serde_json::json!({ "method": method, "source": source }),
        ));

        Ok(record)
    }

    /// Revoke consent for `phone`. A number without a record is already
    /// opted out, so this still returns `Ok(true)`.
    pub fn revoke_consent(
        &self,
        phone: &str,
        method: &str,
        message: Option<&str>,
    ) -> OutreachResult<bool> {
        let normalized = normalize_phone(phone)?;
        let now = self.clock.now();

        match self.records.get_mut(&normalized) {
            Some(mut record) => {
                record.status = ConsentStatus::Revoked;
                record.revoked_at = Some(now);
                record.revocation_method = Some(method.to_string());
                record.audit_trail.push(ConsentAuditEntry {
                    action: ConsentAction::Revoked,
                    timestamp: now,
                    method: method.to_string(),
                    source: None,
                    message: message.map(str::to_string),
                });
            }
            None => {
                debug!(phone = %normalized, "Revocation for number without consent record");
                return Ok(true);
            }
        }

        info!(phone = %normalized, method, "SMS consent revoked");
        metrics::counter!("consent.revoked").increment(1);
        self.event_sink.emit(make_event(
            OutreachEventType::ConsentRevoked,
            Some(normalized),
            None,
            None,
            serde_json::json!({ "method": method }),
        ));
        Ok(true)
    }

    /// Handle an inbound SMS reply. Opt-out keywords revoke consent;
    /// opt-in keywords only trigger a double opt-in confirmation request,
    /// consent is never granted from an inbound message alone.
    pub fn process_inbound_message(&self, phone: &str, body: &str) -> OutreachResult<InboundResponse> {
        let normalized = normalize_phone(phone)?;
        let intent = keywords::classify(body);
        metrics::counter!("consent.inbound").increment(1);

        let (action, auto_response, consent_revoked) = match intent {
            KeywordIntent::OptOut => {
                let revoked = self.revoke_consent(&normalized, "sms_keyword", Some(body))?;
                (InboundAction::OptOut, Some(OPT_OUT_RESPONSE), revoked)
            }
            KeywordIntent::OptIn => {
                self.event_sink.emit(make_event(
                    OutreachEventType::OptInRequested,
                    Some(normalized.clone()),
                    None,
                    None,
                    serde_json::json!({ "message": body }),
                ));
                (
                    InboundAction::OptInRequested,
                    Some(OPT_IN_CONFIRMATION_REQUEST),
                    false,
                )
            }
            KeywordIntent::Help => (InboundAction::Help, Some(HELP_RESPONSE), false),
            KeywordIntent::None => (InboundAction::NoAction, None, false),
        };

        info!(phone = %normalized, action = ?action, "Inbound SMS processed");

        Ok(InboundResponse {
            phone_number: normalized,
            action,
            auto_response: auto_response.map(str::to_string),
            consent_revoked,
            processed_at: self.clock.now(),
        })
    }

    pub fn get_consent_status(&self, phone: &str) -> OutreachResult<ConsentStatusView> {
        let normalized = normalize_phone(phone)?;
        let now = self.clock.now();

        let view = match self.records.get(&normalized) {
            Some(record) => {
                let status = record.effective_status(now);
                ConsentStatusView {
                    phone_number: normalized,
                    status,
                    has_consent: status == ConsentStatus::Granted,
                    consent_method: Some(record.consent_method.clone()),
                    consent_date: Some(record.consent_date),
                    expiry_date: Some(record.expiry_date),
                    revoked_at: record.revoked_at,
                    audit_entries: record.audit_trail.len(),
                }
            }
            None => ConsentStatusView {
                phone_number: normalized,
                status: ConsentStatus::Unknown,
                has_consent: false,
                consent_method: None,
                consent_date: None,
                expiry_date: None,
                revoked_at: None,
                audit_entries: 0,
            },
        };
        Ok(view)
    }

    /// Full record including the audit trail.
    pub fn get_record(&self, phone: &str) -> OutreachResult<Option<ConsentRecord>> {
        let normalized = normalize_phone(phone)?;
        Ok(self.records.get(&normalized).map(|r| r.clone()))
    }

    /// Drop grants that expired more than `retention_days` ago. Revoked
    /// records are kept as proof of opt-out. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let cutoff = self.clock.now() - Duration::days(self.config.retention_days);
        let before = self.records.len();
        self.records.retain(|_, record| {
            !(record.status == ConsentStatus::Granted && record.expiry_date < cutoff)
        });
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            warn!(purged, "Purged expired consent records");
        }
        purged
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}
