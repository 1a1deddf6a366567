//! TCPA compliance engine: validates a prospective SMS against consent,
//! timing, frequency and content rules and scores the result.
//!
//! Score starts at 1.0 and loses 0.5 for a consent failure, 0.3 for a
//! timing failure, 0.2 for a frequency failure and 0.1 if the content
//! review raised any warning; it is clamped to [0, 1]. Only consent,
//! timing and frequency failures block the send.

use crate::audit::{AuditLogStats, ComplianceLog};
use crate::content::{check_content, ContentWarning};
use crate::frequency::{check_frequency, SendLedger};
use crate::report::{build_report, ComplianceReport};
use crate::timing::{check_timing, next_allowed_time};
use chrono::{DateTime, Utc};
use outreach_consent::{normalize_phone, ConsentManager};
use outreach_core::clock::{system_clock, Clock};
use outreach_core::config::{AuditConfig, TcpaComplianceConfig};
use outreach_core::event_bus::{make_event, noop_sink, EventSink, OutreachEventType};
use outreach_core::{
    Channel, ComplianceRecord, ComplianceViolation, OutreachError, OutreachResult, Prospect,
    ViolationType,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const CONSENT_PENALTY: f64 = 0.5;
const TIMING_PENALTY: f64 = 0.3;
const FREQUENCY_PENALTY: f64 = 0.2;
const CONTENT_PENALTY: f64 = 0.1;

/// Result of validating one prospective send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub record_id: Uuid,
    pub prospect_id: String,
    pub phone_number: Option<String>,
    pub compliant: bool,
    pub compliance_score: f64,
    pub violations: Vec<ComplianceViolation>,
    pub warnings: Vec<ContentWarning>,
    pub scheduled_time: DateTime<Utc>,
    /// The scheduled time when timing passes, otherwise the earliest
    /// permitted alternative.
    pub approved_send_time: DateTime<Utc>,
}

impl ComplianceCheck {
    pub fn has_violation(&self, violation_type: ViolationType) -> bool {
        self.violations
            .iter()
            .any(|v| v.violation_type == violation_type)
    }
}

pub struct TcpaComplianceEngine {
    config: TcpaComplianceConfig,
    consent: Arc<ConsentManager>,
    log: ComplianceLog,
    ledger: SendLedger,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn EventSink>,
}

impl TcpaComplianceEngine {
    pub fn new(
        config: TcpaComplianceConfig,
        audit: &AuditConfig,
        consent: Arc<ConsentManager>,
    ) -> Self {
        info!(
            quiet_hours_start = config.quiet_hours_start,
            quiet_hours_end = config.quiet_hours_end,
            max_daily_messages = config.max_daily_messages,
            business_only_days = config.business_only_days,
            audit_capacity = audit.max_compliance_records,
            "TCPA compliance engine initialized"
        );
        Self {
            config,
            consent,
            log: ComplianceLog::new(audit.max_compliance_records),
            ledger: SendLedger::new(),
            clock: system_clock(),
            event_sink: noop_sink(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn consent_manager(&self) -> &Arc<ConsentManager> {
        &self.consent
    }

    pub fn config(&self) -> &TcpaComplianceConfig {
        &self.config
    }

    /// Validate an SMS to `prospect`. `scheduled_time` defaults to now.
    /// Never fails: every problem is reported as a violation or warning,
    /// and every call leaves one record in the audit log.
    pub fn validate_sms_outreach(
        &self,
        prospect: &Prospect,
        message: &str,
        scheduled_time: Option<DateTime<Utc>>,
    ) -> ComplianceCheck {
        let now = self.clock.now();
        let scheduled = scheduled_time.unwrap_or(now);
        let normalized = prospect
            .phone
            .as_deref()
            .and_then(|p| normalize_phone(p).ok());

        let mut violations = Vec::new();
        let mut score = 1.0_f64;

        // Consent
        let consent_failure = match prospect.phone.as_deref() {
            None => Some("Prospect has no phone number".to_string()),
            Some(phone) => {
                let verification = self.consent.verify_consent(phone, Some(&prospect.id));
                (!verification.granted).then_some(verification.reason)
            }
        };
        if let Some(reason) = consent_failure {
            violations.push(ComplianceViolation {
                violation_type: ViolationType::ConsentViolation,
                description: reason,
            });
            score -= CONSENT_PENALTY;
        }

        // Timing
        let tz = prospect.timezone(self.config.default_utc_offset_minutes);
        let approved_send_time = match check_timing(scheduled, tz, &self.config) {
            Some(violation) => {
                violations.push(violation);
                score -= TIMING_PENALTY;
                next_allowed_time(scheduled, tz, &self.config)
            }
            None => scheduled,
        };

        // Frequency
        let daily_count = normalized
            .as_deref()
            .map(|p| self.ledger.count_in_window(p, scheduled))
            .unwrap_or(0);
        if let Some(violation) =
            check_frequency(prospect.last_contacted, daily_count, scheduled, &self.config)
        {
            violations.push(violation);
            score -= FREQUENCY_PENALTY;
        }

        // Content
        let warnings = check_content(message, self.config.max_message_length);
        if !warnings.is_empty() {
            score -= CONTENT_PENALTY;
        }

        let score = score.clamp(0.0, 1.0);
        let compliant = violations.is_empty();

        let mut record = ComplianceRecord::new(prospect.id.clone(), normalized.clone(), Channel::Sms, now);
        record.compliance_score = score;
        for violation in &violations {
            record.add_violation(violation.violation_type, violation.description.clone());
        }
        let record_id = record.id;
        self.log.append(record);

        metrics::counter!(
            "compliance.checks",
            "result" => if compliant { "compliant" } else { "non_compliant" }
        )
        .increment(1);
        debug!(
            prospect_id = %prospect.id,
            compliant,
            score,
            violations = violations.len(),
            warnings = warnings.len(),
            "SMS compliance validated"
        );
        self.event_sink.emit(make_event(
            OutreachEventType::ComplianceChecked,
            normalized.clone(),
            Some(prospect.id.clone()),
            None,
            serde_json::json!({
                "compliant": compliant,
                "compliance_score": score,
                "violations": violations.iter().map(|v| v.violation_type.as_str()).collect::<Vec<_>>(),
            }),
        ));

        ComplianceCheck {
            record_id,
            prospect_id: prospect.id.clone(),
            phone_number: normalized,
            compliant,
            compliance_score: score,
            violations,
            warnings,
            scheduled_time: scheduled,
            approved_send_time,
        }
    }

    /// Count a completed send against the number's daily cap.
    pub fn record_send(&self, phone: &str, at: DateTime<Utc>) -> OutreachResult<()> {
        let normalized = normalize_phone(phone)?;
        self.ledger.record(&normalized, at);
        Ok(())
    }

    pub fn generate_compliance_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ComplianceReport {
        let records = self.log.in_range(start, end);
        let report = build_report(&records, start, end);
        info!(
            checks = report.summary_statistics.total_compliance_checks,
            compliance_rate = report.summary_statistics.compliance_rate,
            "Compliance report generated"
        );
        report
    }

    /// Mark a record's violations as reviewed.
    pub fn resolve_violation(
        &self,
        record_id: Uuid,
        resolved_by: &str,
        notes: &str,
    ) -> OutreachResult<bool> {
        let now = self.clock.now();
        let resolved = self
            .log
            .update(record_id, |record| record.resolve_violation(resolved_by, notes, now))
            .ok_or_else(|| OutreachError::RecordNotFound(record_id.to_string()))?;
        if resolved {
            info!(record_id = %record_id, resolved_by, "Compliance violation resolved");
        }
        Ok(resolved)
    }

    pub fn get_record(&self, record_id: Uuid) -> Option<ComplianceRecord> {
        self.log.get(record_id)
    }

    pub fn recent_records(&self, limit: usize) -> Vec<ComplianceRecord> {
        self.log.recent(limit)
    }

    pub fn audit_stats(&self) -> AuditLogStats {
        self.log.stats()
    }
}
