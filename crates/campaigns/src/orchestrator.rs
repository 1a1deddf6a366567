//! SMS campaign orchestrator: drives a prospect list through
//! personalization, TCPA validation and send-or-block, one prospect at a
//! time, and keeps per-campaign launch results for performance reporting.

use crate::personalize::personalize;
use crate::report::{
    ratio, BlockReason, BlockedMessage, CampaignLaunchReport, CampaignPerformance,
    ScheduledMessage,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use outreach_channels::SmsTransport;
use outreach_compliance::TcpaComplianceEngine;
use outreach_consent::{normalize_phone, InboundAction, InboundResponse};
use outreach_core::clock::{system_clock, Clock};
use outreach_core::config::CampaignConfig;
use outreach_core::event_bus::{make_event, noop_sink, EventSink, OutreachEventType};
use outreach_core::{DeliveryStatus, DeliveryUpdate, OutreachError, OutreachMessage, OutreachResult, Prospect};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-launch options.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Send time for every message; `None` sends immediately.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Overrides the configured status callback URL.
    pub callback_url: Option<String>,
}

#[derive(Default)]
struct CampaignState {
    launches: Vec<CampaignLaunchReport>,
    messages: HashMap<Uuid, OutreachMessage>,
    paused_at: Option<DateTime<Utc>>,
}

pub struct SmsCampaignOrchestrator {
    config: CampaignConfig,
    engine: Arc<TcpaComplianceEngine>,
    transport: Arc<dyn SmsTransport>,
    campaigns: DashMap<String, CampaignState>,
    /// Message id -> campaign id, for delivery updates.
    message_index: DashMap<Uuid, String>,
    /// Normalized phone -> most recent message id, for inbound replies.
    latest_by_phone: DashMap<String, Uuid>,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn EventSink>,
}

impl SmsCampaignOrchestrator {
    pub fn new(
        config: CampaignConfig,
        engine: Arc<TcpaComplianceEngine>,
        transport: Arc<dyn SmsTransport>,
    ) -> Self {
        info!(send_timeout_ms = config.send_timeout_ms, "SMS campaign orchestrator initialized");
        Self {
            config,
            engine,
            transport,
            campaigns: DashMap::new(),
            message_index: DashMap::new(),
            latest_by_phone: DashMap::new(),
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

    pub fn engine(&self) -> &Arc<TcpaComplianceEngine> {
        &self.engine
    }

    /// Run one send cycle over `prospects`. Prospects are processed in
    /// order; each one ends up either queued with the transport or blocked
    /// with a typed reason. Queued prospects get `last_contacted` stamped.
    /// A pause issued while the launch is running blocks every prospect
    /// not yet reached.
    pub async fn launch_sms_campaign(
        &self,
        campaign_id: &str,
        prospects: &mut [Prospect],
        message_template: &str,
        options: &LaunchOptions,
    ) -> CampaignLaunchReport {
        let launched_at = self.clock.now();
        self.campaigns.entry(campaign_id.to_string()).or_default();
        info!(campaign_id, prospects = prospects.len(), "Launching SMS campaign");

        let mut scheduled_messages = Vec::new();
        let mut blocked_messages = Vec::new();
        let mut compliance_violations = 0usize;

        for prospect in prospects.iter_mut() {
            if self.is_paused(campaign_id) {
                blocked_messages.push(self.block(campaign_id, prospect, None, BlockReason::CampaignPaused));
                continue;
            }

            let phone = match prospect.phone.as_deref().map(normalize_phone) {
                Some(Ok(phone)) => phone,
                Some(Err(e)) => {
                    let reason = BlockReason::InvalidPhone { error: e.to_string() };
                    blocked_messages.push(self.block(campaign_id, prospect, None, reason));
                    continue;
                }
                None => {
                    let reason = BlockReason::InvalidPhone {
                        error: "Prospect has no phone number".to_string(),
                    };
                    blocked_messages.push(self.block(campaign_id, prospect, None, reason));
                    continue;
                }
            };

            let message = personalize(message_template, prospect);
            let check = self
                .engine
                .validate_sms_outreach(prospect, &message, options.scheduled_time);

            if !check.compliant {
                compliance_violations += check.violations.len();
                let reason = BlockReason::PolicyViolation {
                    violations: check.violations,
                    compliance_score: check.compliance_score,
                    suggested_send_time: check.approved_send_time,
                };
                blocked_messages.push(self.block(campaign_id, prospect, Some(phone), reason));
                continue;
            }

            match self.send(&phone, &message, options).await {
                Ok(mut sent) => {
                    sent.prospect_id = Some(prospect.id.clone());
                    sent.campaign_id = Some(campaign_id.to_string());

                    let sent_at = check.approved_send_time;
                    if let Err(e) = self.engine.record_send(&phone, sent_at) {
                        warn!(error = %e, phone = %phone, "Failed to record send in ledger");
                    }
                    prospect.last_contacted = Some(sent_at);

                    scheduled_messages.push(ScheduledMessage {
                        prospect_id: prospect.id.clone(),
                        phone_number: phone.clone(),
                        message_id: sent.id,
                        provider_message_id: sent.provider_message_id.clone(),
                        scheduled_time: sent.scheduled_time,
                        compliance_score: check.compliance_score,
                        warnings: check.warnings,
                    });
                    self.track_message(campaign_id, &phone, sent);

                    metrics::counter!("campaign.messages_queued").increment(1);
                    self.event_sink.emit(make_event(
                        OutreachEventType::MessageQueued,
                        Some(phone),
                        Some(prospect.id.clone()),
                        Some(campaign_id.to_string()),
                        serde_json::Value::Null,
                    ));
                }
                Err(e) => {
                    let reason = BlockReason::TransportFailed { error: e.to_string() };
                    blocked_messages.push(self.block(campaign_id, prospect, Some(phone), reason));
                }
            }
        }

        let report = CampaignLaunchReport {
            campaign_id: campaign_id.to_string(),
            prospects_targeted: prospects.len(),
            messages_queued: scheduled_messages.len(),
            messages_blocked: blocked_messages.len(),
            compliance_violations,
            scheduled_messages,
            blocked_messages,
            launched_at,
            completed_at: self.clock.now(),
        };

        info!(
            campaign_id,
            targeted = report.prospects_targeted,
            queued = report.messages_queued,
            blocked = report.messages_blocked,
            violations = report.compliance_violations,
            "SMS campaign launch complete"
        );

        self.campaigns
            .entry(campaign_id.to_string())
            .or_default()
            .launches
            .push(report.clone());
        report
    }

    async fn send(
        &self,
        phone: &str,
        message: &str,
        options: &LaunchOptions,
    ) -> OutreachResult<OutreachMessage> {
        let callback = options
            .callback_url
            .as_deref()
            .or(self.config.status_callback_url.as_deref());
        let timeout = Duration::from_millis(self.config.send_timeout_ms);

        match tokio::time::timeout(
            timeout,
            self.transport
                .send_sms(phone, message, options.scheduled_time, callback),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(OutreachError::Timeout(self.config.send_timeout_ms)),
        }
    }

    fn block(
        &self,
        campaign_id: &str,
        prospect: &Prospect,
        phone: Option<String>,
        reason: BlockReason,
    ) -> BlockedMessage {
        debug!(
            campaign_id,
            prospect_id = %prospect.id,
            reason = reason.label(),
            "SMS blocked"
        );
        metrics::counter!("campaign.messages_blocked", "reason" => reason.label()).increment(1);
        self.event_sink.emit(make_event(
            OutreachEventType::MessageBlocked,
            phone.clone(),
            Some(prospect.id.clone()),
            Some(campaign_id.to_string()),
            serde_json::json!({ "reason": reason.label() }),
        ));
        BlockedMessage {
            prospect_id: prospect.id.clone(),
            phone_number: phone,
            reason,
        }
    }

    fn track_message(&self, campaign_id: &str, phone: &str, message: OutreachMessage) {
        self.message_index.insert(message.id, campaign_id.to_string());
        self.latest_by_phone.insert(phone.to_string(), message.id);
        if let Some(mut state) = self.campaigns.get_mut(campaign_id) {
            state.messages.insert(message.id, message);
        }
    }

    fn is_paused(&self, campaign_id: &str) -> bool {
        self.campaigns
            .get(campaign_id)
            .is_some_and(|state| state.paused_at.is_some())
    }

    /// Pause a campaign. Launches already running stop before their next
    /// prospect; later launches block every prospect until resumed.
    /// Messages already handed to the transport are not recalled.
    pub fn pause_campaign(&self, campaign_id: &str) -> DateTime<Utc> {
        let now = self.clock.now();
        let mut state = self.campaigns.entry(campaign_id.to_string()).or_default();
        let paused_at = *state.paused_at.get_or_insert(now);
        drop(state);

        info!(campaign_id, paused_at = %paused_at, "SMS campaign paused");
        self.event_sink.emit(make_event(
            OutreachEventType::CampaignPaused,
            None,
            None,
            Some(campaign_id.to_string()),
            serde_json::Value::Null,
        ));
        paused_at
    }

    /// Returns true if the campaign was paused.
    pub fn resume_campaign(&self, campaign_id: &str) -> bool {
        let resumed = self
            .campaigns
            .get_mut(campaign_id)
            .and_then(|mut state| state.paused_at.take())
            .is_some();
        if resumed {
            info!(campaign_id, "SMS campaign resumed");
        }
        resumed
    }

    /// Apply a transport delivery update to the tracked campaign message.
    /// Returns false for unknown messages and out-of-order transitions.
    pub fn apply_delivery_update(&self, update: &DeliveryUpdate) -> bool {
        let Some(campaign_id) = self.message_index.get(&update.message_id).map(|c| c.value().clone()) else {
            return false;
        };
        let applied = self
            .campaigns
            .get_mut(&campaign_id)
            .and_then(|mut state| {
                state
                    .messages
                    .get_mut(&update.message_id)
                    .map(|msg| msg.update_status(update.status, update.timestamp))
            })
            .unwrap_or(false);

        if applied {
            self.event_sink.emit(make_event(
                OutreachEventType::DeliveryUpdated,
                None,
                None,
                Some(campaign_id),
                serde_json::json!({ "message_id": update.message_id, "status": update.status }),
            ));
        }
        applied
    }

    /// Route an inbound SMS through consent keyword handling and attribute
    /// it to the most recent campaign message sent to that number: opt-outs
    /// mark it unsubscribed, any other reply marks it replied.
    pub fn handle_inbound_sms(&self, phone: &str, body: &str) -> OutreachResult<InboundResponse> {
        let response = self
            .engine
            .consent_manager()
            .process_inbound_message(phone, body)?;

        let status = match response.action {
            InboundAction::OptOut => DeliveryStatus::Unsubscribed,
            _ => DeliveryStatus::Replied,
        };
        if let Some(message_id) = self
            .latest_by_phone
            .get(&response.phone_number)
            .map(|id| *id)
        {
            self.apply_delivery_update(&DeliveryUpdate {
                message_id,
                status,
                timestamp: response.processed_at,
                error_code: None,
            });
        }
        Ok(response)
    }

    pub fn get_campaign_performance(&self, campaign_id: &str) -> OutreachResult<CampaignPerformance> {
        let state = self
            .campaigns
            .get(campaign_id)
            .ok_or_else(|| OutreachError::CampaignNotFound(campaign_id.to_string()))?;

        let targeted: usize = state.launches.iter().map(|l| l.prospects_targeted).sum();
        let queued: usize = state.launches.iter().map(|l| l.messages_queued).sum();
        let blocked: usize = state.launches.iter().map(|l| l.messages_blocked).sum();
        let delivered = state.messages.values().filter(|m| m.status.is_delivered()).count();
        let replied = state.messages.values().filter(|m| m.replied).count();
        let unsubscribed = state.messages.values().filter(|m| m.unsubscribed).count();

        Ok(CampaignPerformance {
            campaign_id: campaign_id.to_string(),
            launches: state.launches.len(),
            prospects_targeted: targeted,
            messages_queued: queued,
            messages_blocked: blocked,
            compliance_rate: ratio(queued, targeted),
            messages_delivered: delivered,
            messages_replied: replied,
            messages_unsubscribed: unsubscribed,
            delivery_rate: ratio(delivered, queued),
            response_rate: ratio(replied, delivered),
            paused_at: state.paused_at,
        })
    }

    pub fn campaign_messages(&self, campaign_id: &str) -> Vec<OutreachMessage> {
        self.campaigns
            .get(campaign_id)
            .map(|state| state.messages.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BlockReason;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use outreach_channels::TwilioSmsProvider;
    use outreach_consent::ConsentManager;
    use outreach_core::clock::FixedClock;
    use outreach_core::config::{AuditConfig, ConsentConfig, TcpaComplianceConfig, TwilioConfig};
    use outreach_core::event_bus::capture_sink;
    use outreach_core::ViolationType;
    use parking_lot::Mutex;
    use std::sync::Weak;

    const TEMPLATE: &str = "Hi {first_name}, quick question about {company}.";

    /// 2024-01-09 is a Tuesday.
    fn tuesday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 9, hour, 0, 0).unwrap()
    }

    fn engine() -> Arc<TcpaComplianceEngine> {
        let clock = Arc::new(FixedClock::new(tuesday(14)));
        let consent = Arc::new(ConsentManager::new(ConsentConfig::default()).with_clock(clock.clone()));
        Arc::new(
            TcpaComplianceEngine::new(TcpaComplianceConfig::default(), &AuditConfig::default(), consent)
                .with_clock(clock),
        )
    }

    fn orchestrator_with(transport: Arc<dyn SmsTransport>) -> SmsCampaignOrchestrator {
        SmsCampaignOrchestrator::new(CampaignConfig::default(), engine(), transport)
            .with_clock(Arc::new(FixedClock::new(tuesday(14))))
    }

    fn orchestrator() -> SmsCampaignOrchestrator {
        orchestrator_with(Arc::new(TwilioSmsProvider::new(TwilioConfig::default())))
    }

    fn consented(orch: &SmsCampaignOrchestrator, id: &str, phone: &str) -> Prospect {
        orch.engine()
            .consent_manager()
            .record_consent(phone, Some(id), "web_form", None, "landing_page")
            .unwrap();
        let mut p = Prospect::new(id, "Ada").with_phone(phone);
        p.company = Some("Acme".into());
        p
    }

    fn opts() -> LaunchOptions {
        LaunchOptions {
            scheduled_time: Some(tuesday(15)),
            callback_url: None,
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl SmsTransport for FailingTransport {
        async fn send_sms(
            &self,
            _to_phone: &str,
            _message: &str,
            _scheduled_time: Option<DateTime<Utc>>,
            _callback_url: Option<&str>,
        ) -> OutreachResult<OutreachMessage> {
            Err(OutreachError::Transport("carrier unavailable".into()))
        }
    }

    /// Pauses the campaign from inside the first send.
    struct PausingTransport {
        inner: TwilioSmsProvider,
        orchestrator: Mutex<Option<Weak<SmsCampaignOrchestrator>>>,
    }

    #[async_trait]
    impl SmsTransport for PausingTransport {
        async fn send_sms(
            &self,
            to_phone: &str,
            message: &str,
            scheduled_time: Option<DateTime<Utc>>,
            callback_url: Option<&str>,
        ) -> OutreachResult<OutreachMessage> {
            let orch = self.orchestrator.lock().take().and_then(|w| w.upgrade());
            if let Some(orch) = orch {
                orch.pause_campaign("c-1");
            }
            self.inner
                .send_sms(to_phone, message, scheduled_time, callback_url)
                .await
        }
    }

    #[tokio::test]
    async fn test_empty_prospect_list() {
        let orch = orchestrator();
        let report = orch.launch_sms_campaign("c-1", &mut [], TEMPLATE, &opts()).await;
        assert_eq!(report.prospects_targeted, 0);
        assert_eq!(report.messages_queued, 0);
        assert_eq!(report.messages_blocked, 0);

        let perf = orch.get_campaign_performance("c-1").unwrap();
        assert_eq!(perf.launches, 1);
        assert_eq!(perf.compliance_rate, 0.0);
    }

    #[tokio::test]
    async fn test_queued_and_blocked_partition() {
        let sink = capture_sink();
        let orch = orchestrator().with_event_sink(sink.clone());
        let mut prospects = vec![
            consented(&orch, "p-1", "5551230001"),
            Prospect::new("p-2", "Grace").with_phone("5551230002"),
            Prospect::new("p-3", "Alan").with_phone("123"),
            Prospect::new("p-4", "Edsger"),
        ];

        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;

        assert_eq!(report.prospects_targeted, 4);
        assert_eq!(report.messages_queued, 1);
        assert_eq!(report.messages_blocked, 3);
        assert_eq!(report.messages_queued + report.messages_blocked, report.prospects_targeted);
        assert_eq!(report.compliance_violations, 1);

        let queued = &report.scheduled_messages[0];
        assert_eq!(queued.prospect_id, "p-1");
        assert_eq!(queued.phone_number, "+15551230001");
        assert_eq!(prospects[0].last_contacted, Some(tuesday(15)));
        assert!(prospects[1].last_contacted.is_none());

        match &report.blocked_messages[0].reason {
            BlockReason::PolicyViolation { violations, .. } => {
                assert_eq!(violations[0].violation_type, ViolationType::ConsentViolation);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
        assert!(matches!(report.blocked_messages[1].reason, BlockReason::InvalidPhone { .. }));
        assert!(matches!(report.blocked_messages[2].reason, BlockReason::InvalidPhone { .. }));

        assert_eq!(sink.count_type(OutreachEventType::MessageQueued), 1);
        assert_eq!(sink.count_type(OutreachEventType::MessageBlocked), 3);

        let sent = orch.campaign_messages("c-1");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.ends_with("Reply STOP to unsubscribe"));
        assert_eq!(sent[0].campaign_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_quiet_hours_blocks_with_suggested_time() {
        let orch = orchestrator();
        let mut prospects = vec![consented(&orch, "p-1", "5551230001")];
        let options = LaunchOptions {
            scheduled_time: Some(tuesday(22)),
            callback_url: None,
        };

        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &options)
            .await;
        assert_eq!(report.messages_blocked, 1);
        match &report.blocked_messages[0].reason {
            BlockReason::PolicyViolation { suggested_send_time, .. } => {
                assert_eq!(*suggested_send_time, Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_blocked() {
        let orch = orchestrator_with(Arc::new(FailingTransport));
        let mut prospects = vec![consented(&orch, "p-1", "5551230001")];

        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;
        assert_eq!(report.messages_queued, 0);
        assert_eq!(report.messages_blocked, 1);
        assert_eq!(report.compliance_violations, 0);
        match &report.blocked_messages[0].reason {
            BlockReason::TransportFailed { error } => assert!(error.contains("carrier unavailable")),
            other => panic!("unexpected reason: {other:?}"),
        }
        assert!(prospects[0].last_contacted.is_none());
    }

    #[tokio::test]
    async fn test_pause_mid_launch_blocks_remaining() {
        let transport = Arc::new(PausingTransport {
            inner: TwilioSmsProvider::new(TwilioConfig::default()),
            orchestrator: Mutex::new(None),
        });
        let orch = Arc::new(orchestrator_with(transport.clone()));
        *transport.orchestrator.lock() = Some(Arc::downgrade(&orch));

        let mut prospects = vec![
            consented(&orch, "p-1", "5551230001"),
            consented(&orch, "p-2", "5551230002"),
            consented(&orch, "p-3", "5551230003"),
        ];
        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;

        assert_eq!(report.messages_queued, 1);
        assert_eq!(report.messages_blocked, 2);
        assert!(report
            .blocked_messages
            .iter()
            .all(|b| b.reason == BlockReason::CampaignPaused));

        let perf = orch.get_campaign_performance("c-1").unwrap();
        assert_eq!(perf.paused_at, Some(tuesday(14)));
    }

    #[tokio::test]
    async fn test_paused_campaign_blocks_until_resumed() {
        let orch = orchestrator();
        orch.pause_campaign("c-1");
        let mut prospects = vec![consented(&orch, "p-1", "5551230001")];

        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;
        assert_eq!(report.messages_blocked, 1);
        assert_eq!(report.blocked_messages[0].reason, BlockReason::CampaignPaused);

        assert!(orch.resume_campaign("c-1"));
        assert!(!orch.resume_campaign("c-1"));
        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;
        assert_eq!(report.messages_queued, 1);
    }

    #[tokio::test]
    async fn test_measured_delivery_and_response_rates() {
        let orch = orchestrator();
        let mut prospects = vec![
            consented(&orch, "p-1", "5551230001"),
            consented(&orch, "p-2", "5551230002"),
        ];
        let report = orch
            .launch_sms_campaign("c-1", &mut prospects, TEMPLATE, &opts())
            .await;
        assert_eq!(report.messages_queued, 2);

        for scheduled in &report.scheduled_messages {
            assert!(orch.apply_delivery_update(&DeliveryUpdate {
                message_id: scheduled.message_id,
                status: DeliveryStatus::Delivered,
                timestamp: tuesday(15),
                error_code: None,
            }));
        }

        let response = orch.handle_inbound_sms("555-123-0001", "Sounds good, call me").unwrap();
        assert_eq!(response.action, InboundAction::NoAction);
        let response = orch.handle_inbound_sms("5551230002", "STOP").unwrap();
        assert!(response.consent_revoked);

        let perf = orch.get_campaign_performance("c-1").unwrap();
        assert_eq!(perf.messages_delivered, 2);
        assert_eq!(perf.delivery_rate, 1.0);
        assert_eq!(perf.messages_replied, 1);
        assert_eq!(perf.messages_unsubscribed, 1);
        assert_eq!(perf.response_rate, 0.5);
        assert_eq!(perf.compliance_rate, 1.0);
    }

    #[test]
    fn test_unknown_campaign_and_message() {
        let orch = orchestrator();
        assert!(matches!(
            orch.get_campaign_performance("nope"),
            Err(OutreachError::CampaignNotFound(_))
        ));
        assert!(!orch.apply_delivery_update(&DeliveryUpdate {
            message_id: Uuid::new_v4(),
            status: DeliveryStatus::Delivered,
            timestamp: tuesday(15),
            error_code: None,
        }));
    }
}
