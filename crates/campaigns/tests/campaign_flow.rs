//! End-to-end SMS campaign flow: consent, launch, delivery callbacks,
//! inbound opt-out and the compliance report that follows.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use outreach_campaigns::{BlockReason, LaunchOptions, SmsCampaignOrchestrator};
    use outreach_channels::TwilioSmsProvider;
    use outreach_compliance::TcpaComplianceEngine;
    use outreach_consent::{ConsentManager, InboundAction};
    use outreach_core::clock::FixedClock;
    use outreach_core::config::AppConfig;
    use outreach_core::event_bus::{capture_sink, OutreachEventType};
    use outreach_core::{ConsentStatus, Prospect, ViolationType};
    use std::sync::Arc;

    /// 2024-01-09 is a Tuesday.
    fn tuesday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 9, hour, 0, 0).unwrap()
    }

    struct Harness {
        orchestrator: SmsCampaignOrchestrator,
        provider: Arc<TwilioSmsProvider>,
        consent: Arc<ConsentManager>,
    }

    fn harness() -> Harness {
        let config = AppConfig::default();
        let clock = Arc::new(FixedClock::new(tuesday(14)));
        let sink = capture_sink();

        let consent = Arc::new(
            ConsentManager::new(config.consent.clone())
                .with_clock(clock.clone())
                .with_event_sink(sink.clone()),
        );
        let engine = Arc::new(
            TcpaComplianceEngine::new(config.compliance.clone(), &config.audit, consent.clone())
                .with_clock(clock.clone())
                .with_event_sink(sink.clone()),
        );
        let provider = Arc::new(TwilioSmsProvider::new(config.twilio.clone()));
        let orchestrator =
            SmsCampaignOrchestrator::new(config.campaigns.clone(), engine, provider.clone())
                .with_clock(clock)
                .with_event_sink(sink);

        Harness {
            orchestrator,
            provider,
            consent,
        }
    }

    fn prospects() -> Vec<Prospect> {
        let mut ada = Prospect::new("p-1", "Ada").with_phone("(555) 123-0001");
        ada.company = Some("Analytical Engines".into());
        let mut grace = Prospect::new("p-2", "Grace").with_phone("555.123.0002");
        grace.company = Some("Navy".into());
        let alan = Prospect::new("p-3", "Alan").with_phone("5551230003");
        vec![ada, grace, alan]
    }

    #[tokio::test]
    async fn test_full_campaign_flow() {
        let h = harness();
        h.consent
            .record_consent("5551230001", Some("p-1"), "web_form", Some("Yes, text me"), "landing_page")
            .unwrap();
        h.consent
            .record_consent("5551230002", Some("p-2"), "double_opt_in", None, "sms")
            .unwrap();

        let options = LaunchOptions {
            scheduled_time: Some(tuesday(15)),
            callback_url: Some("https://hooks.example.com/sms".into()),
        };
        let mut list = prospects();
        let report = h
            .orchestrator
            .launch_sms_campaign(
                "spring-demo",
                &mut list,
                "Hi {first_name}, can {company} spare 15 minutes this week?",
                &options,
            )
            .await;

        assert_eq!(report.prospects_targeted, 3);
        assert_eq!(report.messages_queued, 2);
        assert_eq!(report.messages_blocked, 1);
        assert_eq!(report.blocked_messages[0].prospect_id, "p-3");
        assert!(matches!(
            report.blocked_messages[0].reason,
            BlockReason::PolicyViolation { .. }
        ));

        // Twilio reports both messages delivered.
        for scheduled in &report.scheduled_messages {
            let provider_id = scheduled.provider_message_id.as_deref().unwrap();
            let update = h
                .provider
                .handle_status_callback(provider_id, "delivered", None)
                .unwrap();
            assert!(h.orchestrator.apply_delivery_update(&update));
        }

        // Grace opts out by text.
        let response = h
            .orchestrator
            .handle_inbound_sms("+15551230002", "stop")
            .unwrap();
        assert_eq!(response.action, InboundAction::OptOut);
        assert!(response.consent_revoked);
        assert_eq!(
            h.consent.get_consent_status("5551230002").unwrap().status,
            ConsentStatus::Revoked
        );

        let perf = h.orchestrator.get_campaign_performance("spring-demo").unwrap();
        assert_eq!(perf.messages_delivered, 2);
        assert_eq!(perf.messages_unsubscribed, 1);
        assert_eq!(perf.delivery_rate, 1.0);

        // A follow-up an hour later trips the interval rule for Ada and the
        // revoked consent for Grace.
        let follow_up = LaunchOptions {
            scheduled_time: Some(tuesday(16)),
            callback_url: None,
        };
        let report = h
            .orchestrator
            .launch_sms_campaign("spring-demo", &mut list[..2], "Following up. Reply STOP to opt out.", &follow_up)
            .await;
        assert_eq!(report.messages_queued, 0);
        assert_eq!(report.messages_blocked, 2);

        let violations_for = |idx: usize| match &report.blocked_messages[idx].reason {
            BlockReason::PolicyViolation { violations, .. } => {
                violations.iter().map(|v| v.violation_type).collect::<Vec<_>>()
            }
            other => panic!("unexpected reason: {other:?}"),
        };
        assert_eq!(violations_for(0), vec![ViolationType::FrequencyViolation]);
        assert!(violations_for(1).contains(&ViolationType::ConsentViolation));

        let compliance = h
            .orchestrator
            .engine()
            .generate_compliance_report(tuesday(0), tuesday(23));
        assert_eq!(compliance.summary_statistics.total_compliance_checks, 5);
        assert_eq!(compliance.summary_statistics.compliant_checks, 2);
        assert!(compliance.summary_statistics.compliance_rate < 0.95);
        assert!(!compliance.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let config = AppConfig::default();
        let sink = capture_sink();
        let consent = Arc::new(ConsentManager::new(config.consent.clone()).with_event_sink(sink.clone()));
        consent
            .record_consent("5551230001", None, "web_form", None, "landing_page")
            .unwrap();
        consent.process_inbound_message("5551230001", "STOP").unwrap();
        consent.process_inbound_message("5551230001", "START").unwrap();

        assert_eq!(sink.count_type(OutreachEventType::ConsentGranted), 1);
        assert_eq!(sink.count_type(OutreachEventType::ConsentRevoked), 1);
        assert_eq!(sink.count_type(OutreachEventType::OptInRequested), 1);
    }
}
