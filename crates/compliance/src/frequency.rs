//! Per-number send ledger backing the interval and daily-cap rules.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use outreach_core::config::TcpaComplianceConfig;
use outreach_core::{ComplianceViolation, ViolationType};
use std::collections::VecDeque;

/// Rolling window used for the daily cap.
const DAILY_WINDOW_HOURS: i64 = 24;

/// Send timestamps per normalized phone number. Entries older than the
/// daily window are dropped on every write, so memory stays proportional
/// to the last day's traffic.
#[derive(Default)]
pub struct SendLedger {
    sends: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl SendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phone: &str, at: DateTime<Utc>) {
        let horizon = at - Duration::hours(DAILY_WINDOW_HOURS);
        let mut entry = self.sends.entry(phone.to_string()).or_default();
        while entry.front().is_some_and(|t| *t <= horizon) {
            entry.pop_front();
        }
        let position = entry.partition_point(|t| *t <= at);
        entry.insert(position, at);
    }

    /// Sends to `phone` within the 24 hours before `at`.
    pub fn count_in_window(&self, phone: &str, at: DateTime<Utc>) -> u32 {
        let horizon = at - Duration::hours(DAILY_WINDOW_HOURS);
        self.sends
            .get(phone)
            .map(|sends| sends.iter().filter(|t| **t > horizon && **t <= at).count() as u32)
            .unwrap_or(0)
    }

    pub fn tracked_numbers(&self) -> usize {
        self.sends.len()
    }
}

/// Frequency violation for a send at `scheduled`, if any.
pub fn check_frequency(
    last_contacted: Option<DateTime<Utc>>,
    daily_count: u32,
    scheduled: DateTime<Utc>,
    config: &TcpaComplianceConfig,
) -> Option<ComplianceViolation> {
    if let Some(last) = last_contacted {
        let elapsed = scheduled - last;
        if elapsed < Duration::hours(config.min_message_interval_hours) {
            return Some(ComplianceViolation {
                violation_type: ViolationType::FrequencyViolation,
                description: format!(
                    "Last contacted {} minutes before the scheduled send; minimum interval is {} hours",
                    elapsed.num_minutes(),
                    config.min_message_interval_hours
                ),
            });
        }
    }

    if daily_count >= config.max_daily_messages {
        return Some(ComplianceViolation {
            violation_type: ViolationType::DailyLimitViolation,
            description: format!(
                "{} messages already sent in the last 24 hours; daily limit is {}",
                daily_count, config.max_daily_messages
            ),
        });
    }

    None
}
