//! Quiet-hours and business-day rules, evaluated in the recipient's local time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use outreach_core::config::TcpaComplianceConfig;
use outreach_core::{ComplianceViolation, ViolationType};

/// Whether `hour` falls inside the quiet window `[start, end)`, which wraps
/// midnight when `start > end`.
pub fn is_quiet_hour(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Timing violation for a send at `scheduled` in zone `tz`, if any.
pub fn check_timing(
    scheduled: DateTime<Utc>,
    tz: FixedOffset,
    config: &TcpaComplianceConfig,
) -> Option<ComplianceViolation> {
    let local = scheduled.with_timezone(&tz);
    let hour = local.hour();

    if is_quiet_hour(hour, config.quiet_hours_start, config.quiet_hours_end) {
        return Some(ComplianceViolation {
            violation_type: ViolationType::QuietHoursViolation,
            description: format!(
                "Scheduled for {:02}:{:02} local time, inside quiet hours ({:02}:00-{:02}:00)",
                hour,
                local.minute(),
                config.quiet_hours_start,
                config.quiet_hours_end
            ),
        });
    }

    if config.business_only_days && is_weekend(local.date_naive()) {
        return Some(ComplianceViolation {
            violation_type: ViolationType::WeekendViolation,
            description: format!(
                "Scheduled for {} local time; sends are limited to business days",
                local.format("%A")
            ),
        });
    }

    None
}

/// Earliest permitted alternative for a send that failed the timing check:
/// the end of the quiet window on the same morning, or the next morning if
/// the original time was in the evening part of the window, then moved past
/// weekends when business days are enforced.
pub fn next_allowed_time(
    scheduled: DateTime<Utc>,
    tz: FixedOffset,
    config: &TcpaComplianceConfig,
) -> DateTime<Utc> {
    let local = scheduled.with_timezone(&tz);
    let mut date = local.date_naive();

    let wraps = config.quiet_hours_start > config.quiet_hours_end;
    if wraps && local.hour() >= config.quiet_hours_start {
        date += Duration::days(1);
    }
    if config.business_only_days {
        while is_weekend(date) {
            date += Duration::days(1);
        }
    }

    date.and_hms_opt(config.quiet_hours_end.min(23), 0, 0)
        .and_then(|opening| tz.from_local_datetime(&opening).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(scheduled)
}
