//! Compliance reporting over the audit log.

use chrono::{DateTime, Utc};
use outreach_core::{ComplianceRecord, ViolationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOP_VIOLATIONS: usize = 5;

// Recommendation thresholds (violations per reporting period).
const CONSENT_VIOLATION_THRESHOLD: usize = 5;
const TIMING_VIOLATION_THRESHOLD: usize = 3;
const FREQUENCY_VIOLATION_THRESHOLD: usize = 10;
const TARGET_COMPLIANCE_RATE: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_compliance_checks: usize,
    pub compliant_checks: usize,
    pub violation_checks: usize,
    pub compliance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCount {
    pub violation_type: ViolationType,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub reporting_period: ReportingPeriod,
    pub summary_statistics: SummaryStatistics,
    pub violation_breakdown: BTreeMap<ViolationType, usize>,
    pub top_violations: Vec<ViolationCount>,
    pub recommendations: Vec<String>,
}

pub fn build_report(
    records: &[ComplianceRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ComplianceReport {
    let total = records.len();
    let compliant = records.iter().filter(|r| !r.has_violations()).count();
    let compliance_rate = if total > 0 {
        compliant as f64 / total as f64
    } else {
        0.0
    };

    let mut breakdown: BTreeMap<ViolationType, usize> = BTreeMap::new();
    for violation in records.iter().flat_map(|r| r.violations()) {
        *breakdown.entry(violation.violation_type).or_default() += 1;
    }

    let mut top: Vec<ViolationCount> = breakdown
        .iter()
        .map(|(violation_type, count)| ViolationCount {
            violation_type: *violation_type,
            count: *count,
        })
        .collect();
    top.sort_by(|a, b| b.count.cmp(&a.count).then(a.violation_type.cmp(&b.violation_type)));
    top.truncate(TOP_VIOLATIONS);

    let recommendations = recommendations(&breakdown, total, compliance_rate);

    ComplianceReport {
        reporting_period: ReportingPeriod { start, end },
        summary_statistics: SummaryStatistics {
            total_compliance_checks: total,
            compliant_checks: compliant,
            violation_checks: total - compliant,
            compliance_rate,
        },
        violation_breakdown: breakdown,
        top_violations: top,
        recommendations,
    }
}

fn recommendations(
    breakdown: &BTreeMap<ViolationType, usize>,
    total: usize,
    compliance_rate: f64,
) -> Vec<String> {
    let count_where = |pred: fn(&ViolationType) -> bool| -> usize {
        breakdown
            .iter()
            .filter(|(t, _)| pred(t))
            .map(|(_, c)| *c)
            .sum()
    };

    let consent = count_where(|t| *t == ViolationType::ConsentViolation);
    let timing = count_where(ViolationType::is_timing);
    let frequency = count_where(ViolationType::is_frequency);

    let mut out = Vec::new();
    if consent > CONSENT_VIOLATION_THRESHOLD {
        out.push(
            "Implement double opt-in and re-verify SMS consent before adding prospects to campaigns"
                .to_string(),
        );
    }
    if timing > TIMING_VIOLATION_THRESHOLD {
        out.push(
            "Schedule sends in each recipient's local time zone to stay outside quiet hours and weekends"
                .to_string(),
        );
    }
    if frequency > FREQUENCY_VIOLATION_THRESHOLD {
        out.push("Reduce outreach cadence; prospects are being contacted too often".to_string());
    }
    if total > 0 && compliance_rate < TARGET_COMPLIANCE_RATE {
        out.push(format!(
            "Compliance rate {:.1}% is below the {:.0}% target; review templates and targeting before the next send",
            compliance_rate * 100.0,
            TARGET_COMPLIANCE_RATE * 100.0
        ));
    }
    out
}
