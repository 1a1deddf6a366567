//! TCPA compliance: quiet hours, business days, frequency caps, content
//! review, scoring, the compliance audit log and reporting.

pub mod audit;
pub mod content;
pub mod engine;
pub mod frequency;
pub mod report;
pub mod timing;

pub use audit::{AuditLogStats, ComplianceLog};
pub use content::{ContentWarning, ContentWarningKind};
pub use engine::{ComplianceCheck, TcpaComplianceEngine};
pub use report::ComplianceReport;
