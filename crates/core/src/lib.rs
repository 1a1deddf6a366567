//! Shared domain model for SMS outreach: prospects, messages, compliance
//! records, configuration, errors, events and the injectable clock.

pub mod clock;
pub mod compliance;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod message;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use compliance::{ComplianceRecord, ComplianceStatus, ComplianceViolation, ViolationType};
pub use config::AppConfig;
pub use error::{OutreachError, OutreachResult};
pub use message::{DeliveryStatus, DeliveryUpdate, OutreachMessage};
pub use types::{Channel, ConsentStatus, Interaction, Prospect};
