//! SMS delivery channel: the transport boundary the campaign orchestrator
//! sends through, the Twilio provider, and segment accounting.

pub mod segments;
pub mod sms;

pub use sms::{map_twilio_status, SmsTransport, TwilioSmsProvider};
