use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SMS_OUTREACH__` and an optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub compliance: TcpaComplianceConfig,
    #[serde(default)]
    pub consent: ConsentConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub campaigns: CampaignConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
}

// ─── TCPA Compliance Config ─────────────────────────────────────────────

/// Timing, frequency and content limits applied to every SMS send.
///
/// Quiet hours are expressed in the recipient's local time. When
/// `quiet_hours_start > quiet_hours_end` the window wraps midnight
/// (the default 21:00–08:00 does).
#[derive(Debug, Clone, Deserialize)]
pub struct TcpaComplianceConfig {
    #[serde(default = "default_quiet_hours_start")]
    pub quiet_hours_start: u32,
    #[serde(default = "default_quiet_hours_end")]
    pub quiet_hours_end: u32,
    #[serde(default = "default_max_daily_messages")]
    pub max_daily_messages: u32,
    #[serde(default = "default_min_message_interval_hours")]
    pub min_message_interval_hours: i64,
    /// Reject Saturday and Sunday sends.
    #[serde(default = "default_business_only_days")]
    pub business_only_days: bool,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Used when a prospect carries no UTC offset of its own.
    #[serde(default)]
    pub default_utc_offset_minutes: i32,
}

fn default_quiet_hours_start() -> u32 {
    21
}
fn default_quiet_hours_end() -> u32 {
    8
}
fn default_max_daily_messages() -> u32 {
    3
}
fn default_min_message_interval_hours() -> i64 {
    4
}
fn default_business_only_days() -> bool {
    true
}
fn default_max_message_length() -> usize {
    160
}

impl Default for TcpaComplianceConfig {
    fn default() -> Self {
        Self {
            quiet_hours_start: default_quiet_hours_start(),
            quiet_hours_end: default_quiet_hours_end(),
            max_daily_messages: default_max_daily_messages(),
            min_message_interval_hours: default_min_message_interval_hours(),
            business_only_days: default_business_only_days(),
            max_message_length: default_max_message_length(),
            default_utc_offset_minutes: 0,
        }
    }
}

// ─── Consent Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ConsentConfig {
    /// Days a granted consent stays valid.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    /// Days an expired record is kept before `purge_expired` drops it.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_expiry_days() -> i64 {
    365
}
fn default_retention_days() -> i64 {
    90
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            retention_days: default_retention_days(),
        }
    }
}

// ─── Audit Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Capacity of the compliance record ring buffer; oldest records are evicted.
    #[serde(default = "default_max_compliance_records")]
    pub max_compliance_records: usize,
}

fn default_max_compliance_records() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_compliance_records: default_max_compliance_records(),
        }
    }
}

// ─── Campaign Config ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default)]
    pub status_callback_url: Option<String>,
}

fn default_send_timeout_ms() -> u64 {
    10_000
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            status_callback_url: None,
        }
    }
}

// ─── Twilio Config ──────────────────────────────────────────────────────

/// Configuration for the Twilio SMS provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_from_number")]
    pub from_number: String,
    #[serde(default)]
    pub messaging_service_sid: Option<String>,
    #[serde(default)]
    pub status_callback_url: Option<String>,
}

fn default_from_number() -> String {
    "+15550000000".to_string()
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: default_from_number(),
            messaging_service_sid: None,
            status_callback_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SMS_OUTREACH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
