//! Outreach Express: TCPA-compliant SMS outreach runner.
//!
//! Loads a batch of prospects and consent grants, runs one campaign launch
//! through the compliance engine and prints the launch and compliance
//! reports as JSON.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use outreach_campaigns::{LaunchOptions, SmsCampaignOrchestrator};
use outreach_channels::TwilioSmsProvider;
use outreach_compliance::TcpaComplianceEngine;
use outreach_consent::ConsentManager;
use outreach_core::config::AppConfig;
use outreach_core::Prospect;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "outreach-express")]
#[command(about = "TCPA-compliant SMS outreach runner")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, env = "SMS_OUTREACH_CONFIG")]
    config: Option<String>,

    /// Default recipient UTC offset in minutes (overrides config)
    #[arg(long, env = "SMS_OUTREACH__COMPLIANCE__DEFAULT_UTC_OFFSET_MINUTES")]
    utc_offset_minutes: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch one SMS campaign over a batch file
    Launch {
        /// JSON batch with `prospects` and `consents`
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        campaign_id: String,

        /// Message template with `{placeholder}` fields
        #[arg(long)]
        template: String,

        /// RFC 3339 send time; defaults to now
        #[arg(long)]
        scheduled_time: Option<DateTime<Utc>>,

        /// Status callback URL passed to the SMS provider
        #[arg(long)]
        callback_url: Option<String>,
    },
    /// Process an inbound SMS against the consents in a batch file
    Inbound {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        body: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Batch {
    #[serde(default)]
    prospects: Vec<Prospect>,
    #[serde(default)]
    consents: Vec<ConsentGrant>,
}

#[derive(Debug, Deserialize)]
struct ConsentGrant {
    phone: String,
    prospect_id: Option<String>,
    method: String,
    source: String,
    opt_in_message: Option<String>,
}

fn load_batch(path: &PathBuf) -> anyhow::Result<Batch> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing batch file {}", path.display()))
}

fn seed_consents(consent: &ConsentManager, grants: &[ConsentGrant]) {
    for grant in grants {
        if let Err(e) = consent.record_consent(
            &grant.phone,
            grant.prospect_id.as_deref(),
            &grant.method,
            grant.opt_in_message.as_deref(),
            &grant.source,
        ) {
            warn!(phone = %grant.phone, error = %e, "Skipping consent grant");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outreach_express=info,outreach_campaigns=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Outreach Express starting up");

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(offset) = cli.utc_offset_minutes {
        config.compliance.default_utc_offset_minutes = offset;
    }

    info!(
        quiet_hours_start = config.compliance.quiet_hours_start,
        quiet_hours_end = config.compliance.quiet_hours_end,
        max_daily_messages = config.compliance.max_daily_messages,
        "Configuration loaded"
    );

    let consent = Arc::new(ConsentManager::new(config.consent.clone()));
    let engine = Arc::new(TcpaComplianceEngine::new(
        config.compliance.clone(),
        &config.audit,
        consent.clone(),
    ));

    match cli.command {
        Command::Launch {
            input,
            campaign_id,
            template,
            scheduled_time,
            callback_url,
        } => {
            let mut batch = load_batch(&input)?;
            seed_consents(&consent, &batch.consents);

            let provider = Arc::new(TwilioSmsProvider::new(config.twilio.clone()));
            let orchestrator =
                SmsCampaignOrchestrator::new(config.campaigns.clone(), engine.clone(), provider);

            let started = Utc::now();
            let options = LaunchOptions {
                scheduled_time,
                callback_url,
            };
            let report = orchestrator
                .launch_sms_campaign(&campaign_id, &mut batch.prospects, &template, &options)
                .await;
            let compliance =
                engine.generate_compliance_report(started - Duration::minutes(1), Utc::now());

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "launch": report,
                    "compliance": compliance,
                }))?
            );
        }
        Command::Inbound { input, phone, body } => {
            if let Some(path) = input {
                let batch = load_batch(&path)?;
                seed_consents(&consent, &batch.consents);
            }
            let response = consent.process_inbound_message(&phone, &body)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    info!("Outreach Express shut down");
    Ok(())
}
