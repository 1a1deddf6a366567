//! SMS campaign orchestration: personalization, per-prospect compliance
//! gating, send-or-block, pause/resume and campaign performance.

pub mod orchestrator;
pub mod personalize;
pub mod report;

pub use orchestrator::{LaunchOptions, SmsCampaignOrchestrator};
pub use personalize::{personalize, OPT_OUT_SUFFIX};
pub use report::{
    BlockReason, BlockedMessage, CampaignLaunchReport, CampaignPerformance, ScheduledMessage,
};
