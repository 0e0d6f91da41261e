pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectArgs, PlanArgs, ProvidersArgs};
pub use output::{DetectionReport, OutputFormat, OutputFormatter, ProviderInfo};
