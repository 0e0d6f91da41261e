use planbox::cli::commands::{CliArgs, Commands};
use planbox::cli::handlers::{handle_detect, handle_plan, handle_providers};
use planbox::util::logging::{self, LoggingConfig};
use planbox::{PlanboxConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let mut config = PlanboxConfig::default();
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }
    init_logging_from_args(&args, &config);

    debug!("planbox v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Plan(plan_args) => handle_plan(plan_args, &config, args.quiet).await,
        Commands::Detect(detect_args) => handle_detect(detect_args, &config).await,
        Commands::Providers(providers_args) => handle_providers(providers_args, &config),
    };

    std::process::exit(exit_code);
}

/// Level from `--log-level` or `PLANBOX_LOG_LEVEL`, adjusted by `-v`/`-q`
fn init_logging_from_args(args: &CliArgs, config: &PlanboxConfig) {
    let requested = &config.log_level;
    let base = logging::parse_level(requested).unwrap_or_else(|| {
        eprintln!(
            "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
            requested
        );
        Level::INFO
    });

    logging::init_logging(LoggingConfig::from_flags(base, args.verbose, args.quiet));
}
