use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Detects a project's ecosystem and synthesizes a container execution plan
#[derive(Parser, Debug)]
#[command(
    name = "planbox",
    about = "Detects a project's ecosystem and synthesizes a container execution plan",
    version,
    author,
    long_about = "planbox inspects a project's files, scores every supported ecosystem \
                  (Node, Deno, Python, Go, Java, PHP, Ruby, Rust, shell, static sites), \
                  selects one with backend-over-frontend priority and prints the base \
                  image, environment, commands, port and OS packages needed to run it."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate an execution plan for a project",
        long_about = "Detects the project's ecosystem and renders the execution plan for the \
                      selected result.\n\n\
                      Examples:\n  \
                      planbox plan\n  \
                      planbox plan /path/to/project --format json\n  \
                      planbox plan --provider python --start-cmd 'gunicorn app:app'"
    )]
    Plan(PlanArgs),

    #[command(
        about = "List every matching ecosystem with its confidence",
        long_about = "Runs all detectors and prints each matched result in registration order, \
                      marking the one plan selection would pick.\n\n\
                      Examples:\n  \
                      planbox detect\n  \
                      planbox detect /path/to/project --min-confidence 0.5"
    )]
    Detect(DetectArgs),

    #[command(about = "List the available providers")]
    Providers(ProvidersArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to project (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        value_name = "NAME",
        help = "Skip detection of other ecosystems and use this provider"
    )]
    pub provider: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "CMD", help = "Replace the generated setup commands")]
    pub install_cmd: Option<String>,

    #[arg(long, value_name = "CMD", help = "Replace the generated build commands")]
    pub build_cmd: Option<String>,

    #[arg(long, value_name = "CMD", help = "Replace the generated run commands")]
    pub start_cmd: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to project (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(short = 'p', long, value_name = "NAME", help = "Run only this provider")]
    pub provider: Option<String>,

    #[arg(
        long,
        value_name = "CONFIDENCE",
        default_value = "0.0",
        value_parser = parse_confidence,
        help = "Hide results below this confidence (0.0-1.0)"
    )]
    pub min_confidence: f64,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ProvidersArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_confidence(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("Invalid confidence: {}", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Confidence must be between 0.0 and 1.0, got {}", value))
    }
}
