use clap::{Parser, Subcommand};

// Display order for the tracker token option (placed at top of help text)
const TOKEN_DISPLAY_ORDER: usize = 0;
// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "castsync", version, about = "Synchronize CAST violations with an issue tracker", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: CASTSYNC_LOG=] [default: info]
    #[arg(
        long,
        env = "CASTSYNC_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a default castsync.toml config file
    Init(InitArgs),
    /// Print the JSON schema of the config file
    Schema,
    /// Reconcile extracted violations with the tracker
    Sync(SyncArgs),
}

/// Arguments for the init command
#[derive(Parser)]
pub struct InitArgs {
    /// Path to config file
    #[arg(long, default_value = "castsync.toml")]
    pub config: String,

    /// Override existing config file
    #[arg(long)]
    pub r#override: bool,
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Path to config file (initialize with `castsync init`)
    #[arg(long, default_value = "castsync.toml")]
    pub config: String,

    /// Override config values using dot notation (e.g. tracker.project_key=OPS)
    #[arg(long = "config-override")]
    pub config_overrides: Vec<String>,

    /// Tracker API token, used with the configured username
    #[arg(long, env = "CASTSYNC_TRACKER_TOKEN", display_order = TOKEN_DISPLAY_ORDER)]
    pub api_token: Option<String>,

    /// JSON file with the violation rows extracted from the CAST dashboard
    #[arg(long)]
    pub input: String,

    /// Dry run: compose tickets and count violations without calling the tracker
    #[arg(long)]
    pub dry_run: bool,

    /// Output file path for the run summary (.md or .json)
    #[arg(long)]
    pub output: Option<String>,
}
