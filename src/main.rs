mod cli;
mod config;
mod error;
mod fingerprint;
mod mapping;
mod status;
mod sync;
mod tracker;
mod util;
mod violation;

use clap::Parser;
use cli::{Cli, Commands, InitArgs, SyncArgs};
use config::Config;
use std::path::Path;
use sync::driver::{self, SyncSettings};
use sync::render::{self, Summary};
use tracing::{debug, error, info, warn};
use tracker::jira::JiraClient;
use violation::{ViolationRecord, ViolationSet};

const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Init(args) => init(args),
        Commands::Schema => schema(),
        Commands::Sync(args) => sync(args).await,
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn init(args: &InitArgs) -> anyhow::Result<i32> {
    if Path::new(&args.config).exists() && !args.r#override {
        anyhow::bail!(
            "{} already exists, pass --override to replace it",
            args.config
        );
    }
    let content = toml::to_string_pretty(&Config::example())?;
    std::fs::write(&args.config, content)?;
    info!("Wrote default config to {}", args.config);
    Ok(0)
}

fn schema() -> anyhow::Result<i32> {
    let schema = schemars::schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(0)
}

async fn sync(args: &SyncArgs) -> anyhow::Result<i32> {
    let config = Config::load(&args.config, &args.config_overrides)?;
    let settings = SyncSettings::from_config(&config)?;
    debug!("Fixed-violation policy: {:?}", settings.lifecycle.policy());

    let rows = violation::load_rows(&args.input)?;
    let violations = ViolationSet::from_records(rows.into_iter().map(ViolationRecord::from_row));
    info!(
        "{} violations ready ({} collisions, {} without fingerprint)",
        violations.len(),
        violations.collisions(),
        violations.skipped()
    );
    if violations.is_empty() {
        warn!("No violations to synchronize in {}", args.input);
    }

    let outcome = if args.dry_run {
        info!("Dry run: the tracker will not be contacted");
        driver::dry_run(&violations, &settings)
    } else {
        let token = args.api_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("a tracker token is required (--api-token or CASTSYNC_TRACKER_TOKEN)")
        })?;
        let client = JiraClient::from_config(&config.tracker, token)?;
        driver::run(&client, &violations, &settings).await?
    };

    let summary = Summary {
        outcome,
        fingerprint_collisions: violations.collisions(),
        fingerprint_failures: violations.skipped(),
        dry_run: args.dry_run,
    };
    render::log_summary(&summary);
    if let Some(path) = &args.output {
        render::write_output(path, &summary)?;
    }

    let code = outcome.exit_code();
    if code != 0 {
        error!("{} violation(s) could not be synchronized", outcome.not_added_by_error);
    }
    Ok(code)
}
