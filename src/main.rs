use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wifi_curfew::config::{Config, Discovered};
use wifi_curfew::job::{DesiredState, Job};
use wifi_curfew::scheduler::cron::MAX_PREVIEW_HOURS;

#[derive(Parser)]
#[command(
    name = "wifi-curfew",
    about = "Scheduled Wi-Fi on/off switching through a modem's web admin console",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (TOML). Defaults to $WIFI_CURFEW_CONFIG, then ./wifi-curfew.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (daily OFF/ON scheduler)
    Serve,

    /// Run one job right now
    Run {
        /// Desired Wi-Fi state: on or off
        #[arg(long)]
        state: DesiredState,

        /// Go through the sequence without pressing Save
        #[arg(long)]
        test: bool,

        /// Force a headless browser (test runs are visible by default)
        #[arg(long)]
        headless: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Inspect the daily schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Validate the credential file without opening a browser
    CheckCredentials,
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Preview what will run in the next N hours
    DryRun {
        /// Hours to preview
        #[arg(
            long,
            default_value = "24",
            value_parser = clap::value_parser!(u64).range(1..=MAX_PREVIEW_HOURS)
        )]
        hours: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let discovered = match &cli.config {
        Some(path) => Discovered {
            config: Config::load(path)?,
            source: Some(path.clone()),
            warnings: Vec::new(),
        },
        None => Config::load_or_default(),
    };
    wifi_curfew::logging::init(&discovered.config.logging);
    discovered.log();
    let config = discovered.config;

    match cli.command {
        Commands::Serve => {
            tracing::info!("Starting wifi-curfew daemon");
            wifi_curfew::serve(config).await?;
        }
        Commands::Run {
            state,
            test,
            headless,
            json,
        } => {
            // A test run opens a visible window unless asked otherwise.
            let headless = if test { headless } else { headless || config.browser.headless };
            let job = Job::new(state).with_test_mode(test).with_headless(headless);
            tracing::info!(%state, test, headless, "Running job now");

            let runner = wifi_curfew::chrome_runner(&config);
            let report = runner.run(&job).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Wi-Fi {}: {} after {} attempt(s)",
                    report.state, report.outcome, report.attempts
                );
                if let Some(path) = &report.artifact {
                    println!("Screenshot: {}", path.display());
                }
            }
        }
        Commands::Schedule { action } => match action {
            ScheduleAction::DryRun { hours } => {
                let now = chrono::Local::now();
                let scheduler =
                    wifi_curfew::scheduler::Scheduler::from_config(&config.schedule, &now)?;
                let preview = scheduler.preview(&now, hours)?;
                if preview.is_empty() {
                    println!("No runs scheduled in next {} hours.", hours);
                } else {
                    println!("Upcoming runs (next {} hours):", hours);
                    for (time, trigger) in preview {
                        println!("{} : {} ({})", time.to_rfc3339(), trigger.name, trigger.state);
                    }
                }
            }
        },
        Commands::CheckCredentials => {
            let path = &config.credentials.path;
            let creds = wifi_curfew::credentials::load(path)?;
            println!("Credentials OK: {} (admin URL {})", path.display(), creds.admin_url());
        }
    }

    Ok(())
}
