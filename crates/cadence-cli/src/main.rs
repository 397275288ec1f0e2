use cadence_core::backfill::{BackfillConfig, BackfillEngine, SystemClock};
use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::repository::SqliteRepository;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod cron;
mod http;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::new().unwrap_or_else(|err| {
        eprintln!(
            "{} invalid configuration ({err}); using defaults",
            "Warning:".yellow().bold()
        );
        config::Config::default()
    });

    let cli = cli::Cli::parse();
    if let Err(e) = run(cli, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: config::Config) -> anyhow::Result<()> {
    let timezone = cadence_core::calendar::parse_timezone(&config.timezone)?;
    let pool = db::establish_connection(&config.database_path).await?;
    let repository = SqliteRepository::new(pool);
    let engine = Arc::new(BackfillEngine::new(
        repository,
        Arc::new(SystemClock),
        BackfillConfig {
            timezone,
            enforce_end_date: config.enforce_end_date,
            max_catchup_steps: config.max_catchup_steps,
        },
    ));

    match cli.command {
        cli::Commands::Backfill(cmd) => {
            let result = engine.run_backfill(cmd.dry_run).await?;
            let response = http::BackfillResponse { success: true, result };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        cli::Commands::Serve(cmd) => {
            let listen = cmd.listen.unwrap_or(config.listen_addr);
            tokio::select! {
                res = http::serve(engine.clone(), &listen) => res?,
                _ = cron::run_midnight_loop(engine) => {}
            }
        }
    }

    Ok(())
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!(
                    "{} Invalid timezone: '{}'. Use IANA timezone names like 'America/New_York'",
                    "Error:".style(error_style),
                    tz.yellow()
                );
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
