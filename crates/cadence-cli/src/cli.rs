use clap::{Parser, Subcommand};

/// Recurring-task scheduling engine for the Cadence CRM
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one backfill pass and print the result as JSON
    Backfill(BackfillCommand),
    /// Serve the admin HTTP trigger and the midnight-local cron
    Serve(ServeCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct BackfillCommand {
    /// Compute and report what a run would do without writing anything
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeCommand {
    /// Listen address for the admin HTTP trigger (overrides config)
    #[clap(long)]
    pub listen: Option<String>,
}
