//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for hie-bridge using clap.

pub mod commands;
pub mod pipeline;

use clap::{Parser, Subcommand};

/// hie-bridge - AMRS to HIE FHIR sync
#[derive(Parser, Debug)]
#[command(name = "hie-bridge")]
#[command(version, about, long_about = None)]
#[command(author = "hie-bridge Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hie-bridge.toml", env = "HIE_BRIDGE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HIE_BRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync the visits closed on the day before a date
    Run(commands::run::RunArgs),

    /// Run the batch every day at the configured time
    Schedule(commands::schedule::ScheduleArgs),

    /// Process FHIR events from a newline-delimited JSON file or stdin
    Consume(commands::consume::ConsumeArgs),

    /// Show ledger statistics and failed visits
    Status(commands::status::StatusArgs),

    /// Remove the failed ledger record of a visit
    Clear(commands::clear::ClearArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
