//! backlightctl - ACPI backlight control CLI
//!
//! Drives the backlight driver against a virtual firmware tree described in a
//! JSON fixture, for inspecting level tables, level mapping, fades,
//! persistence and the property surface.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod fixture;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Context;

#[derive(Parser)]
#[command(name = "backlightctl")]
#[command(about = "ACPI backlight control CLI - inspect and drive a simulated backlight panel")]
#[command(version)]
#[command(long_about = "
backlightctl attaches the ACPI backlight driver to a virtual firmware tree and
runs one operation against it. Without --fixture a built-in extended panel is
used.

Levels are on the normalized scale [0, 1024].
Use --json flag for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Firmware tree fixture (JSON)
    #[arg(long, global = true, env = "BACKLIGHTCTL_FIXTURE", value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// File-backed boot-variable store; levels are not kept across runs without it
    #[arg(long, global = true, env = "BACKLIGHTCTL_NVRAM", value_name = "FILE")]
    nvram: Option<PathBuf>,

    /// Panel driver configuration (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the normalized level table and reference indices
    Table,

    /// Map a normalized level to a table index and raw value
    Map {
        /// Level in [0, 1024]
        value: u32,
    },

    /// Request a level through the driver
    Set {
        /// Level in [0, 1024]
        value: u32,
        /// Commit the level so it is persisted
        #[arg(short, long)]
        commit: bool,
    },

    /// Print the tick trace of a fade between two levels
    Fade {
        /// Starting level
        from: u32,
        /// Target level
        to: u32,
    },

    /// Show published properties
    Props {
        /// Write a property before listing, as KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = commands::parse_assignment)]
        assignments: Vec<(String, Value)>,
    },

    /// Attach and report the panel state
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("backlightctl={log_level},acpi_backlight={log_level}"))
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(error::exit_code(&e))
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let ctx = Context::load(
        cli.fixture.as_deref(),
        cli.config.as_deref(),
        cli.nvram.as_deref(),
    )?;

    match &cli.command {
        Commands::Table => output::print_table(&commands::table(&ctx)?, cli.json),
        Commands::Map { value } => output::print_mapping(&commands::map(&ctx, *value)?, cli.json),
        Commands::Set { value, commit } => {
            output::print_set(&commands::set(&ctx, *value, *commit)?, cli.json);
        }
        Commands::Fade { from, to } => {
            output::print_fade(&commands::fade(&ctx, *from, *to)?, cli.json);
        }
        Commands::Props { assignments } => {
            output::print_properties(&commands::props(&ctx, assignments)?, cli.json);
        }
        Commands::Status => output::print_status(&commands::status(&ctx)?, cli.json),
    }
    Ok(())
}
