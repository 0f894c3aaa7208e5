//! extguard: manage per-owner blocked file extensions from the terminal.
//!
//! # Responsibility
//! - Issue and remember the guest owner id.
//! - Map subcommands onto `ExtensionService` calls.
//! - Render business rejections next to the current overview.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extguard_core::db::open_db;
use extguard_core::{
    core_version, init_logging, CoreConfig, ExtensionId, ExtensionOverview, ExtensionService,
    ExtensionServiceError, FixedExtension, FixedToggle, Owner, SqliteExtensionStore, CUSTOM_QUOTA,
};
use log::{info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

const EXIT_OK: u8 = 0;
const EXIT_REJECTED: u8 = 1;

#[derive(Parser)]
#[command(name = "extguard")]
#[command(about = "Manage blocked file extensions per guest owner", long_about = None)]
#[command(version)]
struct Cli {
    /// Owner id to act as (defaults to the remembered guest id)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show fixed extensions with their state and all custom extensions
    Show,

    /// Check or uncheck a fixed extension
    Toggle {
        /// One of bat, cmd, com, cpl, exe, scr, js
        extension: FixedExtension,
    },

    /// Add a custom extension
    Add {
        /// Extension name; dots, whitespace and case are normalized
        name: String,
    },

    /// Delete a custom extension by id
    Delete {
        /// Id shown by `extguard show`
        id: ExtensionId,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = CoreConfig::from_env();
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=ok core_version={}",
        core_version()
    );

    let owner = resolve_owner(cli.owner.as_deref(), &config.owner_file)?;

    if let Some(parent) = config.db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    let outcome = match cli.command {
        Commands::Show => Ok(()),
        Commands::Toggle { extension } => service
            .toggle_fixed(&owner, extension)
            .map(|state| match state {
                FixedToggle::Checked => println!("Checked {extension}"),
                FixedToggle::Unchecked => println!("Unchecked {extension}"),
            }),
        Commands::Add { name } => service
            .add_custom(&owner, &name)
            .map(|record| println!("Added {} (id {})", record.name, record.id)),
        Commands::Delete { id } => service.delete_custom(&owner, id),
    };

    let status = report(
        &owner,
        outcome,
        || service.overview(&owner),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    Ok(ExitCode::from(status))
}

/// Writes a rejection message (if any) followed by the current overview and
/// returns the process status.
///
/// Infrastructure failures are returned as errors and nothing is rendered.
fn report(
    owner: &Owner,
    outcome: Result<(), ExtensionServiceError>,
    load_overview: impl FnOnce() -> Result<ExtensionOverview, ExtensionServiceError>,
    out: &mut impl Write,
    err_out: &mut impl Write,
) -> Result<u8> {
    let status = match outcome {
        Ok(()) => EXIT_OK,
        Err(err) if err.is_user_facing() => {
            writeln!(err_out, "{err}")?;
            EXIT_REJECTED
        }
        Err(err) => return Err(anyhow_from_service(err)),
    };

    let overview = load_overview().map_err(anyhow_from_service)?;
    render_overview(out, owner, &overview)?;
    Ok(status)
}

/// Returns the explicit owner, else the remembered one, else a new guest id
/// that is persisted for later runs.
fn resolve_owner(explicit: Option<&str>, owner_file: &Path) -> Result<Owner> {
    if let Some(raw) = explicit {
        return Ok(Owner::parse(raw)?);
    }

    if owner_file.exists() {
        let raw = fs::read_to_string(owner_file)
            .with_context(|| format!("failed to read {}", owner_file.display()))?;
        // The file holds one token; surrounding whitespace is not part of it.
        match Owner::parse(raw.trim()) {
            Ok(owner) => return Ok(owner),
            Err(err) => warn!("event=owner_load module=cli status=error error={err}"),
        }
    }

    let owner = Owner::generate();
    if let Some(parent) = owner_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(owner_file, owner.as_str())
        .with_context(|| format!("failed to write {}", owner_file.display()))?;
    info!("event=owner_issue module=cli status=ok");
    Ok(owner)
}

fn anyhow_from_service(err: ExtensionServiceError) -> anyhow::Error {
    anyhow::Error::new(err).context("extension store failure")
}

fn render_overview(
    out: &mut impl Write,
    owner: &Owner,
    overview: &ExtensionOverview,
) -> io::Result<()> {
    writeln!(out, "Owner: {owner}")?;
    writeln!(out)?;
    writeln!(out, "Fixed extensions:")?;
    for state in &overview.fixed {
        let mark = if state.checked { "x" } else { " " };
        writeln!(out, "  [{mark}] {}", state.extension)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Custom extensions ({}/{CUSTOM_QUOTA}):",
        overview.custom.len()
    )?;
    if overview.custom.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for item in &overview.custom {
        writeln!(out, "  {:>6}  {}", item.id, item.name)?;
    }
    Ok(())
}
