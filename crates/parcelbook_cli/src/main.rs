//! CLI probe over `parcelbook_core`.
//!
//! # Responsibility
//! - Verify core crate linkage and storage bootstrap from a shell.
//! - List an owner's properties and parcels read-only.

use clap::{Parser, Subcommand};
use log::error;
use parcelbook_core::{
    init_logging, open_db_with, CoreConfig, ParcelService, PropertyService,
    SqliteParcelRepository, SqlitePropertyRepository, SqliteUnitOfWork,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "parcelbook", version, about = "Property and parcel store probe")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core ping and version.
    Ping,
    /// List the owner's properties.
    Properties {
        #[arg(long)]
        owner: Uuid,
    },
    /// List the parcels of one property.
    Parcels {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        property: Uuid,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let cancel = CancellationToken::new();
    match cli.command {
        Command::Ping => {
            println!("parcelbook_core ping={}", parcelbook_core::ping());
            println!("parcelbook_core version={}", parcelbook_core::core_version());
        }
        Command::Properties { owner } => {
            let conn = open_store(cli.config.as_deref())?;
            let repo = SqlitePropertyRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let service = PropertyService::new(repo, SqliteUnitOfWork::new(&conn));
            let properties = service.list(owner, &cancel).map_err(|err| err.to_string())?;
            for property in properties {
                println!(
                    "{} {} {}/{} active={}",
                    property.id, property.name, property.city, property.state, property.is_active
                );
            }
        }
        Command::Parcels { owner, property } => {
            let conn = open_store(cli.config.as_deref())?;
            let parcels = SqliteParcelRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let properties =
                SqlitePropertyRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let service = ParcelService::new(parcels, properties, SqliteUnitOfWork::new(&conn));
            let parcels = service
                .list_by_property(owner, property, &cancel)
                .map_err(|err| err.to_string())?;
            for parcel in parcels {
                println!(
                    "{} {} {} area_ha={} crop={} status={} points={}",
                    parcel.id,
                    parcel.code,
                    parcel.name,
                    parcel.area_hectares,
                    parcel.crop_label,
                    parcel.status.as_str(),
                    parcel.boundary.len()
                );
            }
        }
    }
    Ok(())
}

/// Loads configuration, starts logging and opens the configured database.
fn open_store(config_path: Option<&Path>) -> Result<Connection, String> {
    let config = load_config(config_path)?;
    init_logging(&config.logging)?;
    open_db_with(&config.database).map_err(|err| {
        error!("event=cli_open module=cli status=error error={}", err);
        err.to_string()
    })
}

fn load_config(path: Option<&Path>) -> Result<CoreConfig, String> {
    let config = match path {
        Some(path) => CoreConfig::load(path),
        None => {
            let mut config = CoreConfig::default();
            config.apply_env_overrides().map(|()| config)
        }
    };
    config.map_err(|err| err.to_string())
}
