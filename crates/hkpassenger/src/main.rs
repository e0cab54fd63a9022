//! `hkpassenger` - CLI for the passenger flow API
//!
//! Runs the HTTP server and offers a few maintenance commands against the
//! record store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use hkpassenger::cli::{Cli, Command, ConfigCommand, ImportCommand, ServeCommand};
use hkpassenger::{init_logging, server, writer, Config, FlowStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(&config, serve_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Import(import_cmd) => handle_import(&config, &import_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening record store {}", path.display()))
}

async fn handle_serve(config: &Config, cmd: ServeCommand) -> anyhow::Result<()> {
    let addr: SocketAddr = match cmd.bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("invalid bind address: {bind}"))?,
        None => config.bind_addr()?,
    };

    let store: Arc<dyn FlowStore> = Arc::new(open_storage(config)?);
    server::serve(addr, store, config.api).await?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let day_or_dash = |day: Option<chrono::NaiveDate>| {
            day.map_or_else(|| "-".to_string(), |d| d.to_string())
        };
        println!("hkpassenger status");
        println!("------------------");
        println!("Database:      {}", storage.path().display());
        println!("Records:       {}", stats.total_records);
        println!("Dates:         {}", stats.distinct_dates);
        println!("First day:     {}", day_or_dash(stats.first_day));
        println!("Last day:      {}", day_or_dash(stats.last_day));
        println!("Size (bytes):  {}", stats.db_size_bytes);
    }
    Ok(())
}

async fn handle_import(config: &Config, cmd: &ImportCommand) -> anyhow::Result<()> {
    let body = std::fs::read(&cmd.file)
        .with_context(|| format!("reading {}", cmd.file.display()))?;
    let payload = writer::parse_payload(&body)?;

    let storage = open_storage(config)?;
    let report = writer::write_bulk(&storage, payload).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Api]");
                println!(
                    "  Years:              {} - {}",
                    config.api.min_year, config.api.max_year
                );
                println!("  Max range days:     {}", config.api.max_range_days);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
