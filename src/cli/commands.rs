//! CLI command implementations

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{ApiServer, AppState};
use crate::config::AppConfig;
use crate::geo::{Geocoder, StaticGeocoder};
use crate::query::QueryPlan;
use crate::seed;
use crate::store::{DocumentStore, MemoryStore};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::Translate { query } => translate(&query),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campdir=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build handler state: empty store, geocoder table, then fixtures
pub fn build_state(config: &AppConfig) -> CliResult<AppState> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

    let geocoder: Arc<dyn Geocoder> = match &config.geocode_table {
        Some(path) => {
            let table = StaticGeocoder::load(path)
                .map_err(|e| CliError::config_error(format!("geocode_table: {}", e)))?;
            info!(path = %path.display(), zipcodes = table.len(), "geocode table loaded");
            Arc::new(table)
        }
        None => Arc::new(StaticGeocoder::new()),
    };

    if let Some(dir) = &config.seed_dir {
        seed::import_dir(dir, store.as_ref(), geocoder.as_ref())?;
    }

    Ok(AppState::from_config(config, store, geocoder))
}

/// Load configuration, seed the store and serve HTTP until stopped
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    init_tracing();

    let mut config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(port) = port {
        config.port = port;
    }

    let state = build_state(&config)?;
    let server = ApiServer::new(&config, state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Split `a=1&b[gt]=2` into parameters, decoded the way the HTTP query
/// extractor decodes them (`+` is a space, then percent escapes)
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Print the plan a list query would run
pub fn translate(query: &str) -> CliResult<()> {
    let plan = QueryPlan::translate(&parse_query_string(query))?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
