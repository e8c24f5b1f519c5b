//! Cora application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize tracing (stderr, so logs never mix with chat output)
//! 3. Build the HTTP client, token providers, backend and warehouse
//! 4. Run the selected command, the interactive chat by default

mod cli;
mod render;
mod repl;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use cora_backend::{
    build_http_client, token_provider_from_config, Backend, BackendClient, BackendWarehouse,
    BigQueryWarehouse, MetadataTokenProvider, TokenProvider, Warehouse,
};
use cora_chat::{ChatOrchestrator, Transcript, Turn};
use cora_core::config::{AuthProvider, DisplayConfig, WarehouseMode};
use cora_core::CoraConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{join_question, CliArgs, Command};
use crate::render::{render_turn, write_charts};
use crate::repl::{parse_input, Input, HELP};

/// Select where generated SQL runs.
///
/// BigQuery needs an OAuth access token rather than the backend's identity
/// token; on the metadata provider that is a different metadata path. Other
/// providers are used as configured.
fn build_warehouse(
    config: &CoraConfig,
    http: reqwest::Client,
    backend: Arc<dyn Backend>,
) -> Arc<dyn Warehouse> {
    match config.warehouse.mode {
        WarehouseMode::Backend => Arc::new(BackendWarehouse::new(backend)),
        WarehouseMode::Bigquery => {
            let tokens: Arc<dyn TokenProvider> = match config.auth.provider {
                AuthProvider::Metadata => Arc::new(MetadataTokenProvider::access(
                    http.clone(),
                    config.auth.metadata_url.clone(),
                )),
                _ => token_provider_from_config(&config.auth, http.clone()),
            };
            Arc::new(BigQueryWarehouse::from_config(config, http, tokens))
        }
    }
}

/// Print a turn and, when enabled, write its charts.
fn show_turn(turn: &Turn, display: &DisplayConfig) {
    println!("{}\n", render_turn(turn, display.max_table_rows));

    if !display.show_charts {
        return;
    }
    if let Some(spec) = turn.charts() {
        let stem = turn.created_at().format("%Y%m%dT%H%M%S%3f").to_string();
        match write_charts(Path::new(&display.chart_dir), &stem, spec) {
            Ok(paths) => {
                for path in paths {
                    println!("chart: {}", path.display());
                }
            }
            Err(e) => {
                let dir = &display.chart_dir;
                tracing::warn!(dir = %dir, error = %e, "Failed to write charts")
            }
        }
    }
}

async fn run_chat(
    orchestrator: &ChatOrchestrator,
    display: &DisplayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut transcript = Transcript::new();
    tracing::info!(session = %transcript.session_id(), "Chat session started");
    println!(
        "Cora v{} - asking about '{}'. Type /help for commands.\n",
        env!("CARGO_PKG_VERSION"),
        orchestrator.database()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => println!("{}\n", HELP),
            Input::Question(question) => match orchestrator.submit(&mut transcript, &question).await {
                Ok(turn) => show_turn(turn, display),
                Err(e) => println!("cora> {}\n", e),
            },
            Input::Good => match orchestrator.confirm_last_answer(&transcript).await {
                Ok(()) => println!("cora> Thanks! I'll remember that query.\n"),
                Err(e) => println!("cora> {}\n", e),
            },
            Input::Explain(question) => match orchestrator.explain(&question).await {
                Ok(answer) => println!("cora> {}\n", answer),
                Err(e) => println!("cora> {}\n", e),
            },
            Input::Suggest => match orchestrator.suggestions().await {
                Ok(questions) => {
                    println!("cora> You could ask:");
                    for q in questions {
                        println!("  - {}", q);
                    }
                    println!();
                }
                Err(e) => println!("cora> {}\n", e),
            },
            Input::Export(path) => match transcript.export(&path) {
                Ok(()) => println!("cora> Transcript saved to {}\n", path.display()),
                Err(e) => println!("cora> {}\n", e),
            },
            Input::Invalid(msg) => println!("cora> {}. Type /help for commands.\n", msg),
        }
    }

    tracing::info!(turns = transcript.len(), "Chat session ended");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Loaded before tracing since it supplies the log level, so
    // loading reports through `main` once the subscriber is up.
    let config_file = args.resolve_config_path();
    let config = CoraConfig::load(&config_file)?;

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(args.resolve_log_level(&config))
            }),
        )
        .init();

    tracing::info!("Starting Cora v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Backend and warehouse.
    let http = build_http_client()?;
    let tokens = token_provider_from_config(&config.auth, http.clone());
    tracing::info!(provider = tokens.name(), "Identity provider ready");

    let backend: Arc<dyn Backend> =
        Arc::new(BackendClient::from_config(&config, http.clone(), tokens));
    let warehouse = build_warehouse(&config, http, Arc::clone(&backend));
    tracing::info!(warehouse = warehouse.name(), "Warehouse ready");

    let database = args.resolve_database(&config);
    let orchestrator = ChatOrchestrator::new(Arc::clone(&backend), warehouse, database);

    match args.command() {
        Command::Chat => run_chat(&orchestrator, &config.display).await?,
        Command::Ask { question } => {
            let mut transcript = Transcript::new();
            orchestrator
                .submit(&mut transcript, &join_question(&question))
                .await?;
            for turn in transcript.all() {
                show_turn(turn, &config.display);
            }
        }
        Command::Databases => {
            for database in backend.list_databases().await? {
                println!("{}", database);
            }
        }
        Command::Suggest => {
            for question in orchestrator.suggestions().await? {
                println!("{}", question);
            }
        }
        Command::Explain { question } => {
            println!("{}", orchestrator.explain(&join_question(&question)).await?);
        }
    }

    Ok(())
}
