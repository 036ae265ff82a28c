use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swipe_server::config::{AppConfig, CliConfig, FileConfig};
use swipe_server::server::{self, RequestsLoggingLevel, ServerConfig};
use swipe_server::{
    run_server, CandidatePipeline, CatalogClient, HttpCatalogClient, NullCatalogClient,
    SessionService, SqliteSwipeSessionStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values found there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the swipe session database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the music catalog gateway. Without it discovery returns no candidates.
    #[clap(long)]
    pub catalog_url: Option<String>,

    /// Bearer token sent to the catalog gateway.
    #[clap(long)]
    pub catalog_token: Option<String>,

    /// Timeout in milliseconds for a single catalog call.
    #[clap(long, default_value_t = 3000)]
    pub catalog_timeout_ms: u64,

    /// Minimum delay in milliseconds between two catalog calls.
    #[clap(long, default_value_t = 0)]
    pub catalog_min_interval_ms: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            catalog_url: self.catalog_url.clone(),
            catalog_token: self.catalog_token.clone(),
            catalog_timeout_ms: self.catalog_timeout_ms,
            catalog_min_interval_ms: self.catalog_min_interval_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let catalog: Arc<dyn CatalogClient> = match &config.catalog {
        Some(catalog) => {
            info!("Catalog gateway configured at {}", catalog.base_url);
            Arc::new(HttpCatalogClient::new(
                catalog.base_url.clone(),
                catalog.api_token.clone(),
                catalog.timeout,
                catalog.min_request_interval,
            )?)
        }
        None => {
            warn!("No catalog gateway configured, discovery will return no candidates");
            Arc::new(NullCatalogClient)
        }
    };
    let pipeline = Arc::new(CandidatePipeline::new(catalog, config.pipeline.clone()));

    let db_path = config.swipe_db_path();
    info!("Opening swipe session database at {:?}...", db_path);
    let store = Arc::new(SqliteSwipeSessionStore::new(&db_path)?);
    let sessions = Arc::new(SessionService::new(
        store,
        config.sessions.max_write_attempts,
    ));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        discovery: config.discovery,
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(server_config, pipeline, sessions).await
}
