mod file_config;

pub use file_config::{FileConfig, PipelineConfig, SessionsConfig};

use crate::pipeline::PipelineSettings;
use crate::server::RequestsLoggingLevel;
use crate::swipe_session::DEFAULT_MAX_WRITE_ATTEMPTS;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub catalog_url: Option<String>,
    pub catalog_token: Option<String>,
    pub catalog_timeout_ms: u64,
    pub catalog_min_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    // Catalog gateway, absent means no catalog
    pub catalog: Option<CatalogSettings>,

    // Feature configs (with defaults)
    pub pipeline: PipelineSettings,
    pub discovery: DiscoverySettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    pub min_request_interval: Duration,
}

/// Largest accepted `pipeline.max_limit`.
pub const MAX_DISCOVERY_LIMIT: usize = 500;

/// Bounds on the number of candidates a single discovery request returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub max_write_attempts: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let catalog_timeout_ms = file.catalog_timeout_ms.unwrap_or(cli.catalog_timeout_ms);
        if catalog_timeout_ms == 0 {
            bail!("catalog_timeout_ms must be greater than 0");
        }
        let catalog_min_interval_ms = file
            .catalog_min_interval_ms
            .unwrap_or(cli.catalog_min_interval_ms);
        let catalog = file
            .catalog_url
            .or_else(|| cli.catalog_url.clone())
            .map(|base_url| CatalogSettings {
                base_url,
                api_token: file.catalog_token.or_else(|| cli.catalog_token.clone()),
                timeout: Duration::from_millis(catalog_timeout_ms),
                min_request_interval: Duration::from_millis(catalog_min_interval_ms),
            });

        // Pipeline settings - merge file config with defaults
        let pipeline_file = file.pipeline.unwrap_or_default();
        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            call_timeout: Duration::from_millis(catalog_timeout_ms),
            generate_budget: pipeline_file
                .generate_budget_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.generate_budget),
            oversample_factor: pipeline_file
                .oversample_factor
                .unwrap_or(defaults.oversample_factor),
            expand_similar_artists: pipeline_file
                .expand_similar_artists
                .unwrap_or(defaults.expand_similar_artists),
            similar_artists_per_seed: pipeline_file
                .similar_artists_per_seed
                .unwrap_or(defaults.similar_artists_per_seed),
            top_tracks_per_similar_artist: pipeline_file
                .top_tracks_per_similar_artist
                .unwrap_or(defaults.top_tracks_per_similar_artist),
            fallback_top_artists: pipeline_file
                .fallback_top_artists
                .unwrap_or(defaults.fallback_top_artists),
        };
        if pipeline.oversample_factor == 0 {
            bail!("pipeline.oversample_factor must be at least 1");
        }
        if pipeline.generate_budget.is_zero() {
            bail!("pipeline.generate_budget_ms must be greater than 0");
        }

        let discovery_defaults = DiscoverySettings::default();
        let discovery = DiscoverySettings {
            default_limit: pipeline_file
                .default_limit
                .unwrap_or(discovery_defaults.default_limit),
            max_limit: pipeline_file
                .max_limit
                .unwrap_or(discovery_defaults.max_limit),
        };
        if discovery.max_limit > MAX_DISCOVERY_LIMIT {
            bail!(
                "pipeline.max_limit must not exceed {}",
                MAX_DISCOVERY_LIMIT
            );
        }
        if discovery.default_limit == 0 || discovery.default_limit > discovery.max_limit {
            bail!(
                "pipeline.default_limit must be between 1 and max_limit ({})",
                discovery.max_limit
            );
        }

        let sessions_file = file.sessions.unwrap_or_default();
        let sessions = SessionSettings {
            max_write_attempts: sessions_file
                .max_write_attempts
                .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS),
        };
        if sessions.max_write_attempts == 0 {
            bail!("sessions.max_write_attempts must be at least 1");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            catalog,
            pipeline,
            discovery,
            sessions,
        })
    }

    pub fn swipe_db_path(&self) -> PathBuf {
        self.db_dir.join("swipe.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
