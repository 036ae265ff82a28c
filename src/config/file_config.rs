use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub catalog_url: Option<String>,
    pub catalog_token: Option<String>,
    pub catalog_timeout_ms: Option<u64>,
    pub catalog_min_interval_ms: Option<u64>,

    // Feature configs
    pub pipeline: Option<PipelineConfig>,
    pub sessions: Option<SessionsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub generate_budget_ms: Option<u64>,
    pub oversample_factor: Option<usize>,
    pub expand_similar_artists: Option<bool>,
    pub similar_artists_per_seed: Option<usize>,
    pub top_tracks_per_similar_artist: Option<usize>,
    pub fallback_top_artists: Option<usize>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionsConfig {
    pub max_write_attempts: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
