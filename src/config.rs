use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

/// Tunables for a single analysis run. Passed by reference; nothing here is global.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Minimum fraction of values that must parse for a column to be promoted
    /// to Datetime or Numeric. Inclusive.
    pub type_threshold: f64,
    /// Categorical columns with more distinct values than this are flagged.
    pub high_cardinality_threshold: usize,
    pub top_correlations: usize,
    pub max_distribution_charts: usize,
    pub histogram_bins: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            type_threshold: 0.70,
            high_cardinality_threshold: 20,
            top_correlations: 5,
            max_distribution_charts: 3,
            histogram_bins: 30,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.type_threshold > 0.0 && self.type_threshold <= 1.0) {
            anyhow::bail!(
                "type inference threshold must be in (0, 1], got {}",
                self.type_threshold
            );
        }
        if self.histogram_bins == 0 {
            anyhow::bail!("histogram bin count must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub max_file_size: usize,
    pub session_capacity: u64,
    pub session_ttl: Duration,
    pub analysis: AnalysisOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            session_capacity: 64,
            session_ttl: Duration::from_secs(30 * 60),
            analysis: AnalysisOptions::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let analysis_defaults = AnalysisOptions::default();

        let analysis = AnalysisOptions {
            type_threshold: parse_var(&lookup, "TYPE_INFERENCE_THRESHOLD")?
                .unwrap_or(analysis_defaults.type_threshold),
            high_cardinality_threshold: parse_var(&lookup, "HIGH_CARDINALITY_THRESHOLD")?
                .unwrap_or(analysis_defaults.high_cardinality_threshold),
            ..analysis_defaults
        };
        analysis.validate()?;

        let config = Config {
            addr: parse_var(&lookup, "SHEET_INSIGHTS_ADDR")?.unwrap_or(defaults.addr),
            max_file_size: parse_var(&lookup, "MAX_FILE_SIZE")?.unwrap_or(defaults.max_file_size),
            session_capacity: parse_var(&lookup, "SESSION_CAPACITY")?
                .unwrap_or(defaults.session_capacity),
            session_ttl: parse_var::<u64, _>(&lookup, "SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            analysis,
        };

        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        None => Ok(None),
    }
}

pub fn load_config() -> Result<Config> {
    Config::new()
}
