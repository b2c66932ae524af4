use std::env;
use std::str::FromStr;

use serde::Deserialize;

use super::options::ExchangeOptions;
use crate::engine::codec::Compression;
use crate::engine::core::memory::MemoryBackend;
use crate::engine::errors::{ExchangeError, Result};

pub const CONFIG_PATH_ENV: &str = "BATCH_EXCHANGE_CONFIG";
pub const DEFAULT_CONFIG_NAME: &str = "exchange";
pub const ENV_PREFIX: &str = "EXCHANGE";

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSettings {
    /// Rows per batch; zero or negative means one unbounded batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Vector capacity used when the batch size is unbounded.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    #[serde(default)]
    pub memory_backend: MemoryBackend,
    /// Byte limit of each session arena when `memory_backend = "arena"`.
    #[serde(default = "default_arena_limit_bytes")]
    pub arena_limit_bytes: usize,
    #[serde(default)]
    pub compression: Compression,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file; no file output when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default = "default_stdout_level")]
    pub stdout_level: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

fn default_batch_size() -> i64 {
    10_000
}

fn default_initial_capacity() -> usize {
    1024
}

fn default_arena_limit_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_stdout_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            stdout_level: default_stdout_level(),
            file_level: default_file_level(),
        }
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            initial_capacity: default_initial_capacity(),
            memory_backend: MemoryBackend::default(),
            arena_limit_bytes: default_arena_limit_bytes(),
            compression: Compression::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExchangeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(ExchangeError::Config(
                "initial_capacity must be greater than zero".into(),
            ));
        }
        if self.memory_backend == MemoryBackend::Arena && self.arena_limit_bytes == 0 {
            return Err(ExchangeError::Config(
                "arena_limit_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Copy of these settings with per-query options applied on top.
    ///
    /// Recognised keys (case-insensitive): `batchSize`, `initialCapacity`,
    /// `compression`, `memoryBackend`, `arenaLimitBytes`.
    pub fn with_options(&self, options: &ExchangeOptions) -> Result<Self> {
        let mut settings = self.clone();
        settings.batch_size = options.get_long("batchSize", settings.batch_size)?;
        let initial_capacity =
            options.get_long("initialCapacity", settings.initial_capacity as i64)?;
        settings.initial_capacity = non_negative("initialCapacity", initial_capacity)?;
        let arena_limit_bytes =
            options.get_long("arenaLimitBytes", settings.arena_limit_bytes as i64)?;
        settings.arena_limit_bytes = non_negative("arenaLimitBytes", arena_limit_bytes)?;
        if let Some(value) = options.get("compression") {
            settings.compression = Compression::from_str(value)?;
        }
        if let Some(value) = options.get("memoryBackend") {
            settings.memory_backend = parse_backend(value)?;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn non_negative(key: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ExchangeError::Config(format!("option '{key}' must not be negative, got {value}"))
    })
}

fn parse_backend(value: &str) -> Result<MemoryBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "heap" => Ok(MemoryBackend::Heap),
        "arena" => Ok(MemoryBackend::Arena),
        other => Err(ExchangeError::Config(format!(
            "unknown memory backend '{other}'"
        ))),
    }
}

/// Loads settings from the file named by `BATCH_EXCHANGE_CONFIG` (default
/// `exchange`, optional) overlaid with `EXCHANGE__*` environment variables.
pub fn load_settings() -> Result<ExchangeSettings> {
    let config_path =
        env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_NAME.to_string());
    load_settings_from(&config_path, ENV_PREFIX)
}

pub fn load_settings_from(config_path: &str, env_prefix: &str) -> Result<ExchangeSettings> {
    let settings: ExchangeSettings = config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
