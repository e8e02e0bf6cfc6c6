use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FoodhallConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Parse a YAML document after environment variable substitution
pub fn parse_config(content: &str) -> Result<FoodhallConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: FoodhallConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> FoodhallConfig {
    FoodhallConfig {
        service: ServiceConfig {
            name: "My Food Hall".to_string(),
            ..ServiceConfig::default()
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            postgres: Some(PostgresConfig {
                url: "${DATABASE_URL}".to_string(),
                max_connections: default_max_connections(),
                acquire_timeout_seconds: default_acquire_timeout_seconds(),
            }),
        },
        ..FoodhallConfig::default()
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &FoodhallConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
