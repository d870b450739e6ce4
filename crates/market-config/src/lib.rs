//! Configuration module for the marketplace system.
//!
//! This module provides structures and utilities for managing the
//! marketplace configuration. It supports loading configuration from
//! TOML files and provides validation to ensure all required
//! configuration values are properly set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the marketplace.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this marketplace instance.
	pub marketplace: MarketplaceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to a marketplace instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
	/// Unique identifier for this instance, used in log output.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl StorageConfig {
	/// Returns the configuration section for the primary backend.
	///
	/// Backends with no required configuration may omit their section
	/// entirely, so a missing entry reads as an empty table.
	pub fn primary_config(&self) -> toml::Value {
		self.implementations
			.get(&self.primary)
			.cloned()
			.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()))
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server should be started.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to listen on.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

impl Config {
	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file path.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml_str(&raw)
	}

	/// Loads configuration from a file path without blocking the runtime.
	pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		Self::from_toml_str(&raw)
	}

	/// Validates cross-field rules the type system cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.marketplace.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"marketplace.id must not be empty".to_string(),
			));
		}

		if self.storage.primary.trim().is_empty() {
			return Err(ConfigError::Validation(
				"storage.primary must not be empty".to_string(),
			));
		}

		// Backends that require configuration must have their section;
		// the memory backend is allowed to run section-less.
		if self.storage.primary != "memory"
			&& !self
				.storage
				.implementations
				.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"storage.primary '{}' has no [storage.implementations.{}] section",
				self.storage.primary, self.storage.primary
			)));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const FULL: &str = r#"
		[marketplace]
		id = "market-dev"

		[storage]
		primary = "file"

		[storage.implementations.file]
		storage_path = "./data/storage"

		[api]
		host = "0.0.0.0"
		port = 9090
	"#;

	#[test]
	fn parses_full_config() {
		let config = Config::from_toml_str(FULL).unwrap();
		assert_eq!(config.marketplace.id, "market-dev");
		assert_eq!(config.storage.primary, "file");

		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "0.0.0.0");
		assert_eq!(api.port, 9090);
	}

	#[test]
	fn memory_backend_needs_no_section() {
		let config = Config::from_toml_str(
			r#"
			[marketplace]
			id = "m"

			[storage]
			primary = "memory"
		"#,
		)
		.unwrap();
		assert!(config.api.is_none());
		assert!(config.storage.primary_config().as_table().unwrap().is_empty());
	}

	#[test]
	fn rejects_unconfigured_primary() {
		let err = Config::from_toml_str(
			r#"
			[marketplace]
			id = "m"

			[storage]
			primary = "file"
		"#,
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn rejects_empty_id() {
		let err = Config::from_toml_str(
			r#"
			[marketplace]
			id = " "

			[storage]
			primary = "memory"
		"#,
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[tokio::test]
	async fn loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, FULL).unwrap();

		let config = Config::from_file_async(&path).await.unwrap();
		assert_eq!(config.marketplace.id, "market-dev");
	}
}
