// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source. Defaults are applied while building
/// [`TeamboardConfig`](crate::TeamboardConfig), so this layer is empty.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML). A missing file yields an empty
/// layer.
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
}

impl FileSource {
	pub fn system(paths: &PathsConfig) -> Self {
		Self {
			path: paths.system_config_file.clone(),
			precedence: Precedence::SystemFile,
			name: "system-config",
		}
	}

	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
		}
	}

	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Recognised variables: `TEAMBOARD_SERVER_URL`, `TEAMBOARD_LOG_LEVEL`,
/// `TEAMBOARD_LOG_FORMAT`, `TEAMBOARD_REQUEST_TIMEOUT_SECS`,
/// `TEAMBOARD_CACHE_TTL_HOURS` and `TEAMBOARD_DEFAULT_REFRESH_MINUTES`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(layer_from_vars(std::env::vars()))
	}
}

/// Builds a layer from `TEAMBOARD_*` key/value pairs; other keys are ignored.
pub fn layer_from_vars<I>(vars: I) -> ConfigLayer
where
	I: IntoIterator<Item = (String, String)>,
{
	let mut layer = ConfigLayer::default();

	for (key, value) in vars {
		if !key.starts_with("TEAMBOARD_") {
			continue;
		}

		let value = value.trim().to_string();
		if value.is_empty() {
			continue;
		}

		trace!(key = %key, "processing env var");

		match key.as_str() {
			"TEAMBOARD_SERVER_URL" => {
				layer
					.server
					.get_or_insert_with(ServerLayer::default)
					.base_url = Some(value);
			}
			"TEAMBOARD_LOG_LEVEL" => {
				layer
					.logging
					.get_or_insert_with(LoggingLayer::default)
					.level = Some(value);
			}
			"TEAMBOARD_LOG_FORMAT" => {
				layer
					.logging
					.get_or_insert_with(LoggingLayer::default)
					.format = Some(value);
			}
			"TEAMBOARD_REQUEST_TIMEOUT_SECS" => match value.parse() {
				Ok(v) => {
					layer
						.sync
						.get_or_insert_with(SyncLayer::default)
						.request_timeout_secs = Some(v);
				}
				Err(_) => warn!(key = %key, value = %value, "ignoring non-numeric env var"),
			},
			"TEAMBOARD_CACHE_TTL_HOURS" => match value.parse() {
				Ok(v) => {
					layer
						.sync
						.get_or_insert_with(SyncLayer::default)
						.cache_ttl_hours = Some(v);
				}
				Err(_) => warn!(key = %key, value = %value, "ignoring non-numeric env var"),
			},
			"TEAMBOARD_DEFAULT_REFRESH_MINUTES" => match value.parse() {
				Ok(v) => {
					layer
						.sync
						.get_or_insert_with(SyncLayer::default)
						.default_refresh_minutes = Some(v);
				}
				Err(_) => warn!(key = %key, value = %value, "ignoring non-numeric env var"),
			},
			_ => {
				// Unknown TEAMBOARD_ variable, ignore
			}
		}
	}

	layer
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub server_url: Option<String>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	/// Replaces the user config file when set.
	pub config_file: Option<PathBuf>,
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(ref url) = self.overrides.server_url {
			layer
				.server
				.get_or_insert_with(ServerLayer::default)
				.base_url = Some(url.clone());
		}

		if let Some(ref level) = self.overrides.log_level {
			layer
				.logging
				.get_or_insert_with(LoggingLayer::default)
				.level = Some(level.clone());
		}

		if let Some(ref format) = self.overrides.log_format {
			layer
				.logging
				.get_or_insert_with(LoggingLayer::default)
				.format = Some(format.clone());
		}

		Ok(layer)
	}
}
