// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Default configuration file template.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::ConfigError;

/// Written to the user config path on first run. Every value is commented
/// out so the built-in defaults stay authoritative until edited.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Teamboard configuration
#
# Precedence (lowest to highest): built-in defaults, /etc/teamboard/config.toml,
# this file, TEAMBOARD_* environment variables, command line flags.

[server]
# Base URL of the team board backend. Keep the trailing slash.
# base_url = "http://localhost:8080/"

[sync]
# Whole-request and connect timeouts, in seconds
# request_timeout_secs = 15
# connect_timeout_secs = 10

# Idle time before an unwatched team's cached items are dropped
# cache_ttl_hours = 48
# sweep_interval_secs = 3600

# Bounded waits for name resolution and item catalog lookups
# resolve_timeout_secs = 5
# catalog_timeout_ms = 500

# Limits applied to item list documents
# max_document_bytes = 1048576
# max_items = 500

# Auto-refresh period for teams that do not set one. 0 disables polling.
# default_refresh_minutes = 5

# Outbound HTTP concurrency
# max_concurrent_requests = 64
# max_requests_per_host = 5
# max_idle_per_host = 8

[logging]
# One of: error, warn, info, debug, trace
# level = "info"

# One of: pretty, compact, json
# format = "pretty"
"#;

/// Ensure the config directory exists and create a default config file if none exists.
///
/// Returns `true` if a new config file was created, `false` if one already existed.
pub fn ensure_default_config(config_file_path: &Path) -> Result<bool, ConfigError> {
	if config_file_path.exists() {
		debug!(path = %config_file_path.display(), "config file already exists");
		return Ok(false);
	}

	if let Some(parent) = config_file_path.parent() {
		if !parent.exists() {
			debug!(path = %parent.display(), "creating config directory");
			fs::create_dir_all(parent)?;
		}
	}

	info!(path = %config_file_path.display(), "creating default config file");
	fs::write(config_file_path, DEFAULT_CONFIG_TEMPLATE)?;

	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_default_template_parses_to_empty_sections() {
		let layer: crate::layer::ConfigLayer = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
		assert!(layer.server.unwrap().base_url.is_none());
		assert!(layer.sync.unwrap().max_items.is_none());
	}

	#[test]
	fn test_ensure_default_config_creates_file() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("teamboard/config.toml");

		let created = ensure_default_config(&config_path).unwrap();
		assert!(created);

		let contents = fs::read_to_string(&config_path).unwrap();
		assert!(contents.contains("[sync]"));
		assert!(contents.contains("default_refresh_minutes"));
	}

	#[test]
	fn test_ensure_default_config_does_not_overwrite() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		fs::write(&config_path, "# existing config\n").unwrap();

		let created = ensure_default_config(&config_path).unwrap();
		assert!(!created);
		assert_eq!(fs::read_to_string(&config_path).unwrap(), "# existing config\n");
	}
}
