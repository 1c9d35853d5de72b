// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;
use url::Url;

use crate::runtime::TeamboardConfig;
use crate::ConfigError;

/// Validate the configuration.
///
/// Returns Ok(()) if valid, or a [`ConfigError`] naming the offending field.
pub fn validate_config(config: &TeamboardConfig) -> Result<(), ConfigError> {
	validate_server(config)?;
	validate_sync(config)?;
	Ok(())
}

fn validate_server(config: &TeamboardConfig) -> Result<(), ConfigError> {
	let raw = &config.server.base_url;
	let url = Url::parse(raw)
		.map_err(|e| ConfigError::invalid_value("server.base_url", e.to_string()))?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::invalid_value(
			"server.base_url",
			format!("unsupported scheme {}", url.scheme()),
		));
	}
	if !url.path().ends_with('/') {
		warn!(
			base_url = %raw,
			"server.base_url has no trailing slash, endpoints are appended to its last segment"
		);
	}
	Ok(())
}

fn validate_sync(config: &TeamboardConfig) -> Result<(), ConfigError> {
	let sync = &config.sync;

	let non_zero = [
		("sync.request_timeout_secs", sync.request_timeout.is_zero()),
		("sync.connect_timeout_secs", sync.connect_timeout.is_zero()),
		("sync.cache_ttl_hours", sync.cache_ttl.is_zero()),
		("sync.sweep_interval_secs", sync.sweep_interval.is_zero()),
		("sync.resolve_timeout_secs", sync.resolve_timeout.is_zero()),
		("sync.max_document_bytes", sync.max_document_bytes == 0),
		("sync.max_items", sync.max_items == 0),
		("sync.max_concurrent_requests", sync.max_concurrent_requests == 0),
		("sync.max_requests_per_host", sync.max_requests_per_host == 0),
	];
	for (field, is_zero) in non_zero {
		if is_zero {
			return Err(ConfigError::invalid_value(field, "must be greater than zero"));
		}
	}

	if sync.max_requests_per_host > sync.max_concurrent_requests {
		return Err(ConfigError::validation(format!(
			"sync.max_requests_per_host ({}) exceeds sync.max_concurrent_requests ({})",
			sync.max_requests_per_host, sync.max_concurrent_requests
		)));
	}

	if sync.default_refresh_interval.is_zero() {
		warn!("sync.default_refresh_minutes is 0, teams without their own interval are not auto-refreshed");
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layer::ConfigLayer;
	use crate::paths::PathsConfig;

	fn config_from(toml_src: &str) -> TeamboardConfig {
		let layer: ConfigLayer = toml::from_str(toml_src).unwrap();
		TeamboardConfig::from_layer(layer, PathsConfig::default()).unwrap()
	}

	#[test]
	fn test_defaults_are_valid() {
		assert!(validate_config(&config_from("")).is_ok());
	}

	#[test]
	fn test_rejects_bad_base_url() {
		let config = config_from("[server]\nbase_url = \"not a url\"");
		assert!(matches!(
			validate_config(&config),
			Err(ConfigError::InvalidValue { field, .. }) if field == "server.base_url"
		));

		let config = config_from("[server]\nbase_url = \"ftp://example.com/\"");
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_rejects_zero_limits() {
		let config = config_from("[sync]\nmax_items = 0");
		assert!(matches!(
			validate_config(&config),
			Err(ConfigError::InvalidValue { field, .. }) if field == "sync.max_items"
		));
	}

	#[test]
	fn test_rejects_per_host_above_total() {
		let config = config_from("[sync]\nmax_concurrent_requests = 4\nmax_requests_per_host = 8");
		assert!(matches!(validate_config(&config), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_zero_refresh_is_allowed() {
		let config = config_from("[sync]\ndefault_refresh_minutes = 0");
		assert!(validate_config(&config).is_ok());
	}
}
