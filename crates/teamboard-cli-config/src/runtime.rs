// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fully resolved runtime configuration.

use std::time::Duration;

use teamboard_common_http::HttpSettings;
use teamboard_sync::SyncConfig;
use tracing::warn;

use crate::layer::{ConfigLayer, LoggingLayer, ServerLayer, SyncLayer};
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

#[derive(Debug, Clone)]
pub struct TeamboardConfig {
	pub server: ServerConfig,
	pub sync: SyncSettings,
	pub logging: LoggingConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub base_url: String,
}

/// Engine tunables with every default applied.
#[derive(Debug, Clone)]
pub struct SyncSettings {
	pub request_timeout: Duration,
	pub connect_timeout: Duration,
	pub cache_ttl: Duration,
	pub sweep_interval: Duration,
	pub resolve_timeout: Duration,
	pub catalog_timeout: Duration,
	pub max_document_bytes: usize,
	pub max_items: usize,
	pub default_refresh_interval: Duration,
	pub max_concurrent_requests: usize,
	pub max_requests_per_host: usize,
	pub max_idle_per_host: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl TeamboardConfig {
	/// Apply defaults to a merged layer.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			server: build_server_config(layer.server),
			sync: build_sync_settings(layer.sync),
			logging: build_logging_config(layer.logging),
			paths,
		})
	}

	/// The engine configuration these settings describe.
	pub fn sync_config(&self) -> SyncConfig {
		let s = &self.sync;
		SyncConfig {
			base_url: self.server.base_url.clone(),
			http: HttpSettings {
				connect_timeout: s.connect_timeout,
				request_timeout: s.request_timeout,
				max_idle_per_host: s.max_idle_per_host,
				max_concurrent_requests: s.max_concurrent_requests,
				max_requests_per_host: s.max_requests_per_host,
			},
			cache_ttl: s.cache_ttl,
			sweep_interval: s.sweep_interval,
			resolve_timeout: s.resolve_timeout,
			catalog_timeout: s.catalog_timeout,
			max_document_bytes: s.max_document_bytes,
			max_items: s.max_items,
			default_refresh_interval: s.default_refresh_interval,
		}
	}
}

fn build_server_config(layer: Option<ServerLayer>) -> ServerConfig {
	let layer = layer.unwrap_or_default();
	ServerConfig {
		base_url: layer
			.base_url
			.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
	}
}

fn build_sync_settings(layer: Option<SyncLayer>) -> SyncSettings {
	let layer = layer.unwrap_or_default();
	let engine = SyncConfig::default();
	let http = HttpSettings::default();

	SyncSettings {
		request_timeout: layer
			.request_timeout_secs
			.map(Duration::from_secs)
			.unwrap_or(http.request_timeout),
		connect_timeout: layer
			.connect_timeout_secs
			.map(Duration::from_secs)
			.unwrap_or(http.connect_timeout),
		cache_ttl: layer
			.cache_ttl_hours
			.map(|h| Duration::from_secs(h * 60 * 60))
			.unwrap_or(engine.cache_ttl),
		sweep_interval: layer
			.sweep_interval_secs
			.map(Duration::from_secs)
			.unwrap_or(engine.sweep_interval),
		resolve_timeout: layer
			.resolve_timeout_secs
			.map(Duration::from_secs)
			.unwrap_or(engine.resolve_timeout),
		catalog_timeout: layer
			.catalog_timeout_ms
			.map(Duration::from_millis)
			.unwrap_or(engine.catalog_timeout),
		max_document_bytes: layer.max_document_bytes.unwrap_or(engine.max_document_bytes),
		max_items: layer.max_items.unwrap_or(engine.max_items),
		default_refresh_interval: layer
			.default_refresh_minutes
			.map(|m| Duration::from_secs(m * 60))
			.unwrap_or(engine.default_refresh_interval),
		max_concurrent_requests: layer
			.max_concurrent_requests
			.unwrap_or(http.max_concurrent_requests),
		max_requests_per_host: layer
			.max_requests_per_host
			.unwrap_or(http.max_requests_per_host),
		max_idle_per_host: layer.max_idle_per_host.unwrap_or(http.max_idle_per_host),
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> LoggingConfig {
	let layer = layer.unwrap_or_default();
	LoggingConfig {
		level: parse_log_level(layer.level.as_deref()),
		format: parse_log_format(layer.format.as_deref()),
	}
}

fn parse_log_level(s: Option<&str>) -> LogLevel {
	match s.map(str::to_ascii_lowercase).as_deref() {
		Some("error") => LogLevel::Error,
		Some("warn") => LogLevel::Warn,
		Some("info") | None => LogLevel::Info,
		Some("debug") => LogLevel::Debug,
		Some("trace") => LogLevel::Trace,
		Some(other) => {
			warn!(level = %other, "unknown log level, using info");
			LogLevel::Info
		}
	}
}

fn parse_log_format(s: Option<&str>) -> LogFormat {
	match s {
		Some("json") => LogFormat::Json,
		Some("compact") => LogFormat::Compact,
		_ => LogFormat::Pretty,
	}
}
