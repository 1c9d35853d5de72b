// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Engine configuration.

use std::time::Duration;

use teamboard_common_http::HttpSettings;

/// Maximum size of an item-list document; larger input is truncated.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Maximum number of items produced from one document.
pub const MAX_ITEMS: usize = 500;

/// Idle time after which an unlistened cache entry is evicted.
pub const CACHE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Tunables for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Backend base URL, e.g. `https://board.example.com/api/`.
	pub base_url: String,
	pub http: HttpSettings,
	pub cache_ttl: Duration,
	/// Period of the cache eviction sweep.
	pub sweep_interval: Duration,
	/// Bounded wait for canonical name resolution before falling back to the
	/// reported name.
	pub resolve_timeout: Duration,
	/// Bounded wait for a single item-catalog lookup.
	pub catalog_timeout: Duration,
	pub max_document_bytes: usize,
	pub max_items: usize,
	/// Auto-refresh period used when a team record does not set one.
	pub default_refresh_interval: Duration,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:8080/".to_string(),
			http: HttpSettings::default(),
			cache_ttl: CACHE_TTL,
			sweep_interval: Duration::from_secs(60 * 60),
			resolve_timeout: Duration::from_secs(5),
			catalog_timeout: Duration::from_millis(500),
			max_document_bytes: MAX_DOCUMENT_BYTES,
			max_items: MAX_ITEMS,
			default_refresh_interval: Duration::from_secs(5 * 60),
		}
	}
}

impl SyncConfig {
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Resolves a team's refresh period: a positive record value wins,
	/// otherwise the configured default. A zero result disables polling.
	pub fn refresh_interval_for(&self, record_minutes: u32) -> Duration {
		if record_minutes > 0 {
			Duration::from_secs(u64::from(record_minutes) * 60)
		} else {
			self.default_refresh_interval
		}
	}
}
