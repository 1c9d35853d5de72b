// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub server: Option<ServerLayer>,
	#[serde(default)]
	pub sync: Option<SyncLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerLayer {
	#[serde(default)]
	pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncLayer {
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub connect_timeout_secs: Option<u64>,
	#[serde(default)]
	pub cache_ttl_hours: Option<u64>,
	#[serde(default)]
	pub sweep_interval_secs: Option<u64>,
	#[serde(default)]
	pub resolve_timeout_secs: Option<u64>,
	#[serde(default)]
	pub catalog_timeout_ms: Option<u64>,
	#[serde(default)]
	pub max_document_bytes: Option<usize>,
	#[serde(default)]
	pub max_items: Option<usize>,
	#[serde(default)]
	pub default_refresh_minutes: Option<u64>,
	#[serde(default)]
	pub max_concurrent_requests: Option<usize>,
	#[serde(default)]
	pub max_requests_per_host: Option<usize>,
	#[serde(default)]
	pub max_idle_per_host: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer on top of this one. Values set in `other` win.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.server, other.server, ServerLayer::merge);
		merge_option(&mut self.sync, other.sync, SyncLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn take<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl ServerLayer {
	fn merge(&mut self, other: ServerLayer) {
		take(&mut self.base_url, other.base_url);
	}
}

impl SyncLayer {
	fn merge(&mut self, other: SyncLayer) {
		take(&mut self.request_timeout_secs, other.request_timeout_secs);
		take(&mut self.connect_timeout_secs, other.connect_timeout_secs);
		take(&mut self.cache_ttl_hours, other.cache_ttl_hours);
		take(&mut self.sweep_interval_secs, other.sweep_interval_secs);
		take(&mut self.resolve_timeout_secs, other.resolve_timeout_secs);
		take(&mut self.catalog_timeout_ms, other.catalog_timeout_ms);
		take(&mut self.max_document_bytes, other.max_document_bytes);
		take(&mut self.max_items, other.max_items);
		take(&mut self.default_refresh_minutes, other.default_refresh_minutes);
		take(&mut self.max_concurrent_requests, other.max_concurrent_requests);
		take(&mut self.max_requests_per_host, other.max_requests_per_host);
		take(&mut self.max_idle_per_host, other.max_idle_per_host);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		take(&mut self.level, other.level);
		take(&mut self.format, other.format);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_merge_overrides_set_fields_only() {
		let mut base: ConfigLayer = toml::from_str(
			r#"
			[server]
			base_url = "https://base.example.com/"

			[sync]
			max_items = 100
			cache_ttl_hours = 24
			"#,
		)
		.unwrap();
		let top: ConfigLayer = toml::from_str(
			r#"
			[sync]
			max_items = 200
			"#,
		)
		.unwrap();

		base.merge(top);

		let sync = base.sync.unwrap();
		assert_eq!(sync.max_items, Some(200));
		assert_eq!(sync.cache_ttl_hours, Some(24));
		assert_eq!(
			base.server.unwrap().base_url.as_deref(),
			Some("https://base.example.com/")
		);
	}

	#[test]
	fn test_merge_into_empty_adopts_section() {
		let mut base = ConfigLayer::default();
		base.merge(ConfigLayer {
			logging: Some(LoggingLayer {
				level: Some("debug".to_string()),
				format: None,
			}),
			..Default::default()
		});
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}

	proptest! {
		/// **Property: the later layer wins whenever it sets a value**
		#[test]
		fn merge_prefers_later_values(a in proptest::option::of(1u64..1000), b in proptest::option::of(1u64..1000)) {
			let mut base = ConfigLayer {
				sync: Some(SyncLayer { request_timeout_secs: a, ..Default::default() }),
				..Default::default()
			};
			base.merge(ConfigLayer {
				sync: Some(SyncLayer { request_timeout_secs: b, ..Default::default() }),
				..Default::default()
			});
			let merged = base.sync.unwrap().request_timeout_secs;
			prop_assert_eq!(merged, b.or(a));
		}
	}
}
