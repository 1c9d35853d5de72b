// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Turning raw item-list documents into [`Item`]s.
//!
//! Documents are accepted in several JSON shapes and, failing that, as plain
//! text with one item per line or comma. Parsing never fails: the worst case
//! is an empty list.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use teamboard_sync_core::{GroupDefinition, Item, GROUP_DELIMITER};
use tracing::{debug, trace};

use crate::catalog::{ItemCatalog, NoopCatalog};
use crate::config::SyncConfig;

const CATALOG_CONCURRENCY: usize = 16;

/// Parses manual item text and fetched documents into board items.
#[derive(Clone)]
pub struct ItemSourceResolver {
	catalog: Arc<dyn ItemCatalog>,
	catalog_timeout: Duration,
	max_document_bytes: usize,
	max_items: usize,
}

impl std::fmt::Debug for ItemSourceResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ItemSourceResolver")
			.field("catalog_timeout", &self.catalog_timeout)
			.field("max_document_bytes", &self.max_document_bytes)
			.field("max_items", &self.max_items)
			.finish_non_exhaustive()
	}
}

impl Default for ItemSourceResolver {
	fn default() -> Self {
		Self::new(&SyncConfig::default())
	}
}

impl ItemSourceResolver {
	pub fn new(config: &SyncConfig) -> Self {
		Self {
			catalog: Arc::new(NoopCatalog),
			catalog_timeout: config.catalog_timeout,
			max_document_bytes: config.max_document_bytes,
			max_items: config.max_items,
		}
	}

	pub fn with_catalog(mut self, catalog: Arc<dyn ItemCatalog>) -> Self {
		self.catalog = catalog;
		self
	}

	pub async fn parse(&self, document: &str) -> Vec<Item> {
		let mut items = self.parse_names(document);
		self.resolve_ids(&mut items).await;
		items
	}

	/// Everything [`parse`](Self::parse) does except the catalog lookups.
	pub fn parse_names(&self, document: &str) -> Vec<Item> {
		let text = truncate_to_char_boundary(document, self.max_document_bytes);
		if text.len() < document.len() {
			debug!(
				original = document.len(),
				kept = text.len(),
				"truncated oversized item document"
			);
		}

		let mut collector = Collector::new(self.max_items);

		if let Ok(value) = serde_json::from_str::<Value>(text) {
			collect_value(&value, &mut collector);
			if value.is_array() || value.is_object() {
				return collector.items;
			}
			if collector.items.is_empty() {
				trace!("scalar document yielded no items, trying plain text");
			}
		}

		if collector.items.is_empty() {
			for name in text.split(['\n', ',']) {
				if collector.is_full() {
					break;
				}
				collector.push_name(name);
			}
		}

		collector.items
	}

	async fn resolve_ids(&self, items: &mut [Item]) {
		let pending: Vec<(usize, String)> = items
			.iter()
			.enumerate()
			.filter(|(_, item)| !item.has_resolved_id())
			.map(|(index, item)| (index, item.name.clone()))
			.collect();
		if pending.is_empty() {
			return;
		}

		let catalog = &self.catalog;
		let timeout = self.catalog_timeout;
		let resolved: Vec<(usize, Option<i64>)> = stream::iter(pending)
			.map(|(index, name)| async move {
				let id = tokio::time::timeout(timeout, catalog.lookup_id(&name))
					.await
					.unwrap_or_else(|_| {
						trace!(item = %name, "catalog lookup timed out");
						None
					});
				(index, id)
			})
			.buffer_unordered(CATALOG_CONCURRENCY)
			.collect()
			.await;

		for (index, id) in resolved {
			if let (Some(id), Some(item)) = (id, items.get_mut(index)) {
				item.item_id = id;
			}
		}
	}
}

/// Largest prefix of `text` no longer than `max_bytes` that ends on a char
/// boundary.
pub fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
	if text.len() <= max_bytes {
		return text;
	}
	let mut end = max_bytes;
	while end > 0 && !text.is_char_boundary(end) {
		end -= 1;
	}
	&text[..end]
}

struct Collector {
	items: Vec<Item>,
	limit: usize,
}

impl Collector {
	fn new(limit: usize) -> Self {
		Self {
			items: Vec::new(),
			limit,
		}
	}

	fn is_full(&self) -> bool {
		self.items.len() >= self.limit
	}

	fn push_name(&mut self, raw: &str) {
		if let Some(item) = item_from_name(raw) {
			self.push(item);
		}
	}

	fn push(&mut self, item: Item) {
		if self.is_full() {
			return;
		}
		if self.items.iter().any(|existing| existing.overlaps(&item)) {
			trace!(item = %item.name, "dropping duplicate item");
			return;
		}
		self.items.push(item);
	}
}

fn item_from_name(raw: &str) -> Option<Item> {
	let name = raw.trim();
	if name.is_empty() {
		return None;
	}
	if name.contains(GROUP_DELIMITER) {
		if let Some(group) = GroupDefinition::parse(name) {
			return Some(group.into_item());
		}
		// Fewer than two distinct members: keep the slot as a plain item.
		return name
			.split(GROUP_DELIMITER)
			.map(str::trim)
			.find(|member| !member.is_empty())
			.map(Item::new);
	}
	Some(Item::new(name))
}

fn collect_value(value: &Value, out: &mut Collector) {
	match value {
		Value::Array(entries) => {
			for entry in entries {
				if out.is_full() {
					break;
				}
				match entry {
					Value::String(name) => out.push_name(name),
					Value::Object(record) => {
						if let Some(item) = item_from_record(None, record) {
							out.push(item);
						}
					}
					_ => {}
				}
			}
		}
		Value::Object(map) => {
			if let Some(nested) = map.get("items") {
				if nested.is_array() || nested.is_object() {
					collect_value(nested, out);
					return;
				}
			}
			for (key, entry) in map {
				if out.is_full() {
					break;
				}
				if let Some(item) = item_from_keyed(key, entry) {
					out.push(item);
				}
			}
		}
		Value::String(name) => out.push_name(name),
		_ => {}
	}
}

fn item_from_keyed(key: &str, value: &Value) -> Option<Item> {
	match value {
		Value::Bool(obtained) => item_from_name(key).map(|item| item.with_obtained(*obtained)),
		Value::Number(id) => {
			let item = item_from_name(key)?;
			Some(match id.as_i64() {
				Some(id) => item.with_item_id(id),
				None => item,
			})
		}
		Value::Object(record) => item_from_record(Some(key), record),
		Value::Null | Value::String(_) => item_from_name(key),
		Value::Array(_) => None,
	}
}

fn item_from_record(fallback_name: Option<&str>, record: &Map<String, Value>) -> Option<Item> {
	let name = record
		.get("name")
		.and_then(Value::as_str)
		.filter(|n| !n.trim().is_empty())
		.or(fallback_name)?;

	let alternatives: Vec<&str> = ["alternativeNames", "alternatives", "members"]
		.iter()
		.filter_map(|field| record.get(*field).and_then(Value::as_array))
		.flatten()
		.filter_map(Value::as_str)
		.collect();

	let mut item = if alternatives.is_empty() {
		item_from_name(name)?
	} else {
		let members = name
			.split(GROUP_DELIMITER)
			.chain(alternatives.iter().copied());
		match GroupDefinition::from_members(members) {
			Some(group) => group.into_item(),
			None => item_from_name(name)?,
		}
	};

	if let Some(obtained) = record.get("obtained").and_then(Value::as_bool) {
		item.obtained = obtained;
	}
	if let Some(id) = ["itemId", "id"]
		.iter()
		.find_map(|field| record.get(*field).and_then(Value::as_i64))
	{
		item.item_id = id;
	}
	if ["group", "isGroup"]
		.iter()
		.any(|field| record.get(*field).and_then(Value::as_bool) == Some(true))
	{
		item.is_group = true;
	}

	Some(item)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::StaticCatalog;
	use async_trait::async_trait;
	use proptest::prelude::*;

	fn resolver() -> ItemSourceResolver {
		ItemSourceResolver::default()
	}

	fn names(items: &[Item]) -> Vec<&str> {
		items.iter().map(|i| i.name.as_str()).collect()
	}

	#[tokio::test]
	async fn plain_text_yields_one_item_per_line() {
		let items = resolver().parse("Abyssal whip\n\n  Dragon claws \nTwisted bow\n").await;
		assert_eq!(names(&items), vec!["Abyssal whip", "Dragon claws", "Twisted bow"]);
		assert!(items.iter().all(|i| !i.obtained && !i.has_resolved_id()));
	}

	#[tokio::test]
	async fn plain_text_splits_on_commas() {
		let items = resolver().parse("a, b,,c\nd").await;
		assert_eq!(names(&items), vec!["a", "b", "c", "d"]);
	}

	#[tokio::test]
	async fn colon_lines_become_groups() {
		let items = resolver().parse("Dragon pickaxe:Dragon axe\nWhip").await;
		assert_eq!(items.len(), 2);
		assert!(items[0].is_group);
		assert_eq!(items[0].name, "Dragon pickaxe");
		assert_eq!(items[0].alternative_names, vec!["Dragon axe"]);
		assert_eq!(items[0].display_name(), "Dragon pickaxe / Dragon axe");
	}

	#[tokio::test]
	async fn duplicates_are_dropped_case_insensitively() {
		let items = resolver().parse("Whip\nwhip\nA:Whip\nB").await;
		assert_eq!(names(&items), vec!["Whip", "B"]);
	}

	#[tokio::test]
	async fn json_array_of_strings_and_records() {
		let doc = r#"["Whip", {"name": "Claws", "obtained": true, "itemId": 13652}, {"name": "Axe", "alternatives": ["Pickaxe"]}]"#;
		let items = resolver().parse(doc).await;
		assert_eq!(names(&items), vec!["Whip", "Claws", "Axe"]);
		assert!(items[1].obtained);
		assert_eq!(items[1].item_id, 13652);
		assert!(items[2].is_group);
		assert_eq!(items[2].alternative_names, vec!["Pickaxe"]);
	}

	#[tokio::test]
	async fn json_object_keyed_by_name() {
		let doc = r#"{"Whip": true, "Claws": 13652, "Bow": null, "Axe:Pickaxe": {"obtained": false}}"#;
		let items = resolver().parse(doc).await;
		assert_eq!(names(&items), vec!["Whip", "Claws", "Bow", "Axe"]);
		assert!(items[0].obtained);
		assert_eq!(items[1].item_id, 13652);
		assert!(items[3].is_group);
	}

	#[tokio::test]
	async fn json_items_wrapper_is_unwrapped() {
		let doc = r#"{"title": "Bingo", "items": ["Whip", "Claws"]}"#;
		let items = resolver().parse(doc).await;
		assert_eq!(names(&items), vec!["Whip", "Claws"]);
	}

	#[tokio::test]
	async fn scalar_json_falls_back_to_plain_text() {
		let items = resolver().parse("123").await;
		assert_eq!(names(&items), vec!["123"]);
	}

	#[tokio::test]
	async fn empty_document_yields_nothing() {
		assert!(resolver().parse("").await.is_empty());
		assert!(resolver().parse(" \n , \n").await.is_empty());
		assert!(resolver().parse("[]").await.is_empty());
		assert!(resolver().parse("{}").await.is_empty());
		assert!(resolver().parse(r#"{"items": []}"#).await.is_empty());
	}

	#[tokio::test]
	async fn json_container_without_items_skips_plain_text() {
		let items = resolver().parse("[1, 2, false]").await;
		assert!(items.is_empty());
	}

	#[tokio::test]
	async fn single_member_group_keeps_its_slot() {
		let items = resolver().parse("Whip:\nBow\nA:a\n:Claws").await;
		assert_eq!(names(&items), vec!["Whip", "Bow", "A", "Claws"]);
		assert!(items.iter().all(|i| !i.is_group && i.alternative_names.is_empty()));
	}

	#[tokio::test]
	async fn output_is_capped() {
		let doc: String = (0..600).map(|i| format!("item {i}\n")).collect();
		let items = resolver().parse(&doc).await;
		assert_eq!(items.len(), 500);
		assert_eq!(items[499].name, "item 499");
	}

	#[tokio::test]
	async fn oversized_document_is_truncated_and_still_parses() {
		// 16 bytes, so the 1 MiB cut lands on a line boundary.
		let line = "Abyssal whip 01\n";
		let mut doc = String::new();
		while doc.len() <= 2 * 1024 * 1024 {
			doc.push_str(line);
		}
		let mut config = SyncConfig::default();
		config.max_items = usize::MAX;
		let items = ItemSourceResolver::new(&config).parse(&doc).await;
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].name, "Abyssal whip 01");
	}

	#[test]
	fn truncation_respects_char_boundaries() {
		let text = "aé";
		assert_eq!(truncate_to_char_boundary(text, 2), "a");
		assert_eq!(truncate_to_char_boundary(text, 3), "aé");
		assert_eq!(truncate_to_char_boundary(text, 0), "");
	}

	#[tokio::test]
	async fn catalog_resolves_ids() {
		let catalog: StaticCatalog = [("abyssal whip", 4151)].into_iter().collect();
		let resolver = resolver().with_catalog(Arc::new(catalog));
		let items = resolver.parse("Abyssal whip\nUnknown thing").await;
		assert_eq!(items[0].item_id, 4151);
		assert_eq!(items[1].item_id, teamboard_sync_core::UNRESOLVED_ITEM_ID);
	}

	struct SlowCatalog;

	#[async_trait]
	impl ItemCatalog for SlowCatalog {
		async fn lookup_id(&self, _name: &str) -> Option<i64> {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Some(1)
		}
	}

	#[tokio::test(start_paused = true)]
	async fn slow_catalog_leaves_ids_unresolved() {
		let resolver = resolver().with_catalog(Arc::new(SlowCatalog));
		let items = resolver.parse("Whip").await;
		assert!(!items[0].has_resolved_id());
	}

	proptest! {
		/// **Property: truncation yields a prefix within the byte limit**
		#[test]
		fn truncation_is_bounded_prefix(text in "\\PC{0,64}", max in 0usize..80) {
			let cut = truncate_to_char_boundary(&text, max);
			prop_assert!(cut.len() <= max);
			prop_assert!(text.starts_with(cut));
			prop_assert!(cut.len() + 4 > max.min(text.len()));
		}
	}
}
