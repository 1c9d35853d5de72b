// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! JSON shapes exchanged with the team backend.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use teamboard_sync_core::{
	escape_key, unescape_key, Item, ItemSourceType, TeamCode, TeamRecord, UNRESOLVED_ITEM_ID,
};
use tracing::warn;

/// `GET teams/{code}` response body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeamRecordWire {
	#[serde(default)]
	pub team_name: Option<String>,
	#[serde(default)]
	pub webhook: Option<String>,
	#[serde(default)]
	pub item_source_type: Option<String>,
	#[serde(default)]
	pub remote_url: Option<String>,
	#[serde(default)]
	pub manual_items: Option<String>,
	#[serde(default)]
	pub refresh_interval: Option<u32>,
	#[serde(default)]
	pub persist_obtained: Option<bool>,
	#[serde(default)]
	pub items: Option<Map<String, Value>>,
}

impl TeamRecordWire {
	pub fn into_record(self, code: &TeamCode) -> TeamRecord {
		let item_source_type = self
			.item_source_type
			.as_deref()
			.and_then(|s| s.parse::<ItemSourceType>().ok())
			.unwrap_or_default();

		TeamRecord {
			team_code: Some(code.clone()),
			team_name: self.team_name.unwrap_or_default(),
			webhook: self.webhook.unwrap_or_default(),
			item_source_type,
			remote_url: self.remote_url.unwrap_or_default(),
			manual_items: self.manual_items.unwrap_or_default(),
			refresh_interval_minutes: self.refresh_interval.unwrap_or_default(),
			persist_obtained: self.persist_obtained.unwrap_or_default(),
			items: items_from_wire(code, self.items.unwrap_or_default()),
		}
	}
}

/// One entry of the backend's escaped-key item map.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemWire {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub item_id: Option<i64>,
	#[serde(default)]
	pub obtained: Option<bool>,
	#[serde(default)]
	pub is_group: Option<bool>,
	#[serde(default)]
	pub alternative_names: Option<Vec<String>>,
	#[serde(default)]
	pub updated_at: Option<i64>,
}

impl ItemWire {
	fn from_item(item: &Item, updated_at: i64) -> Self {
		Self {
			name: Some(item.name.clone()),
			item_id: Some(item.item_id),
			obtained: Some(item.obtained),
			is_group: Some(item.is_group),
			alternative_names: Some(item.alternative_names.clone()),
			updated_at: Some(updated_at),
		}
	}

	fn into_item(self, key: &str) -> Item {
		let name = self
			.name
			.filter(|n| !n.trim().is_empty())
			.unwrap_or_else(|| unescape_key(key));
		let alternative_names = self.alternative_names.unwrap_or_default();
		Item {
			name,
			item_id: self.item_id.unwrap_or(UNRESOLVED_ITEM_ID),
			obtained: self.obtained.unwrap_or(false),
			is_group: self.is_group.unwrap_or(!alternative_names.is_empty()),
			alternative_names,
		}
	}
}

/// Decodes the item map in backend order, skipping malformed entries.
pub(crate) fn items_from_wire(code: &TeamCode, map: Map<String, Value>) -> Vec<Item> {
	let mut items = Vec::with_capacity(map.len());
	for (key, value) in map {
		match serde_json::from_value::<ItemWire>(value) {
			Ok(wire) => items.push(wire.into_item(&key)),
			Err(e) => {
				warn!(team_code = %code, key = %key, error = %e, "skipping malformed item entry");
			}
		}
	}
	items
}

/// Encodes items as the escaped-key map used by the bulk replace endpoint.
pub(crate) fn items_to_wire(items: &[Item]) -> Map<String, Value> {
	let updated_at = Utc::now().timestamp_millis();
	let mut map = Map::with_capacity(items.len());
	for item in items {
		let wire = ItemWire::from_item(item, updated_at);
		match serde_json::to_value(wire) {
			Ok(value) => {
				map.insert(escape_key(&item.name), value);
			}
			Err(e) => {
				warn!(item = %item.name, error = %e, "failed to encode item");
			}
		}
	}
	map
}

/// `PATCH teams/{code}/items/{key}` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchItemRequest {
	pub obtained: bool,
	pub updated_at: i64,
}

impl PatchItemRequest {
	pub fn new(obtained: bool) -> Self {
		Self {
			obtained,
			updated_at: Utc::now().timestamp_millis(),
		}
	}
}

/// `POST teams` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTeamResponse {
	pub team_code: TeamCode,
}
