// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Terminal rendering of team boards.

use teamboard_sync::{Item, TeamRecord};

pub fn item_line(item: &Item) -> String {
	let mark = if item.obtained { "x" } else { " " };
	if item.has_resolved_id() {
		format!("[{mark}] {} (#{})", item.display_name(), item.item_id)
	} else {
		format!("[{mark}] {}", item.display_name())
	}
}

pub fn items_block(items: &[Item]) -> String {
	if items.is_empty() {
		return "(no items)".to_string();
	}
	let obtained = items.iter().filter(|i| i.obtained).count();
	let mut out = String::new();
	for item in items {
		out.push_str(&item_line(item));
		out.push('\n');
	}
	out.push_str(&format!("{obtained}/{} obtained", items.len()));
	out
}

pub fn record_header(record: &TeamRecord) -> String {
	let mut out = format!(
		"{} ({} source",
		if record.team_name.is_empty() {
			"(unnamed team)"
		} else {
			record.team_name.as_str()
		},
		record.item_source_type
	);
	if record.refresh_interval_minutes > 0 {
		out.push_str(&format!(", refresh every {}m", record.refresh_interval_minutes));
	}
	out.push(')');
	if record.is_remote() {
		out.push_str(&format!("\n{}", record.remote_url));
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use teamboard_sync::ItemSourceType;

	#[test]
	fn test_item_line_marks_obtained_and_id() {
		let item = Item::new("Abyssal whip").with_item_id(4151).with_obtained(true);
		assert_eq!(item_line(&item), "[x] Abyssal whip (#4151)");
		assert_eq!(item_line(&Item::new("Dragon claws")), "[ ] Dragon claws");
	}

	#[test]
	fn test_items_block_counts_obtained() {
		let items = vec![
			Item::new("Abyssal whip").with_obtained(true),
			Item::new("Dragon claws"),
		];
		let block = items_block(&items);
		assert!(block.ends_with("1/2 obtained"));
		assert_eq!(items_block(&[]), "(no items)");
	}

	#[test]
	fn test_record_header_shows_remote_url() {
		let record = TeamRecord {
			team_name: "Clan".to_string(),
			item_source_type: ItemSourceType::Remote,
			remote_url: "https://example.com/items.json".to_string(),
			refresh_interval_minutes: 10,
			..Default::default()
		};
		let header = record_header(&record);
		assert!(header.starts_with("Clan (REMOTE source, refresh every 10m)"));
		assert!(header.ends_with("https://example.com/items.json"));
	}
}
