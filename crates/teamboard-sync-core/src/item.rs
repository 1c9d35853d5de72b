// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Item id used when the catalog could not resolve a name.
pub const UNRESOLVED_ITEM_ID: i64 = -1;

/// Separates member names of a grouped item, e.g. `Dragon pickaxe:Dragon axe`.
pub const GROUP_DELIMITER: char = ':';

/// One slot on a team board.
///
/// Names compare case-insensitively. A grouped slot is satisfied by its
/// primary `name` or by any of its `alternative_names`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
	pub name: String,
	#[serde(default = "unresolved_item_id")]
	pub item_id: i64,
	#[serde(default)]
	pub obtained: bool,
	#[serde(default)]
	pub is_group: bool,
	#[serde(default)]
	pub alternative_names: Vec<String>,
}

fn unresolved_item_id() -> i64 {
	UNRESOLVED_ITEM_ID
}

impl Item {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			item_id: UNRESOLVED_ITEM_ID,
			obtained: false,
			is_group: false,
			alternative_names: Vec::new(),
		}
	}

	pub fn with_obtained(mut self, obtained: bool) -> Self {
		self.obtained = obtained;
		self
	}

	pub fn with_item_id(mut self, item_id: i64) -> Self {
		self.item_id = item_id;
		self
	}

	/// Adds a synonym, ignoring duplicates and the primary name itself.
	pub fn add_alternative(&mut self, alternative: impl Into<String>) {
		let alternative = alternative.into();
		let alternative = alternative.trim();
		if alternative.is_empty() || self.name.eq_ignore_ascii_case(alternative) {
			return;
		}
		if self
			.alternative_names
			.iter()
			.any(|existing| existing.eq_ignore_ascii_case(alternative))
		{
			return;
		}
		self.alternative_names.push(alternative.to_string());
		self.is_group = true;
	}

	pub fn has_resolved_id(&self) -> bool {
		self.item_id != UNRESOLVED_ITEM_ID
	}

	/// True when `name` is this item's name, case-insensitively.
	pub fn is_named(&self, name: &str) -> bool {
		self.name.trim().eq_ignore_ascii_case(name.trim())
	}

	/// True when `name` satisfies this slot: the primary name or any alternative.
	pub fn matches(&self, name: &str) -> bool {
		let name = name.trim();
		self.is_named(name)
			|| self
				.alternative_names
				.iter()
				.any(|alt| alt.trim().eq_ignore_ascii_case(name))
	}

	/// True when the two items share any name, primary or alternative.
	pub fn overlaps(&self, other: &Item) -> bool {
		other.matches(&self.name)
			|| self
				.alternative_names
				.iter()
				.any(|alt| other.matches(alt))
	}

	/// Human-facing label. Groups show every member.
	pub fn display_name(&self) -> String {
		if self.alternative_names.is_empty() {
			return self.name.clone();
		}
		let mut members = Vec::with_capacity(self.alternative_names.len() + 1);
		members.push(self.name.as_str());
		members.extend(self.alternative_names.iter().map(String::as_str));
		members.join(" / ")
	}
}

/// A board slot that any one of several named items satisfies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDefinition {
	member_names: Vec<String>,
}

impl GroupDefinition {
	/// Splits `text` on [`GROUP_DELIMITER`]. Returns `None` unless at least two
	/// non-empty members remain.
	pub fn parse(text: &str) -> Option<Self> {
		if !text.contains(GROUP_DELIMITER) {
			return None;
		}
		Self::from_members(text.split(GROUP_DELIMITER))
	}

	pub fn from_members<I, S>(members: I) -> Option<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut member_names: Vec<String> = Vec::new();
		for member in members {
			let member = member.as_ref().trim();
			if member.is_empty() {
				continue;
			}
			if member_names.iter().any(|m| m.eq_ignore_ascii_case(member)) {
				continue;
			}
			member_names.push(member.to_string());
		}

		if member_names.len() < 2 {
			return None;
		}
		Some(Self { member_names })
	}

	pub fn primary(&self) -> &str {
		&self.member_names[0]
	}

	pub fn member_names(&self) -> &[String] {
		&self.member_names
	}

	pub fn display_name(&self) -> String {
		self.member_names.join(" / ")
	}

	/// Collapses the group into one item named after the primary member.
	pub fn into_item(self) -> Item {
		let mut members = self.member_names.into_iter();
		let primary = members.next().unwrap_or_default();
		Item {
			name: primary,
			item_id: UNRESOLVED_ITEM_ID,
			obtained: false,
			is_group: true,
			alternative_names: members.collect(),
		}
	}
}

/// Maps `name` to the key the backend stores it under.
///
/// An exact (case-insensitive) primary name wins; otherwise the primary name
/// of the group listing `name` as an alternative is returned.
pub fn resolve_canonical_name(items: &[Item], name: &str) -> Option<String> {
	if let Some(item) = items.iter().find(|item| item.is_named(name)) {
		return Some(item.name.clone());
	}
	items
		.iter()
		.find(|item| item.matches(name))
		.map(|item| item.name.clone())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_is_case_insensitive() {
		let item = Item::new("Dragon Pickaxe");
		assert!(item.matches("dragon pickaxe"));
		assert!(item.matches("  DRAGON PICKAXE "));
		assert!(!item.matches("Dragon axe"));
	}

	#[test]
	fn group_parse_requires_two_members() {
		assert!(GroupDefinition::parse("Solo").is_none());
		assert!(GroupDefinition::parse("Solo:").is_none());
		assert!(GroupDefinition::parse(" : ").is_none());

		let group = GroupDefinition::parse("A : B:C").unwrap();
		assert_eq!(group.primary(), "A");
		assert_eq!(group.member_names(), &["A", "B", "C"]);
		assert_eq!(group.display_name(), "A / B / C");
	}

	#[test]
	fn group_parse_drops_duplicate_members() {
		let group = GroupDefinition::parse("A:a:B").unwrap();
		assert_eq!(group.member_names(), &["A", "B"]);
	}

	#[test]
	fn group_collapses_into_item_with_alternatives() {
		let item = GroupDefinition::parse("A:B").unwrap().into_item();
		assert_eq!(item.name, "A");
		assert!(item.is_group);
		assert_eq!(item.alternative_names, vec!["B".to_string()]);
		assert_eq!(item.item_id, UNRESOLVED_ITEM_ID);
		assert!(item.matches("b"));
		assert_eq!(item.display_name(), "A / B");
	}

	#[test]
	fn add_alternative_ignores_duplicates_and_primary() {
		let mut item = Item::new("A");
		item.add_alternative("a");
		assert!(!item.is_group);
		item.add_alternative("B");
		item.add_alternative("b");
		assert_eq!(item.alternative_names, vec!["B".to_string()]);
		assert!(item.is_group);
	}

	#[test]
	fn canonical_name_prefers_exact_match() {
		let mut group = GroupDefinition::parse("Shield:Sword").unwrap().into_item();
		group.obtained = false;
		let items = vec![group, Item::new("Sword")];

		assert_eq!(resolve_canonical_name(&items, "sword"), Some("Sword".to_string()));
		assert_eq!(resolve_canonical_name(&items, "shield"), Some("Shield".to_string()));
		assert_eq!(resolve_canonical_name(&items, "bow"), None);
	}

	#[test]
	fn canonical_name_maps_alternative_to_primary() {
		let items = vec![GroupDefinition::parse("A:B").unwrap().into_item()];
		assert_eq!(resolve_canonical_name(&items, "B"), Some("A".to_string()));
	}

	#[test]
	fn item_deserializes_with_defaults() {
		let item: Item = serde_json::from_str(r#"{"name":"Whip"}"#).unwrap();
		assert_eq!(item.item_id, UNRESOLVED_ITEM_ID);
		assert!(!item.obtained);
		assert!(item.alternative_names.is_empty());
	}

	#[test]
	fn overlaps_checks_all_names() {
		let group = GroupDefinition::parse("A:B").unwrap().into_item();
		assert!(Item::new("b").overlaps(&group));
		assert!(group.overlaps(&Item::new("B")));
		assert!(!group.overlaps(&Item::new("C")));
	}
}
