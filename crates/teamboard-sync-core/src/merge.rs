// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The monotonic obtained rule.
//!
//! Once any representation of a slot has been seen with `obtained = true`, no
//! write path may observe it as `false` again. Every layer that writes item
//! lists (the orchestrator's bulk path, the HTTP store's pre-write read, and
//! the merge of freshly parsed definitions) goes through [`preserve_obtained`].

use crate::item::Item;

/// Re-promotes every item in `incoming` that overlaps an obtained item in
/// `current`. Returns how many items were promoted.
pub fn preserve_obtained(current: &[Item], incoming: &mut [Item]) -> usize {
	let mut promoted = 0;
	for item in incoming.iter_mut().filter(|item| !item.obtained) {
		if current
			.iter()
			.any(|existing| existing.obtained && existing.overlaps(item))
		{
			item.obtained = true;
			promoted += 1;
		}
	}
	promoted
}

/// Carries obtained flags from the team record onto freshly parsed item
/// definitions. Definitions stay authoritative for names, ids and grouping.
pub fn inherit_obtained(definitions: &mut [Item], record_items: &[Item]) -> usize {
	preserve_obtained(record_items, definitions)
}

/// Marks the slot satisfied by `name` as obtained. Returns `true` if a slot
/// changed state.
pub fn mark_obtained(items: &mut [Item], name: &str) -> bool {
	match items.iter_mut().find(|item| item.matches(name)) {
		Some(item) if !item.obtained => {
			item.obtained = true;
			true
		}
		_ => false,
	}
}
