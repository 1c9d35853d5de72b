// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use async_trait::async_trait;

/// Name to item-id lookup supplied by the host application.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
	/// Returns the id for `name`, or `None` when the catalog has no match.
	async fn lookup_id(&self, name: &str) -> Option<i64>;
}

/// Catalog that never resolves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCatalog;

#[async_trait]
impl ItemCatalog for NoopCatalog {
	async fn lookup_id(&self, _name: &str) -> Option<i64> {
		None
	}
}

/// In-memory catalog keyed case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
	ids: HashMap<String, i64>,
}

impl StaticCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_entry(mut self, name: &str, id: i64) -> Self {
		self.insert(name, id);
		self
	}

	pub fn insert(&mut self, name: &str, id: i64) {
		self.ids.insert(name.trim().to_lowercase(), id);
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}

impl<S: AsRef<str>> FromIterator<(S, i64)> for StaticCatalog {
	fn from_iter<T: IntoIterator<Item = (S, i64)>>(iter: T) -> Self {
		let mut catalog = Self::new();
		for (name, id) in iter {
			catalog.insert(name.as_ref(), id);
		}
		catalog
	}
}

#[async_trait]
impl ItemCatalog for StaticCatalog {
	async fn lookup_id(&self, name: &str) -> Option<i64> {
		self.ids.get(&name.trim().to_lowercase()).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn static_catalog_ignores_case() {
		let catalog: StaticCatalog = [("Abyssal whip", 4151)].into_iter().collect();
		assert_eq!(catalog.lookup_id("ABYSSAL WHIP").await, Some(4151));
		assert_eq!(catalog.lookup_id("Dragon claws").await, None);
	}

	#[tokio::test]
	async fn noop_catalog_resolves_nothing() {
		assert_eq!(NoopCatalog.lookup_id("anything").await, None);
	}
}
