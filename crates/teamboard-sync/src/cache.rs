// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory item snapshots per team with idle eviction.
//!
//! Two maps are kept: the item snapshots and the last access instant of each
//! team. Each sits behind its own [`RwLock`]; when both are needed the items
//! lock is always taken first. Reads hand out copies.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use teamboard_sync_core::{Item, TeamCode};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct CacheManager {
	items: RwLock<HashMap<TeamCode, Vec<Item>>>,
	access: RwLock<HashMap<TeamCode, Instant>>,
	ttl: Duration,
}

impl CacheManager {
	pub fn new(ttl: Duration) -> Self {
		Self {
			items: RwLock::new(HashMap::new()),
			access: RwLock::new(HashMap::new()),
			ttl,
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns a copy of the team's snapshot and refreshes its access time.
	pub async fn get(&self, code: &TeamCode) -> Option<Vec<Item>> {
		let snapshot = self.items.read().await.get(code).cloned();
		if snapshot.is_some() {
			self.touch(code).await;
		}
		snapshot
	}

	/// Replaces the snapshot unless `items` is empty and data already exists.
	///
	/// Returns the snapshot that is stored after the call.
	pub async fn safely_update(&self, code: &TeamCode, items: Vec<Item>) -> Vec<Item> {
		let stored = {
			let mut map = self.items.write().await;
			let existing = map.get(code).filter(|existing| !existing.is_empty()).cloned();
			match existing {
				Some(existing) if items.is_empty() => {
					debug!(
						team_code = %code,
						kept = existing.len(),
						"ignoring empty update over cached items"
					);
					existing
				}
				_ => {
					map.insert(code.clone(), items.clone());
					items
				}
			}
		};
		self.touch(code).await;
		stored
	}

	/// Applies `f` to the cached snapshot in place. Returns the new snapshot
	/// when `f` reports a change.
	pub async fn modify<F>(&self, code: &TeamCode, f: F) -> Option<Vec<Item>>
	where
		F: FnOnce(&mut Vec<Item>) -> bool,
	{
		let updated = {
			let mut map = self.items.write().await;
			let items = map.get_mut(code)?;
			if !f(items) {
				return None;
			}
			items.clone()
		};
		self.touch(code).await;
		Some(updated)
	}

	pub async fn touch(&self, code: &TeamCode) {
		self.access.write().await.insert(code.clone(), Instant::now());
	}

	pub async fn contains(&self, code: &TeamCode) -> bool {
		self.items.read().await.contains_key(code)
	}

	/// Returns `true` if an entry was removed.
	pub async fn remove(&self, code: &TeamCode) -> bool {
		let removed = self.items.write().await.remove(code).is_some();
		self.access.write().await.remove(code);
		removed
	}

	pub async fn len(&self) -> usize {
		self.items.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.items.read().await.is_empty()
	}

	/// Evicts every team idle for longer than the TTL at `now`, except the
	/// `pinned` ones. Returns the evicted codes.
	pub async fn sweep(&self, now: Instant, pinned: &HashSet<TeamCode>) -> Vec<TeamCode> {
		let mut items = self.items.write().await;
		let mut access = self.access.write().await;

		let expired: Vec<TeamCode> = items
			.keys()
			.filter(|code| !pinned.contains(*code))
			.filter(|code| match access.get(*code) {
				Some(last) => now.saturating_duration_since(*last) > self.ttl,
				None => true,
			})
			.cloned()
			.collect();

		for code in &expired {
			items.remove(code);
			access.remove(code);
		}
		access.retain(|code, _| items.contains_key(code));

		if !expired.is_empty() {
			info!(
				evicted = expired.len(),
				remaining = items.len(),
				"evicted idle team caches"
			);
		}
		expired
	}
}
