// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use teamboard_sync_core::{Item, TeamCode};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Callback receiving a team's current item list.
pub type ItemsListener = Arc<dyn Fn(&[Item]) + Send + Sync>;

/// Identifies one listener registration. A replaced registration never
/// becomes current again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

struct Registration {
	id: RegistrationId,
	listener: ItemsListener,
	poller: Option<JoinHandle<()>>,
}

impl Registration {
	fn stop_poller(&mut self) {
		if let Some(poller) = self.poller.take() {
			poller.abort();
		}
	}
}

/// At most one listener per team.
pub struct ListenerRegistry {
	registrations: RwLock<HashMap<TeamCode, Registration>>,
	next_id: AtomicU64,
}

impl Default for ListenerRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ListenerRegistry {
	pub fn new() -> Self {
		Self {
			registrations: RwLock::new(HashMap::new()),
			next_id: AtomicU64::new(1),
		}
	}

	/// Installs `listener` for `code`, replacing and returning the previous
	/// registration's id.
	pub async fn register(
		&self,
		code: &TeamCode,
		listener: ItemsListener,
	) -> (RegistrationId, Option<RegistrationId>) {
		let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let registration = Registration {
			id,
			listener,
			poller: None,
		};

		let replaced = self
			.registrations
			.write()
			.await
			.insert(code.clone(), registration)
			.map(|mut old| {
				old.stop_poller();
				old.id
			});

		debug!(team_code = %code, registration = %id, replaced = replaced.is_some(), "registered listener");
		(id, replaced)
	}

	pub async fn unregister(&self, code: &TeamCode) -> Option<RegistrationId> {
		let mut removed = self.registrations.write().await.remove(code)?;
		removed.stop_poller();
		debug!(team_code = %code, registration = %removed.id, "unregistered listener");
		Some(removed.id)
	}

	pub async fn current(&self, code: &TeamCode) -> Option<RegistrationId> {
		self.registrations.read().await.get(code).map(|r| r.id)
	}

	pub async fn is_current(&self, code: &TeamCode, id: RegistrationId) -> bool {
		self.current(code).await == Some(id)
	}

	pub async fn registered_teams(&self) -> HashSet<TeamCode> {
		self.registrations.read().await.keys().cloned().collect()
	}

	pub async fn len(&self) -> usize {
		self.registrations.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.registrations.read().await.is_empty()
	}

	/// Attaches a background poller to registration `id`. The handle is
	/// aborted immediately if `id` is no longer current.
	pub async fn attach_poller(&self, code: &TeamCode, id: RegistrationId, poller: JoinHandle<()>) -> bool {
		let mut registrations = self.registrations.write().await;
		match registrations.get_mut(code) {
			Some(registration) if registration.id == id => {
				registration.stop_poller();
				registration.poller = Some(poller);
				true
			}
			_ => {
				poller.abort();
				false
			}
		}
	}

	/// Delivers `items` to the team's listener. Returns `false` when nobody
	/// is listening.
	pub async fn notify(&self, code: &TeamCode, items: &[Item]) -> bool {
		let listener = self
			.registrations
			.read()
			.await
			.get(code)
			.map(|r| Arc::clone(&r.listener));
		deliver(code, listener, items)
	}

	/// Like [`notify`](Self::notify), but only while `id` is the current
	/// registration.
	pub async fn notify_registration(&self, code: &TeamCode, id: RegistrationId, items: &[Item]) -> bool {
		let listener = self
			.registrations
			.read()
			.await
			.get(code)
			.filter(|r| r.id == id)
			.map(|r| Arc::clone(&r.listener));
		deliver(code, listener, items)
	}
}

fn deliver(code: &TeamCode, listener: Option<ItemsListener>, items: &[Item]) -> bool {
	match listener {
		Some(listener) => {
			trace!(team_code = %code, count = items.len(), "notifying listener");
			listener(items);
			true
		}
		None => false,
	}
}
