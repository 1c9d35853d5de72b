// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-team lifecycle: listener registration, loading, write gating, refresh
//! and eviction.
//!
//! Each team moves through three phases:
//!
//! ```text
//! Unregistered --register_listener--> Loading --load ok--> Active
//!      ^                                  |                   |
//!      +--------unregister_listener-------+-------------------+
//! ```
//!
//! Writes arriving while a team is `Loading` are absorbed: they report success
//! without touching the backend, since the load in progress will deliver the
//! authoritative list.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use teamboard_common_http::BoundedClient;
use teamboard_sync_core::{
	inherit_obtained, mark_obtained, preserve_obtained, resolve_canonical_name, CreateTeamRequest,
	Item, ItemSourceType, TeamCode, TeamRecord,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::CacheManager;
use crate::catalog::ItemCatalog;
use crate::config::SyncConfig;
use crate::dedup::RequestDeduplicator;
use crate::document::{DocumentFetcher, HttpDocumentFetcher};
use crate::error::{RemoteError, Result, SyncError};
use crate::listener::{ItemsListener, ListenerRegistry, RegistrationId};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::source::ItemSourceResolver;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TeamPhase {
	#[default]
	Unregistered,
	Loading,
	Active,
}

impl TeamPhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			TeamPhase::Unregistered => "unregistered",
			TeamPhase::Loading => "loading",
			TeamPhase::Active => "active",
		}
	}
}

impl fmt::Display for TeamPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

struct Inner {
	config: SyncConfig,
	remote: Arc<dyn RemoteStore>,
	cache: CacheManager,
	dedup: RequestDeduplicator,
	listeners: ListenerRegistry,
	phases: RwLock<HashMap<TeamCode, TeamPhase>>,
}

/// Coordinates the remote store, cache, document fetches and listeners.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct SyncOrchestrator {
	inner: Arc<Inner>,
}

impl SyncOrchestrator {
	pub fn new(
		config: SyncConfig,
		remote: Arc<dyn RemoteStore>,
		fetcher: Arc<dyn DocumentFetcher>,
		resolver: ItemSourceResolver,
	) -> Self {
		let cache = CacheManager::new(config.cache_ttl);
		let dedup = RequestDeduplicator::new(fetcher, resolver);
		Self {
			inner: Arc::new(Inner {
				config,
				remote,
				cache,
				dedup,
				listeners: ListenerRegistry::new(),
				phases: RwLock::new(HashMap::new()),
			}),
		}
	}

	/// Wires the HTTP store and document fetcher over one shared bounded
	/// client.
	pub fn from_config(config: SyncConfig, catalog: Arc<dyn ItemCatalog>) -> Result<Self> {
		let base_url = Url::parse(&config.base_url)
			.map_err(|e| SyncError::Remote(RemoteError::InvalidUrl(e.to_string())))?;
		let http = BoundedClient::new(&config.http).map_err(RemoteError::from)?;
		let remote = Arc::new(HttpRemoteStore::new(base_url, http.clone()));
		let fetcher = Arc::new(HttpDocumentFetcher::new(http).with_max_bytes(config.max_document_bytes));
		let resolver = ItemSourceResolver::new(&config).with_catalog(catalog);
		Ok(Self::new(config, remote, fetcher, resolver))
	}

	pub fn config(&self) -> &SyncConfig {
		&self.inner.config
	}

	pub fn resolver(&self) -> &ItemSourceResolver {
		self.inner.dedup.resolver()
	}

	pub async fn phase(&self, code: &TeamCode) -> TeamPhase {
		self
			.inner
			.phases
			.read()
			.await
			.get(code)
			.copied()
			.unwrap_or_default()
	}

	pub async fn cached_items(&self, code: &TeamCode) -> Option<Vec<Item>> {
		self.inner.cache.get(code).await
	}

	pub async fn team_exists(&self, code: &TeamCode) -> bool {
		self.inner.remote.team_exists(code).await
	}

	pub async fn team_record(&self, code: &TeamCode) -> Result<TeamRecord> {
		Ok(self.inner.remote.get_team_record(code).await?)
	}

	pub async fn in_flight_fetches(&self) -> usize {
		self.inner.dedup.in_flight_count().await
	}

	/// Makes `listener` the team's only listener and loads the team.
	///
	/// Any cached snapshot is delivered straight away; the freshly loaded list
	/// follows. Returns the loaded list.
	pub async fn register_listener(&self, code: &TeamCode, listener: ItemsListener) -> Result<Vec<Item>> {
		let inner = &self.inner;
		let (id, replaced) = inner.listeners.register(code, listener).await;
		if replaced.is_some() {
			inner.dedup.cancel_team(code).await;
		}
		inner.phases.write().await.insert(code.clone(), TeamPhase::Loading);

		info!(team_code = %code, registration = %id, "loading team");

		if let Some(cached) = inner.cache.get(code).await.filter(|items| !items.is_empty()) {
			debug!(team_code = %code, count = cached.len(), "delivering cached items");
			inner.listeners.notify_registration(code, id, &cached).await;
		}

		match self.load(code, Some(id)).await {
			Ok((record, items)) => {
				if self.activate(code, id).await {
					info!(team_code = %code, count = items.len(), "team active");
					self.start_poller(code, id, record.refresh_interval_minutes).await;
				}
				Ok(items)
			}
			Err(e) => {
				let has_cache = inner
					.cache
					.get(code)
					.await
					.is_some_and(|items| !items.is_empty());
				if has_cache && self.activate(code, id).await {
					warn!(team_code = %code, error = %e, "load failed, serving cached items");
				} else {
					self.deactivate(code, id).await;
					warn!(team_code = %code, error = %e, "load failed, writes pass through until a refresh succeeds");
				}
				self.start_poller(code, id, 0).await;
				Err(e)
			}
		}
	}

	/// Removes the team's listener and cancels its in-flight fetches. Cached
	/// items are kept until they age out.
	pub async fn unregister_listener(&self, code: &TeamCode) {
		let inner = &self.inner;
		inner.listeners.unregister(code).await;
		inner.phases.write().await.remove(code);
		inner.cache.touch(code).await;
		inner.dedup.cancel_team(code).await;
		info!(team_code = %code, "team unregistered");
	}

	/// Records that `name` was obtained.
	///
	/// Reports while the team is loading, and reports of `obtained = false`,
	/// succeed without effect.
	pub async fn update_item_obtained(&self, code: &TeamCode, name: &str, obtained: bool) -> Result<()> {
		if self.phase(code).await == TeamPhase::Loading {
			debug!(team_code = %code, item = %name, "team loading, absorbing item update");
			return Ok(());
		}
		if !obtained {
			debug!(team_code = %code, item = %name, "ignoring request to clear obtained");
			return Ok(());
		}

		let canonical = self.canonical_name(code, name).await;
		self.inner.remote.patch_item(code, &canonical, true).await?;

		info!(team_code = %code, item = %canonical, reported = %name, "item obtained");

		if let Some(items) = self
			.inner
			.cache
			.modify(code, |items| mark_obtained(items, &canonical))
			.await
		{
			self.inner.listeners.notify(code, &items).await;
		}
		Ok(())
	}

	/// Replaces the team's item list, keeping every obtained flag already set
	/// remotely or locally.
	pub async fn update_team_items(&self, code: &TeamCode, items: Vec<Item>) -> Result<()> {
		if self.phase(code).await == TeamPhase::Loading {
			debug!(team_code = %code, count = items.len(), "team loading, absorbing items update");
			return Ok(());
		}

		let mut items = items;
		let record = self.inner.remote.get_team_record(code).await?;
		let mut promoted = preserve_obtained(&record.items, &mut items);
		if let Some(cached) = self.inner.cache.get(code).await {
			promoted += preserve_obtained(&cached, &mut items);
		}
		if promoted > 0 {
			debug!(team_code = %code, promoted, "kept obtained flags on items update");
		}

		self.inner.remote.bulk_replace_items(code, &items).await?;

		let stored = self.inner.cache.safely_update(code, items).await;
		self.inner.listeners.notify(code, &stored).await;
		Ok(())
	}

	/// Reloads the team regardless of phase. When the load fails but cached
	/// items exist, those are delivered and returned instead.
	///
	/// A successful refresh activates a team whose listener is registered but
	/// whose own load never completed.
	pub async fn refresh(&self, code: &TeamCode) -> Result<Vec<Item>> {
		match self.load(code, None).await {
			Ok((_, items)) => {
				if self.phase(code).await != TeamPhase::Active {
					if let Some(id) = self.inner.listeners.current(code).await {
						self.activate(code, id).await;
					}
				}
				Ok(items)
			}
			Err(e) => match self.inner.cache.get(code).await {
				Some(cached) if !cached.is_empty() => {
					warn!(team_code = %code, error = %e, "refresh failed, serving cached items");
					self.inner.listeners.notify(code, &cached).await;
					Ok(cached)
				}
				_ => Err(e),
			},
		}
	}

	/// Creates a team and seeds its items from the manual text or the remote
	/// document.
	pub async fn create_team(&self, request: &CreateTeamRequest) -> Result<TeamCode> {
		let inner = &self.inner;
		let code = inner.remote.create_team(request).await?;

		let items = match request.item_source_type {
			ItemSourceType::Remote => match inner.dedup.fetch(&code, &request.remote_url).await {
				Ok(items) => items,
				Err(e) => {
					warn!(team_code = %code, error = %e, "could not fetch initial item document");
					Vec::new()
				}
			},
			ItemSourceType::Manual => inner.dedup.resolver().parse(&request.manual_items).await,
		};

		if !items.is_empty() {
			if let Err(e) = inner.remote.bulk_replace_items(&code, &items).await {
				warn!(team_code = %code, error = %e, "could not seed team items");
			}
		}
		let stored = inner.cache.safely_update(&code, items).await;

		info!(team_code = %code, count = stored.len(), "team created");
		Ok(code)
	}

	/// Drops every trace of the team locally, then deletes it remotely.
	pub async fn delete_team(&self, code: &TeamCode) -> Result<()> {
		let inner = &self.inner;
		inner.listeners.unregister(code).await;
		inner.phases.write().await.remove(code);
		inner.dedup.cancel_team(code).await;
		inner.cache.remove(code).await;

		inner.remote.delete_team(code).await?;
		info!(team_code = %code, "team deleted");
		Ok(())
	}

	/// Evicts cache entries idle at `now`, keeping teams with a listener.
	pub async fn sweep_idle(&self, now: Instant) -> Vec<TeamCode> {
		let pinned: HashSet<TeamCode> = self.inner.listeners.registered_teams().await;
		self.inner.cache.sweep(now, &pinned).await
	}

	/// Runs [`sweep_idle`](Self::sweep_idle) every `sweep_interval` until the
	/// orchestrator is dropped or the handle aborted.
	pub fn spawn_janitor(&self) -> JoinHandle<()> {
		let weak = Arc::downgrade(&self.inner);
		let period = self.inner.config.sweep_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				let Some(orchestrator) = upgrade(&weak) else {
					debug!("orchestrator dropped, stopping janitor");
					break;
				};
				let evicted = orchestrator.sweep_idle(Instant::now()).await;
				debug!(evicted = evicted.len(), "cache sweep finished");
			}
		})
	}

	async fn activate(&self, code: &TeamCode, id: RegistrationId) -> bool {
		let mut phases = self.inner.phases.write().await;
		if self.inner.listeners.is_current(code, id).await {
			phases.insert(code.clone(), TeamPhase::Active);
			true
		} else {
			debug!(team_code = %code, registration = %id, "registration replaced, not activating");
			false
		}
	}

	/// Returns a team whose load failed to `Unregistered` so writes are not
	/// absorbed. A newer registration owns the phase and is left alone.
	async fn deactivate(&self, code: &TeamCode, id: RegistrationId) {
		let mut phases = self.inner.phases.write().await;
		if self.inner.listeners.is_current(code, id).await {
			phases.remove(code);
		}
	}

	/// Fetches the record, derives the item list, caches it and delivers it.
	///
	/// Obtained flags already in the cache are kept: a record read that
	/// started before a concurrent patch must not roll the patch back.
	async fn load(&self, code: &TeamCode, registration: Option<RegistrationId>) -> Result<(TeamRecord, Vec<Item>)> {
		let inner = &self.inner;
		let record = inner.remote.get_team_record(code).await?;

		let (mut items, needs_write) = self.derive_items(code, &record).await?;
		if let Some(cached) = inner.cache.get(code).await {
			let kept = preserve_obtained(&cached, &mut items);
			if kept > 0 {
				debug!(team_code = %code, kept, "kept cached obtained flags over stale record");
			}
		}
		let stored = inner.cache.safely_update(code, items).await;

		if needs_write && !stored.is_empty() {
			if let Err(e) = inner.remote.bulk_replace_items(code, &stored).await {
				warn!(team_code = %code, error = %e, "could not write derived items");
			}
		}

		match registration {
			Some(id) => inner.listeners.notify_registration(code, id, &stored).await,
			None => inner.listeners.notify(code, &stored).await,
		};

		debug!(team_code = %code, count = stored.len(), source = %record.item_source_type, "team loaded");
		Ok((record, stored))
	}

	/// Returns the team's items and whether they differ from what the backend
	/// holds.
	async fn derive_items(&self, code: &TeamCode, record: &TeamRecord) -> Result<(Vec<Item>, bool)> {
		let inner = &self.inner;

		if record.is_remote() {
			let mut definitions = inner.dedup.fetch(code, &record.remote_url).await?;
			if definitions.is_empty() {
				debug!(team_code = %code, "item document empty, keeping record items");
				return Ok((record.items.clone(), false));
			}
			inherit_obtained(&mut definitions, &record.items);
			let changed = definitions != record.items;
			return Ok((definitions, changed));
		}

		if record.items.is_empty() && !record.manual_items.trim().is_empty() {
			let parsed = inner.dedup.resolver().parse(&record.manual_items).await;
			let changed = !parsed.is_empty();
			return Ok((parsed, changed));
		}

		Ok((record.items.clone(), false))
	}

	/// Maps a reported name to the key the backend stores it under, waiting at
	/// most `resolve_timeout`. Falls back to `name`.
	async fn canonical_name(&self, code: &TeamCode, name: &str) -> String {
		let inner = &self.inner;
		let lookup = async {
			if let Some(found) = inner
				.cache
				.get(code)
				.await
				.and_then(|items| resolve_canonical_name(&items, name))
			{
				return Some(found);
			}
			match inner.remote.get_team_record(code).await {
				Ok(record) => resolve_canonical_name(&record.items, name),
				Err(e) => {
					debug!(team_code = %code, error = %e, "could not read record for name resolution");
					None
				}
			}
		};

		match tokio::time::timeout(inner.config.resolve_timeout, lookup).await {
			Ok(Some(canonical)) => canonical,
			Ok(None) => name.trim().to_string(),
			Err(_) => {
				warn!(team_code = %code, item = %name, "name resolution timed out");
				name.trim().to_string()
			}
		}
	}

	async fn start_poller(&self, code: &TeamCode, id: RegistrationId, record_minutes: u32) {
		let period = self.inner.config.refresh_interval_for(record_minutes);
		if period.is_zero() {
			return;
		}

		let weak = Arc::downgrade(&self.inner);
		let team = code.clone();
		let handle = tokio::spawn(poll_team(weak, team, id, period));
		self.inner.listeners.attach_poller(code, id, handle).await;
		debug!(team_code = %code, registration = %id, period_secs = period.as_secs(), "auto-refresh started");
	}
}

fn upgrade(weak: &Weak<Inner>) -> Option<SyncOrchestrator> {
	weak.upgrade().map(|inner| SyncOrchestrator { inner })
}

async fn poll_team(weak: Weak<Inner>, code: TeamCode, id: RegistrationId, period: Duration) {
	let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	loop {
		ticker.tick().await;
		let Some(orchestrator) = upgrade(&weak) else {
			break;
		};
		if !orchestrator.inner.listeners.is_current(&code, id).await {
			break;
		}
		if let Err(e) = orchestrator.refresh(&code).await {
			error!(team_code = %code, error = %e, "auto-refresh failed");
		}
	}
	debug!(team_code = %code, registration = %id, "auto-refresh stopped");
}
