// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Collapsing concurrent document fetches into one network call.
//!
//! Requests are keyed by team and normalized URL. The first caller spawns the
//! fetch-and-parse work; later callers await the same shared result. The
//! spawned task removes its own table entry once it settles, and entries are
//! generation-checked so a newer request for the same key is never removed by
//! an older task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use teamboard_sync_core::{Item, TeamCode};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::document::{normalize_document_url, DocumentFetcher};
use crate::error::FetchError;
use crate::source::ItemSourceResolver;

type SharedFetch = Shared<BoxFuture<'static, Result<Vec<Item>, FetchError>>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DedupKey {
	team: TeamCode,
	url: String,
}

struct InFlight {
	id: u64,
	future: SharedFetch,
	cancel: CancellationToken,
}

type InFlightMap = Arc<Mutex<HashMap<DedupKey, InFlight>>>;

pub struct RequestDeduplicator {
	fetcher: Arc<dyn DocumentFetcher>,
	resolver: ItemSourceResolver,
	in_flight: InFlightMap,
	next_id: AtomicU64,
}

impl RequestDeduplicator {
	pub fn new(fetcher: Arc<dyn DocumentFetcher>, resolver: ItemSourceResolver) -> Self {
		Self {
			fetcher,
			resolver,
			in_flight: Arc::new(Mutex::new(HashMap::new())),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn resolver(&self) -> &ItemSourceResolver {
		&self.resolver
	}

	/// Fetches and parses the document at `raw_url` for `code`, sharing the
	/// work with any identical request already in flight.
	///
	/// A request cancelled through [`cancel_team`](Self::cancel_team)
	/// resolves to an empty list.
	pub async fn fetch(&self, code: &TeamCode, raw_url: &str) -> Result<Vec<Item>, FetchError> {
		let url = normalize_document_url(raw_url, code)?;
		let key = DedupKey {
			team: code.clone(),
			url: url.to_string(),
		};

		let shared = {
			let mut in_flight = self.in_flight.lock().await;
			match in_flight.get(&key) {
				Some(entry) => {
					debug!(team_code = %code, url = %key.url, "joining in-flight document fetch");
					entry.future.clone()
				}
				None => {
					let id = self.next_id.fetch_add(1, Ordering::Relaxed);
					let cancel = CancellationToken::new();
					let handle = tokio::spawn(run_fetch(
						Arc::clone(&self.fetcher),
						self.resolver.clone(),
						url,
						cancel.clone(),
						Arc::clone(&self.in_flight),
						key.clone(),
						id,
					));
					let future = async move {
						match handle.await {
							Ok(result) => result,
							Err(e) => Err(FetchError::Network(format!("document task failed: {e}"))),
						}
					}
					.boxed()
					.shared();
					in_flight.insert(
						key,
						InFlight {
							id,
							future: future.clone(),
							cancel,
						},
					);
					future
				}
			}
		};

		shared.await
	}

	/// Cancels every in-flight fetch for `code`. Returns how many were
	/// cancelled.
	pub async fn cancel_team(&self, code: &TeamCode) -> usize {
		let mut in_flight = self.in_flight.lock().await;
		let keys: Vec<DedupKey> = in_flight
			.keys()
			.filter(|key| &key.team == code)
			.cloned()
			.collect();

		for key in &keys {
			if let Some(entry) = in_flight.remove(key) {
				entry.cancel.cancel();
			}
		}

		if !keys.is_empty() {
			debug!(team_code = %code, cancelled = keys.len(), "cancelled in-flight document fetches");
		}
		keys.len()
	}

	pub async fn in_flight_count(&self) -> usize {
		self.in_flight.lock().await.len()
	}
}

async fn run_fetch(
	fetcher: Arc<dyn DocumentFetcher>,
	resolver: ItemSourceResolver,
	url: Url,
	cancel: CancellationToken,
	in_flight: InFlightMap,
	key: DedupKey,
	id: u64,
) -> Result<Vec<Item>, FetchError> {
	let work = async {
		let body = fetcher.fetch(&url).await?;
		Ok::<_, FetchError>(resolver.parse(&body).await)
	};

	let result = tokio::select! {
		biased;
		_ = cancel.cancelled() => {
			debug!(team_code = %key.team, url = %key.url, "document fetch cancelled");
			Ok(Vec::new())
		}
		result = work => result,
	};

	if let Err(e) = &result {
		warn!(team_code = %key.team, url = %key.url, error = %e, "document fetch failed");
	}

	let mut in_flight = in_flight.lock().await;
	if in_flight.get(&key).is_some_and(|entry| entry.id == id) {
		in_flight.remove(&key);
	}

	result
}
