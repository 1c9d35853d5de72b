// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Team board synchronization and caching engine.
//!
//! Several clients share one checklist through a remote backend. This crate
//! keeps a local copy of each team's items in step with that backend and with
//! an optional externally hosted item-list document.
//!
//! - [`SyncOrchestrator`]: per-team lifecycle, write gating and refresh
//! - [`RemoteStore`] / [`HttpRemoteStore`]: the team backend
//! - [`ItemSourceResolver`]: parsing item documents and manual text
//! - [`CacheManager`]: item snapshots with idle eviction
//! - [`RequestDeduplicator`]: one network call per concurrent document fetch
//! - [`ListenerRegistry`]: one update callback per team
//!
//! An item, once obtained, is never reported as not obtained again.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod dedup;
pub mod document;
pub mod error;
pub mod listener;
pub mod orchestrator;
pub mod remote;
pub mod source;
mod wire;

pub use cache::CacheManager;
pub use catalog::{ItemCatalog, NoopCatalog, StaticCatalog};
pub use config::{SyncConfig, CACHE_TTL, MAX_DOCUMENT_BYTES, MAX_ITEMS};
pub use dedup::RequestDeduplicator;
pub use document::{normalize_document_url, DocumentFetcher, HttpDocumentFetcher};
pub use error::{FetchError, RemoteError, Result, SyncError};
pub use listener::{ItemsListener, ListenerRegistry, RegistrationId};
pub use orchestrator::{SyncOrchestrator, TeamPhase};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use source::ItemSourceResolver;

pub use teamboard_sync_core::{
	CreateTeamRequest, GroupDefinition, Item, ItemSourceType, TeamCode, TeamRecord,
};
