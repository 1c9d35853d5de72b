// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Core types for the Teamboard sync engine.
//!
//! This crate holds the shared data model and the pure rules that every write
//! path agrees on:
//!
//! - [`TeamCode`], [`TeamRecord`] and [`ItemSourceType`]
//! - [`Item`] and [`GroupDefinition`], including case-insensitive slot matching
//! - [`escape_key`] / [`unescape_key`] for backend key segments
//! - [`preserve_obtained`] and [`inherit_obtained`], the monotonic obtained merge
//!
//! Nothing in here performs I/O.

pub mod error;
pub mod escape;
pub mod item;
pub mod merge;
pub mod team;

pub use error::TeamCodeError;
pub use escape::{escape_key, unescape_key};
pub use item::{resolve_canonical_name, GroupDefinition, Item, GROUP_DELIMITER, UNRESOLVED_ITEM_ID};
pub use merge::{inherit_obtained, mark_obtained, preserve_obtained};
pub use team::{CreateTeamRequest, ItemSourceType, TeamCode, TeamRecord};
