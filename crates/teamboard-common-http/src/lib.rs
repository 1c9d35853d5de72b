// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Teamboard.
//!
//! This crate provides:
//! - A pre-configured HTTP client with consistent User-Agent header and timeouts
//! - A [`BoundedClient`] that caps total and per-destination concurrency
//! - A single transport-level retry for raw connection failures

mod client;
mod retry;

pub use client::{builder, new_client, user_agent, BoundedClient, BoundedResponse, HttpSettings};
pub use retry::{retry, RetryConfig, RetryableError};
