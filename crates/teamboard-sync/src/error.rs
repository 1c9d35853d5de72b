// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::StatusCode;
use teamboard_common_http::RetryableError;
use teamboard_sync_core::TeamCode;
use thiserror::Error;

/// Failures talking to the team backend.
#[derive(Debug, Error)]
pub enum RemoteError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("team not found: {0}")]
	NotFound(TeamCode),

	#[error("server error: {status} - {message}")]
	Server { status: StatusCode, message: String },

	#[error("unexpected status: {0}")]
	UnexpectedStatus(StatusCode),

	#[error("invalid URL: {0}")]
	InvalidUrl(String),

	#[error("invalid request: {0}")]
	InvalidRequest(String),

	#[error("failed to decode response: {0}")]
	Decode(String),
}

impl RemoteError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}

impl RetryableError for RemoteError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Network(e) => e.is_retryable(),
			_ => false,
		}
	}
}

/// Failures fetching an external item-list document.
///
/// Cloneable because one result is handed to every deduplicated caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
	#[error("invalid document URL: {0}")]
	InvalidUrl(String),

	#[error("network error: {0}")]
	Network(String),

	#[error("document request failed with status {0}")]
	Status(u16),
}

impl From<reqwest::Error> for FetchError {
	fn from(e: reqwest::Error) -> Self {
		FetchError::Network(e.to_string())
	}
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("team not found: {0}")]
	TeamNotFound(TeamCode),

	#[error("remote store error: {0}")]
	Remote(RemoteError),

	#[error("document fetch error: {0}")]
	Fetch(#[from] FetchError),

	#[error("invalid request: {0}")]
	InvalidRequest(String),
}

impl SyncError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::TeamNotFound(_))
	}
}

impl From<RemoteError> for SyncError {
	fn from(e: RemoteError) -> Self {
		match e {
			RemoteError::NotFound(code) => SyncError::TeamNotFound(code),
			RemoteError::InvalidRequest(message) => SyncError::InvalidRequest(message),
			other => SyncError::Remote(other),
		}
	}
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn not_found_maps_to_team_not_found() {
		let code = TeamCode::from_string("ABC".to_string());
		let err: SyncError = RemoteError::NotFound(code.clone()).into();
		assert!(err.is_not_found());
		assert!(matches!(err, SyncError::TeamNotFound(c) if c == code));
	}

	#[test]
	fn server_errors_stay_remote() {
		let err: SyncError = RemoteError::Server {
			status: StatusCode::BAD_GATEWAY,
			message: "upstream".to_string(),
		}
		.into();
		assert!(!err.is_not_found());
		assert!(matches!(err, SyncError::Remote(_)));
	}

	#[test]
	fn only_network_errors_are_retryable() {
		assert!(!RemoteError::UnexpectedStatus(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
		assert!(!RemoteError::Decode("bad json".to_string()).is_retryable());
		assert!(!RemoteError::NotFound(TeamCode::from_string("X".to_string())).is_retryable());
	}
}
