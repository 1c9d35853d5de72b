// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Access to the shared team backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use teamboard_common_http::{BoundedClient, BoundedResponse};
use teamboard_sync_core::{escape_key, preserve_obtained, CreateTeamRequest, Item, TeamCode, TeamRecord};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SyncConfig;
use crate::error::RemoteError;
use crate::wire::{items_to_wire, CreateTeamResponse, PatchItemRequest, TeamRecordWire};

/// Operations the engine needs from the team backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Creates a team and returns the backend-assigned code.
	async fn create_team(&self, request: &CreateTeamRequest) -> Result<TeamCode, RemoteError>;

	/// Any failure is reported as `false`.
	async fn team_exists(&self, code: &TeamCode) -> bool;

	async fn get_team_record(&self, code: &TeamCode) -> Result<TeamRecord, RemoteError>;

	/// Replaces the team's whole item map without demoting any item that is
	/// currently obtained on the backend.
	async fn bulk_replace_items(&self, code: &TeamCode, items: &[Item]) -> Result<(), RemoteError>;

	/// Writes one item's obtained flag. `name` must already be canonical.
	async fn patch_item(&self, code: &TeamCode, name: &str, obtained: bool) -> Result<(), RemoteError>;

	/// Deleting a team that does not exist succeeds.
	async fn delete_team(&self, code: &TeamCode) -> Result<(), RemoteError>;
}

/// [`RemoteStore`] over the backend's JSON HTTP API.
#[derive(Clone)]
pub struct HttpRemoteStore {
	base_url: Url,
	http: BoundedClient,
}

impl HttpRemoteStore {
	pub fn new(base_url: Url, http: BoundedClient) -> Self {
		Self { base_url, http }
	}

	pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
		let base_url =
			Url::parse(&config.base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
		let http = BoundedClient::new(&config.http)?;
		Ok(Self::new(base_url, http))
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
		let mut url = self.base_url.clone();
		url
			.path_segments_mut()
			.map_err(|_| RemoteError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn team_url(&self, code: &TeamCode, rest: &[&str]) -> Result<Url, RemoteError> {
		let mut segments = vec!["teams", code.as_str()];
		segments.extend_from_slice(rest);
		self.endpoint(&segments)
	}

	async fn fetch_record(&self, code: &TeamCode) -> Result<TeamRecord, RemoteError> {
		let url = self.team_url(code, &[])?;

		debug!(team_code = %code, url = %url, "fetching team record");

		let response = self.http.send(&url, |c| c.get(url.clone())).await?;

		match response.status() {
			StatusCode::OK => {
				let wire: TeamRecordWire = response
					.json()
					.await
					.map_err(|e| RemoteError::Decode(e.to_string()))?;
				let record = wire.into_record(code);
				debug!(team_code = %code, count = record.items.len(), "fetched team record");
				Ok(record)
			}
			StatusCode::NOT_FOUND => {
				debug!(team_code = %code, "team not found on server");
				Err(RemoteError::NotFound(code.clone()))
			}
			_ => Err(status_error(response).await),
		}
	}
}

async fn status_error(response: BoundedResponse) -> RemoteError {
	let status = response.status();
	if status.is_server_error() {
		let message = response.text().await.unwrap_or_default();
		RemoteError::Server { status, message }
	} else if status == StatusCode::BAD_REQUEST {
		let message = response.text().await.unwrap_or_default();
		RemoteError::InvalidRequest(message)
	} else {
		RemoteError::UnexpectedStatus(status)
	}
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
	async fn create_team(&self, request: &CreateTeamRequest) -> Result<TeamCode, RemoteError> {
		if request.team_name.trim().is_empty() {
			return Err(RemoteError::InvalidRequest("team name is empty".to_string()));
		}

		let url = self.endpoint(&["teams"])?;

		debug!(
			team_name = %request.team_name,
			source = %request.item_source_type,
			url = %url,
			"creating team"
		);

		let response = self
			.http
			.send(&url, |c| c.post(url.clone()).json(request))
			.await?;

		match response.status() {
			StatusCode::OK | StatusCode::CREATED => {
				let created: CreateTeamResponse = response
					.json()
					.await
					.map_err(|e| RemoteError::Decode(e.to_string()))?;
				info!(team_code = %created.team_code, "created team");
				Ok(created.team_code)
			}
			_ => Err(status_error(response).await),
		}
	}

	async fn team_exists(&self, code: &TeamCode) -> bool {
		let url = match self.team_url(code, &["exists"]) {
			Ok(url) => url,
			Err(e) => {
				warn!(team_code = %code, error = %e, "cannot build team existence url");
				return false;
			}
		};

		match self.http.send(&url, |c| c.get(url.clone())).await {
			Ok(response) => response.status().is_success(),
			Err(e) => {
				debug!(team_code = %code, error = %e, "team existence check failed");
				false
			}
		}
	}

	async fn get_team_record(&self, code: &TeamCode) -> Result<TeamRecord, RemoteError> {
		self.fetch_record(code).await
	}

	async fn bulk_replace_items(&self, code: &TeamCode, items: &[Item]) -> Result<(), RemoteError> {
		let mut items = items.to_vec();

		match self.fetch_record(code).await {
			Ok(current) => {
				let promoted = preserve_obtained(&current.items, &mut items);
				if promoted > 0 {
					debug!(team_code = %code, promoted, "kept remote obtained flags");
				}
			}
			Err(RemoteError::NotFound(_)) => {
				debug!(team_code = %code, "no remote record yet, writing unguarded");
			}
			Err(e) => {
				warn!(team_code = %code, error = %e, "aborting bulk write, pre-read failed");
				return Err(e);
			}
		}

		let url = self.team_url(code, &["items"])?;
		let body = items_to_wire(&items);

		debug!(team_code = %code, count = items.len(), url = %url, "replacing team items");

		let response = self.http.send(&url, |c| c.put(url.clone()).json(&body)).await?;

		match response.status() {
			StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
				info!(team_code = %code, count = items.len(), "replaced team items");
				Ok(())
			}
			StatusCode::NOT_FOUND => Err(RemoteError::NotFound(code.clone())),
			_ => Err(status_error(response).await),
		}
	}

	async fn patch_item(&self, code: &TeamCode, name: &str, obtained: bool) -> Result<(), RemoteError> {
		if name.trim().is_empty() {
			return Err(RemoteError::InvalidRequest("item name is empty".to_string()));
		}

		let key = escape_key(name);
		let url = self.team_url(code, &["items", &key])?;
		let body = PatchItemRequest::new(obtained);

		debug!(team_code = %code, item = %name, obtained, url = %url, "patching item");

		let response = self
			.http
			.send(&url, |c| c.patch(url.clone()).json(&body))
			.await?;

		match response.status() {
			StatusCode::OK | StatusCode::NO_CONTENT => {
				debug!(team_code = %code, item = %name, "patched item");
				Ok(())
			}
			StatusCode::NOT_FOUND => Err(RemoteError::NotFound(code.clone())),
			_ => Err(status_error(response).await),
		}
	}

	async fn delete_team(&self, code: &TeamCode) -> Result<(), RemoteError> {
		let url = self.team_url(code, &[])?;

		debug!(team_code = %code, url = %url, "deleting team");

		let response = self.http.send(&url, |c| c.delete(url.clone())).await?;

		match response.status() {
			StatusCode::OK | StatusCode::NO_CONTENT => {
				info!(team_code = %code, "deleted team");
				Ok(())
			}
			StatusCode::NOT_FOUND => {
				debug!(team_code = %code, "team already absent");
				Ok(())
			}
			_ => Err(status_error(response).await),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{json, Value};
	use teamboard_common_http::HttpSettings;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn store(server: &MockServer) -> HttpRemoteStore {
		let config = SyncConfig::default().with_base_url(format!("{}/", server.uri()));
		HttpRemoteStore::from_config(&config).unwrap()
	}

	fn code() -> TeamCode {
		TeamCode::from_string("T1".to_string())
	}

	fn record_body() -> Value {
		json!({
			"teamName": "Raiders",
			"itemSourceType": "MANUAL",
			"items": {
				"A": {"name": "A", "itemId": 1, "obtained": true},
				"B": {"name": "B", "itemId": 2, "obtained": false}
			}
		})
	}

	#[tokio::test]
	async fn get_team_record_decodes_items() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(record_body()))
			.mount(&server)
			.await;

		let record = store(&server).get_team_record(&code()).await.unwrap();

		assert_eq!(record.team_name, "Raiders");
		assert_eq!(record.team_code, Some(code()));
		assert_eq!(record.items.len(), 2);
		assert!(record.items[0].obtained);
	}

	#[tokio::test]
	async fn missing_team_maps_to_not_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let err = store(&server).get_team_record(&code()).await.unwrap_err();
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn server_error_carries_message() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(500).set_body_string("database down"))
			.mount(&server)
			.await;

		let err = store(&server).get_team_record(&code()).await.unwrap_err();
		match err {
			RemoteError::Server { status, message } => {
				assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
				assert_eq!(message, "database down");
			}
			other => panic!("expected server error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn create_team_rejects_empty_name_without_io() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let err = store(&server)
			.create_team(&CreateTeamRequest::new("   "))
			.await
			.unwrap_err();
		assert!(matches!(err, RemoteError::InvalidRequest(_)));
	}

	#[tokio::test]
	async fn create_team_returns_assigned_code() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/teams"))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({"teamCode": "NEW1"})))
			.expect(1)
			.mount(&server)
			.await;

		let request = CreateTeamRequest::new("Raiders").with_leader("Zezima");
		let code = store(&server).create_team(&request).await.unwrap();
		assert_eq!(code.as_str(), "NEW1");

		let received = server.received_requests().await.unwrap();
		let body: Value = received[0].body_json().unwrap();
		assert_eq!(body["teamName"], "Raiders");
		assert_eq!(body["leader"], "Zezima");
	}

	#[tokio::test]
	async fn bulk_replace_never_demotes_remote_obtained() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(record_body()))
			.mount(&server)
			.await;
		Mock::given(method("PUT"))
			.and(path("/teams/T1/items"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let items = vec![Item::new("A"), Item::new("B"), Item::new("C.d")];
		store(&server).bulk_replace_items(&code(), &items).await.unwrap();

		let received = server.received_requests().await.unwrap();
		let put = received
			.iter()
			.find(|r| r.method.as_str() == "PUT")
			.unwrap();
		let body: Value = put.body_json().unwrap();
		assert_eq!(body["A"]["obtained"], true);
		assert_eq!(body["B"]["obtained"], false);
		assert_eq!(body["C_DOT_d"]["name"], "C.d");
	}

	#[tokio::test]
	async fn bulk_replace_proceeds_when_record_missing() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;
		Mock::given(method("PUT"))
			.and(path("/teams/T1/items"))
			.respond_with(ResponseTemplate::new(204))
			.expect(1)
			.mount(&server)
			.await;

		store(&server)
			.bulk_replace_items(&code(), &[Item::new("A")])
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn bulk_replace_aborts_when_pre_read_fails() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let err = store(&server)
			.bulk_replace_items(&code(), &[Item::new("A")])
			.await
			.unwrap_err();
		assert!(matches!(err, RemoteError::Server { .. }));
	}

	#[tokio::test]
	async fn patch_item_uses_escaped_key() {
		let server = MockServer::start().await;
		Mock::given(method("PATCH"))
			.and(path("/teams/T1/items/Rune_DOT_platebody"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		store(&server)
			.patch_item(&code(), "Rune.platebody", true)
			.await
			.unwrap();

		let received = server.received_requests().await.unwrap();
		let body: Value = received[0].body_json().unwrap();
		assert_eq!(body["obtained"], true);
		assert!(body["updatedAt"].as_i64().is_some());
	}

	#[tokio::test]
	async fn delete_treats_missing_team_as_success() {
		let server = MockServer::start().await;
		Mock::given(method("DELETE"))
			.and(path("/teams/T1"))
			.respond_with(ResponseTemplate::new(404))
			.expect(1)
			.mount(&server)
			.await;

		store(&server).delete_team(&code()).await.unwrap();
	}

	#[tokio::test]
	async fn team_exists_is_false_on_failure() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/teams/T1/exists"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let store = store(&server);
		assert!(store.team_exists(&code()).await);
		assert!(!store.team_exists(&TeamCode::from_string("NOPE".to_string())).await);

		let unreachable = HttpRemoteStore::new(
			Url::parse("http://127.0.0.1:9/").unwrap(),
			BoundedClient::new(&HttpSettings::default()).unwrap(),
		);
		assert!(!unreachable.team_exists(&code()).await);
	}
}
