// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Fetching externally hosted item-list documents.

use async_trait::async_trait;
use chrono::Utc;
use teamboard_common_http::BoundedClient;
use teamboard_sync_core::TeamCode;
use tracing::debug;
use url::Url;

use crate::config::MAX_DOCUMENT_BYTES;
use crate::error::FetchError;

/// Query parameter scoping a document URL to one team.
pub const TEAM_PARAM: &str = "team";

/// Per-dispatch cache-busting query parameter.
pub const CACHE_BUST_PARAM: &str = "cb";

/// Retrieves the raw text of an item-list document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
	async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// [`DocumentFetcher`] over the shared bounded HTTP client.
///
/// The body is streamed and reading stops once `max_bytes` have arrived.
#[derive(Clone)]
pub struct HttpDocumentFetcher {
	http: BoundedClient,
	max_bytes: usize,
}

impl HttpDocumentFetcher {
	pub fn new(http: BoundedClient) -> Self {
		Self {
			http,
			max_bytes: MAX_DOCUMENT_BYTES,
		}
	}

	pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
		self.max_bytes = max_bytes;
		self
	}
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
	async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
		let mut url = url.clone();
		url
			.query_pairs_mut()
			.append_pair(CACHE_BUST_PARAM, &Utc::now().timestamp_millis().to_string());

		debug!(url = %url, "fetching item document");

		let mut response = self.http.send(&url, |c| c.get(url.clone())).await?;
		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status(status.as_u16()));
		}

		let mut body: Vec<u8> = Vec::new();
		let mut truncated = false;
		while let Some(chunk) = response.chunk().await? {
			let room = self.max_bytes - body.len();
			if chunk.len() >= room {
				body.extend_from_slice(&chunk[..room]);
				truncated = true;
				break;
			}
			body.extend_from_slice(&chunk);
		}

		if truncated {
			debug!(url = %url, kept = body.len(), "item document reached size limit, stopped reading");
			trim_partial_char(&mut body);
		}
		debug!(url = %url, bytes = body.len(), "fetched item document");
		Ok(String::from_utf8_lossy(&body).into_owned())
	}
}

/// Drops a multi-byte sequence cut off by truncation.
fn trim_partial_char(body: &mut Vec<u8>) {
	if let Err(e) = std::str::from_utf8(body) {
		if e.error_len().is_none() {
			body.truncate(e.valid_up_to());
		}
	}
}

/// Rewrites paste-hosting page URLs to their raw form and scopes the result to
/// `code` with a `team` query parameter.
///
/// - `pastebin.com/<id>` becomes `pastebin.com/raw/<id>`
/// - `gist.github.com/<user>/<id>` becomes `gist.githubusercontent.com/<user>/<id>/raw`
/// - `github.com/<owner>/<repo>/blob/<path>` becomes
///   `raw.githubusercontent.com/<owner>/<repo>/<path>`
pub fn normalize_document_url(raw: &str, code: &TeamCode) -> Result<Url, FetchError> {
	let raw = raw.trim();
	let mut url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(FetchError::InvalidUrl(format!(
			"{raw}: unsupported scheme {}",
			url.scheme()
		)));
	}

	let segments: Vec<String> = url
		.path_segments()
		.map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
		.unwrap_or_default();
	let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

	let rewrite: Option<(&str, Vec<String>)> = match (host.as_str(), segments.as_slice()) {
		("pastebin.com" | "www.pastebin.com", [id]) if id != "raw" => {
			Some(("pastebin.com", vec!["raw".to_string(), id.clone()]))
		}
		("gist.github.com", [user, id]) => Some((
			"gist.githubusercontent.com",
			vec![user.clone(), id.clone(), "raw".to_string()],
		)),
		("github.com" | "www.github.com", [owner, repo, blob, rest @ ..])
			if blob == "blob" && !rest.is_empty() =>
		{
			let mut path = vec![owner.clone(), repo.clone()];
			path.extend(rest.iter().cloned());
			Some(("raw.githubusercontent.com", path))
		}
		_ => None,
	};

	if let Some((new_host, path)) = rewrite {
		url
			.set_host(Some(new_host))
			.map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
		url.set_path(&path.join("/"));
	}

	let retained: Vec<(String, String)> = url
		.query_pairs()
		.filter(|(key, _)| key != TEAM_PARAM && key != CACHE_BUST_PARAM)
		.map(|(key, value)| (key.into_owned(), value.into_owned()))
		.collect();
	url.set_query(None);
	{
		let mut query = url.query_pairs_mut();
		for (key, value) in &retained {
			query.append_pair(key, value);
		}
		query.append_pair(TEAM_PARAM, code.as_str());
	}

	Ok(url)
}

#[cfg(test)]
mod tests {
	use super::*;
	use teamboard_common_http::HttpSettings;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn code() -> TeamCode {
		TeamCode::from_string("T1".to_string())
	}

	#[test]
	fn pastebin_page_becomes_raw() {
		let url = normalize_document_url("https://pastebin.com/abc123", &code()).unwrap();
		assert_eq!(url.as_str(), "https://pastebin.com/raw/abc123?team=T1");
	}

	#[test]
	fn pastebin_raw_is_left_alone() {
		let url = normalize_document_url("https://pastebin.com/raw/abc123", &code()).unwrap();
		assert_eq!(url.as_str(), "https://pastebin.com/raw/abc123?team=T1");
	}

	#[test]
	fn gist_page_becomes_raw() {
		let url = normalize_document_url("https://gist.github.com/someone/deadbeef", &code()).unwrap();
		assert_eq!(
			url.as_str(),
			"https://gist.githubusercontent.com/someone/deadbeef/raw?team=T1"
		);
	}

	#[test]
	fn github_blob_becomes_raw() {
		let url = normalize_document_url(
			"https://github.com/owner/repo/blob/main/lists/items.txt",
			&code(),
		)
		.unwrap();
		assert_eq!(
			url.as_str(),
			"https://raw.githubusercontent.com/owner/repo/main/lists/items.txt?team=T1"
		);
	}

	#[test]
	fn other_hosts_keep_path_and_query() {
		let url = normalize_document_url("https://example.com/list.json?v=2&team=OLD", &code()).unwrap();
		assert_eq!(url.as_str(), "https://example.com/list.json?v=2&team=T1");
	}

	#[test]
	fn invalid_urls_are_rejected() {
		assert!(matches!(
			normalize_document_url("not a url", &code()),
			Err(FetchError::InvalidUrl(_))
		));
		assert!(matches!(
			normalize_document_url("ftp://example.com/list", &code()),
			Err(FetchError::InvalidUrl(_))
		));
	}

	#[tokio::test]
	async fn http_fetcher_adds_cache_bust_parameter() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/list.txt"))
			.and(query_param("team", "T1"))
			.respond_with(ResponseTemplate::new(200).set_body_string("Whip\nClaws"))
			.expect(1)
			.mount(&server)
			.await;

		let fetcher = HttpDocumentFetcher::new(BoundedClient::new(&HttpSettings::default()).unwrap());
		let url = normalize_document_url(&format!("{}/list.txt", server.uri()), &code()).unwrap();

		let body = fetcher.fetch(&url).await.unwrap();
		assert_eq!(body, "Whip\nClaws");

		let received = server.received_requests().await.unwrap();
		assert!(received[0].url.query_pairs().any(|(k, _)| k == CACHE_BUST_PARAM));
	}

	#[tokio::test]
	async fn http_fetcher_stops_at_size_limit() {
		let server = MockServer::start().await;
		let big = "Abyssal whip\n".repeat(10_000);
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_string(big))
			.mount(&server)
			.await;

		let fetcher = HttpDocumentFetcher::new(BoundedClient::new(&HttpSettings::default()).unwrap())
			.with_max_bytes(26);
		let url = Url::parse(&format!("{}/big.txt", server.uri())).unwrap();

		assert_eq!(fetcher.fetch(&url).await.unwrap(), "Abyssal whip\nAbyssal whip\n");
	}

	#[test]
	fn partial_trailing_char_is_dropped() {
		let mut body = "aé".as_bytes()[..2].to_vec();
		trim_partial_char(&mut body);
		assert_eq!(body, b"a");

		let mut whole = "aé".as_bytes().to_vec();
		trim_partial_char(&mut whole);
		assert_eq!(whole.len(), 3);
	}

	#[tokio::test]
	async fn http_fetcher_reports_status() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let fetcher = HttpDocumentFetcher::new(BoundedClient::new(&HttpSettings::default()).unwrap());
		let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();

		assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Status(404)));
	}
}
