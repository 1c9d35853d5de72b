// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header and bounded concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::trace;
use url::Url;

use crate::retry::{retry, RetryConfig};

/// Connection pool and timeout settings shared by every Teamboard client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
	/// Maximum time to establish a TCP/TLS connection.
	pub connect_timeout: Duration,
	/// Maximum time for a whole request, including reading the body.
	pub request_timeout: Duration,
	/// Idle connections kept per destination host.
	pub max_idle_per_host: usize,
	/// Requests allowed in flight across all destinations.
	pub max_concurrent_requests: usize,
	/// Requests allowed in flight against a single destination host.
	pub max_requests_per_host: usize,
}

impl Default for HttpSettings {
	fn default() -> Self {
		Self {
			connect_timeout: Duration::from_secs(10),
			request_timeout: Duration::from_secs(15),
			max_idle_per_host: 8,
			max_concurrent_requests: 64,
			max_requests_per_host: 5,
		}
	}
}

/// Creates a new HTTP client builder with the standard Teamboard User-Agent
/// header and the pool/timeout settings applied.
pub fn builder(settings: &HttpSettings) -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.connect_timeout(settings.connect_timeout)
		.timeout(settings.request_timeout)
		.pool_max_idle_per_host(settings.max_idle_per_host)
}

/// Creates a new HTTP client from the given settings.
pub fn new_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
	builder(settings).build()
}

/// Returns the standard Teamboard User-Agent string.
///
/// Format: `teamboard/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"teamboard/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

/// HTTP client that caps in-flight requests in total and per destination host.
///
/// Raw connection failures are retried once at this layer; every other error
/// is returned to the caller untouched.
#[derive(Clone)]
pub struct BoundedClient {
	client: Client,
	total: Arc<Semaphore>,
	per_host: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
	per_host_limit: usize,
	retry_config: RetryConfig,
}

impl BoundedClient {
	pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
		let client = new_client(settings)?;
		Ok(Self::from_client(client, settings))
	}

	/// Wraps an existing client, applying only the concurrency limits from
	/// `settings`.
	pub fn from_client(client: Client, settings: &HttpSettings) -> Self {
		Self {
			client,
			total: Arc::new(Semaphore::new(settings.max_concurrent_requests.max(1))),
			per_host: Arc::new(Mutex::new(HashMap::new())),
			per_host_limit: settings.max_requests_per_host.max(1),
			retry_config: RetryConfig::default(),
		}
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn inner(&self) -> &Client {
		&self.client
	}

	/// Hosts with no request in flight are dropped from the map; only the map
	/// itself holds their semaphore.
	async fn host_semaphore(&self, url: &Url) -> Arc<Semaphore> {
		let host = url.host_str().unwrap_or_default().to_string();
		let mut per_host = self.per_host.lock().await;
		per_host.retain(|name, semaphore| *name == host || Arc::strong_count(semaphore) > 1);
		Arc::clone(
			per_host
				.entry(host)
				.or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit))),
		)
	}

	#[cfg(test)]
	async fn tracked_hosts(&self) -> usize {
		self.per_host.lock().await.len()
	}

	/// Sends the request produced by `make`. One global and one per-host
	/// permit are held until the returned response, body included, is
	/// consumed or dropped.
	///
	/// `make` is called again for the single connection-failure retry.
	pub async fn send<F>(&self, url: &Url, make: F) -> Result<BoundedResponse, reqwest::Error>
	where
		F: Fn(&Client) -> RequestBuilder,
	{
		let host_semaphore = self.host_semaphore(url).await;
		let total_permit = Arc::clone(&self.total).acquire_owned().await.ok();
		let host_permit = host_semaphore.acquire_owned().await.ok();

		trace!(
			url = %url,
			available = self.total.available_permits(),
			"dispatching request"
		);

		let response = retry(&self.retry_config, || make(&self.client).send()).await?;
		Ok(BoundedResponse {
			response,
			_permits: (total_permit, host_permit),
		})
	}
}

/// A response whose body is read inside the client's concurrency bounds.
pub struct BoundedResponse {
	response: Response,
	_permits: (Option<OwnedSemaphorePermit>, Option<OwnedSemaphorePermit>),
}

impl BoundedResponse {
	pub fn status(&self) -> StatusCode {
		self.response.status()
	}

	pub async fn text(self) -> Result<String, reqwest::Error> {
		self.response.text().await
	}

	pub async fn json<T: DeserializeOwned>(self) -> Result<T, reqwest::Error> {
		self.response.json().await
	}

	/// Next chunk of the body, or `None` once it is exhausted.
	pub async fn chunk(&mut self) -> Result<Option<Bytes>, reqwest::Error> {
		self.response.chunk().await
	}
}
