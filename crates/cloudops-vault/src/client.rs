// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vault HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use cloudops_common_secret::SecretString;
use cloudops_credentials::{
	BackendError, BackendResult, LogicalBackend, Payload, PolicyBackend, SecretResponse,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};
use url::{Host, Url};

use crate::error::{VaultError, VaultResult};
use crate::http;

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8200";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
const API_PREFIX: &str = "v1/";
const POLICY_PREFIX: &str = "sys/policies/acl";
const MAX_ERROR_BODY: usize = 200;

/// Configuration for the Vault client.
#[derive(Debug, Clone)]
pub struct VaultClientConfig {
	/// Base address, e.g. `https://vault.internal:8200`.
	pub address: String,
	/// Sent as `X-Vault-Token`.
	pub token: Option<SecretString>,
	/// Enterprise namespace, sent as `X-Vault-Namespace`.
	pub namespace: Option<String>,
	pub timeout: Duration,
	/// Allow plain HTTP to a non-loopback host.
	/// Default: false (require HTTPS)
	pub allow_insecure: bool,
}

impl Default for VaultClientConfig {
	fn default() -> Self {
		Self {
			address: DEFAULT_ADDRESS.to_string(),
			token: None,
			namespace: None,
			timeout: DEFAULT_TIMEOUT,
			allow_insecure: false,
		}
	}
}

/// Error body returned by Vault on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	errors: Vec<String>,
}

/// Client for the Vault HTTP API implementing both backend traits.
///
/// Requests are not retried.
pub struct VaultClient {
	http_client: reqwest::Client,
	base_url: Url,
	token: Option<SecretString>,
	namespace: Option<String>,
}

impl VaultClient {
	/// Create a client, validating the address.
	///
	/// # Security
	///
	/// Plain `http://` is only accepted for loopback hosts unless
	/// `allow_insecure` is set, so the token is never sent in clear text to a
	/// remote server by accident.
	pub fn new(config: VaultClientConfig) -> VaultResult<Self> {
		let mut base_url = Url::parse(&config.address)?;
		match base_url.scheme() {
			"https" => {}
			"http" if config.allow_insecure || is_loopback(&base_url) => {}
			"http" => {
				return Err(VaultError::Configuration(
					"vault address must use HTTPS (set allow_insecure=true to permit HTTP)".into(),
				))
			}
			other => {
				return Err(VaultError::Configuration(format!(
					"unsupported vault address scheme: {other}"
				)))
			}
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}

		let http_client = http::builder_with_timeout(config.timeout).build()?;

		Ok(Self {
			http_client,
			base_url,
			token: config.token,
			namespace: config.namespace.filter(|ns| !ns.is_empty()),
		})
	}

	pub fn address(&self) -> &Url {
		&self.base_url
	}

	fn url(&self, path: &str) -> BackendResult<Url> {
		self
			.base_url
			.join(&format!("{API_PREFIX}{}", path.trim_start_matches('/')))
			.map_err(|e| BackendError::Transport(format!("invalid request path {path}: {e}")))
	}

	fn request(&self, method: Method, path: &str) -> BackendResult<RequestBuilder> {
		let mut request = self.http_client.request(method, self.url(path)?);
		if let Some(token) = &self.token {
			request = request.header(TOKEN_HEADER, token.expose().as_str());
		}
		if let Some(namespace) = &self.namespace {
			request = request.header(NAMESPACE_HEADER, namespace.as_str());
		}
		Ok(request)
	}

	async fn execute(
		&self,
		request: RequestBuilder,
		path: &str,
	) -> BackendResult<(StatusCode, Vec<u8>)> {
		let response = request.send().await.map_err(|e| {
			error!(path, error = %e, "vault request failed");
			BackendError::Transport(e.to_string())
		})?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|e| BackendError::Transport(e.to_string()))?
			.to_vec();
		debug!(path, status = %status, "vault response");
		Ok((status, body))
	}
}

impl std::fmt::Debug for VaultClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VaultClient")
			.field("base_url", &self.base_url.as_str())
			.field("namespace", &self.namespace)
			.field("has_token", &self.token.is_some())
			.finish()
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn api_error(status: StatusCode, body: &[u8]) -> BackendError {
	let errors = match serde_json::from_slice::<ErrorBody>(body) {
		Ok(parsed) => parsed.errors,
		Err(_) => {
			let text = sanitize_body_for_error(&String::from_utf8_lossy(body), MAX_ERROR_BODY);
			if text.trim().is_empty() {
				Vec::new()
			} else {
				vec![text]
			}
		}
	};
	BackendError::Api {
		status: status.as_u16(),
		errors,
	}
}

/// Interpret a reply to a request that may return a body.
///
/// With `missing_is_none`, a 404 carrying no error messages means nothing is
/// stored at the path. A 404 with messages (unmounted engine, no handler) is
/// still an error.
fn parse_reply(
	status: StatusCode,
	body: &[u8],
	path: &str,
	missing_is_none: bool,
) -> BackendResult<Option<SecretResponse>> {
	if !status.is_success() {
		let err = api_error(status, body);
		if missing_is_none && status == StatusCode::NOT_FOUND {
			if let BackendError::Api { errors, .. } = &err {
				if errors.is_empty() {
					return Ok(None);
				}
			}
		}
		error!(path, status = %status, error = %err, "vault rejected request");
		return Err(err);
	}

	if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
		return Ok(None);
	}

	serde_json::from_slice(body)
		.map(Some)
		.map_err(|e| BackendError::InvalidResponse(format!("{path}: {e}")))
}

fn sanitize_body_for_error(body: &str, max_len: usize) -> String {
	let sanitized: String = body
		.chars()
		.filter(|c| !c.is_control() || *c == ' ')
		.take(max_len)
		.collect();
	if body.chars().count() > max_len {
		format!("{sanitized}...")
	} else {
		sanitized
	}
}

#[async_trait]
impl LogicalBackend for VaultClient {
	#[instrument(skip(self))]
	async fn read(&self, path: &str) -> BackendResult<Option<SecretResponse>> {
		let request = self.request(Method::GET, path)?;
		let (status, body) = self.execute(request, path).await?;
		parse_reply(status, &body, path, true)
	}

	#[instrument(skip(self, data))]
	async fn write(&self, path: &str, data: Payload) -> BackendResult<Option<SecretResponse>> {
		let request = self.request(Method::PUT, path)?.json(&data);
		let (status, body) = self.execute(request, path).await?;
		parse_reply(status, &body, path, false)
	}

	#[instrument(skip(self))]
	async fn delete(&self, path: &str) -> BackendResult<()> {
		let request = self.request(Method::DELETE, path)?;
		let (status, body) = self.execute(request, path).await?;
		if status == StatusCode::NOT_FOUND {
			return Ok(());
		}
		parse_reply(status, &body, path, false).map(|_| ())
	}

	#[instrument(skip(self))]
	async fn list(&self, path: &str) -> BackendResult<Option<SecretResponse>> {
		let request = self
			.request(Method::GET, path)?
			.query(&[("list", "true")]);
		let (status, body) = self.execute(request, path).await?;
		parse_reply(status, &body, path, true)
	}
}

#[async_trait]
impl PolicyBackend for VaultClient {
	#[instrument(skip(self, rules))]
	async fn put_policy(&self, name: &str, rules: &str) -> BackendResult<()> {
		let path = format!("{POLICY_PREFIX}/{name}");
		let request = self
			.request(Method::PUT, &path)?
			.json(&json!({ "policy": rules }));
		let (status, body) = self.execute(request, &path).await?;
		parse_reply(status, &body, &path, false).map(|_| ())
	}

	#[instrument(skip(self))]
	async fn delete_policy(&self, name: &str) -> BackendResult<()> {
		let path = format!("{POLICY_PREFIX}/{name}");
		let request = self.request(Method::DELETE, &path)?;
		let (status, body) = self.execute(request, &path).await?;
		if status == StatusCode::NOT_FOUND {
			return Ok(());
		}
		parse_reply(status, &body, &path, false).map(|_| ())
	}
}
