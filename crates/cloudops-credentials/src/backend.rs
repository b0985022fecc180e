// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret backend abstraction.
//!
//! The backend is split along its two capability groups so a test double only
//! implements what the component under test touches:
//!
//! - [`LogicalBackend`]: path-addressed read/write/delete/list
//! - [`PolicyBackend`]: ACL policy put/delete
//!
//! Responses come back as a generic [`SecretResponse`] envelope and are decoded
//! into the typed schemas in this module; a missing or mistyped field is a
//! [`CredentialsError::Decode`], never a silent default.

use async_trait::async_trait;
use cloudops_common_secret::SecretString;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{CredentialsError, Result};

/// Request body for a backend write.
pub type Payload = Map<String, Value>;

/// Result type alias for raw backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures reported by a backend implementation.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
	/// The request never produced a response (connect, TLS, timeout).
	#[error("transport error: {0}")]
	Transport(String),

	/// The backend answered with a non-success status.
	#[error("backend returned HTTP {status}: {}", format_api_errors(.errors))]
	Api { status: u16, errors: Vec<String> },

	/// The backend answered with a body that is not a valid envelope.
	#[error("invalid backend response: {0}")]
	InvalidResponse(String),
}

fn format_api_errors(errors: &[String]) -> String {
	if errors.is_empty() {
		"no error detail".to_string()
	} else {
		errors.join("; ")
	}
}

/// Path-addressed storage operations.
#[async_trait]
pub trait LogicalBackend: Send + Sync {
	/// Read `path`. `Ok(None)` means nothing is stored there.
	async fn read(&self, path: &str) -> BackendResult<Option<SecretResponse>>;

	/// Write `data` to `path`. Some endpoints answer with no body.
	async fn write(&self, path: &str, data: Payload) -> BackendResult<Option<SecretResponse>>;

	/// Delete `path`. Deleting a missing entry succeeds.
	async fn delete(&self, path: &str) -> BackendResult<()>;

	/// List keys under `path`. `Ok(None)` means the directory is empty.
	async fn list(&self, path: &str) -> BackendResult<Option<SecretResponse>>;
}

/// ACL policy management.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
	/// Create or overwrite the policy `name`.
	async fn put_policy(&self, name: &str, rules: &str) -> BackendResult<()>;

	/// Delete the policy `name`. Deleting a missing policy succeeds.
	async fn delete_policy(&self, name: &str) -> BackendResult<()>;
}

/// Generic response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretResponse {
	#[serde(default)]
	pub data: Option<Map<String, Value>>,
	#[serde(default)]
	pub auth: Option<SecretAuth>,
}

impl SecretResponse {
	pub fn with_data(data: Map<String, Value>) -> Self {
		Self {
			data: Some(data),
			auth: None,
		}
	}

	pub fn with_auth(auth: SecretAuth) -> Self {
		Self {
			data: None,
			auth: Some(auth),
		}
	}

	/// Decode the `data` object into a typed schema.
	pub fn decode_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
		let data = self
			.data
			.as_ref()
			.ok_or_else(|| CredentialsError::decode(path, "response has no data"))?;
		serde_json::from_value(Value::Object(data.clone()))
			.map_err(|e| CredentialsError::decode(path, e.to_string()))
	}

	/// Take the `auth` block of a login response.
	pub fn into_auth(self, path: &str) -> Result<SecretAuth> {
		self
			.auth
			.ok_or_else(|| CredentialsError::decode(path, "response has no auth block"))
	}
}

/// The `auth` block returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretAuth {
	pub client_token: SecretString,
	#[serde(default)]
	pub accessor: Option<String>,
	#[serde(default)]
	pub policies: Option<Vec<String>>,
	#[serde(default)]
	pub lease_duration: u64,
	#[serde(default)]
	pub renewable: bool,
	#[serde(default)]
	pub num_uses: u32,
}

/// `GET <role>/role-id`
#[derive(Debug, Clone, Deserialize)]
pub struct RoleIdData {
	pub role_id: String,
}

/// `POST <role>/secret-id`
#[derive(Debug, Clone, Deserialize)]
pub struct SecretIdData {
	pub secret_id: SecretString,
	#[serde(default)]
	pub secret_id_accessor: Option<String>,
}

/// `GET <aws mount>/roles/<name>`
#[derive(Debug, Clone, Deserialize)]
pub struct TargetRoleData {
	pub credential_type: String,
	pub policy_arns: Vec<String>,
	pub role_arns: Vec<String>,
}

/// `LIST <dir>`
#[derive(Debug, Clone, Deserialize)]
pub struct KeyList {
	pub keys: Vec<String>,
}
