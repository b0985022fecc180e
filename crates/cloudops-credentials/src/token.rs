// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exchange of a durable credential pair for a short-lived token.

use std::sync::Arc;

use cloudops_common_secret::SecretString;
use serde_json::json;
use tracing::{info, instrument};

use crate::backend::{LogicalBackend, Payload};
use crate::error::{CredentialsError, Result};
use crate::naming::APPROLE_LOGIN_PATH;

/// A token issued by a credential-pair login.
///
/// Its policies, lifetime and use count are fixed by the project role, not
/// by the caller.
#[derive(Debug, Clone)]
pub struct IssuedToken {
	pub client_token: SecretString,
	pub accessor: Option<String>,
	pub policies: Vec<String>,
	pub lease_duration: u64,
	pub num_uses: u32,
}

#[derive(Clone)]
pub struct TokenExchanger {
	logical: Arc<dyn LogicalBackend>,
}

impl TokenExchanger {
	pub fn new(logical: Arc<dyn LogicalBackend>) -> Self {
		Self { logical }
	}

	/// Log in with `role_id`/`secret_id`. An unknown pair surfaces as the
	/// backend's own rejection.
	#[instrument(skip(self, secret_id), fields(role_id = %role_id))]
	pub async fn exchange(&self, role_id: &str, secret_id: &SecretString) -> Result<IssuedToken> {
		let mut payload = Payload::new();
		payload.insert("role_id".to_string(), json!(role_id));
		payload.insert("secret_id".to_string(), json!(secret_id.expose()));

		let response = self
			.logical
			.write(APPROLE_LOGIN_PATH, payload)
			.await
			.map_err(CredentialsError::backend("login", APPROLE_LOGIN_PATH))?
			.ok_or_else(|| CredentialsError::decode(APPROLE_LOGIN_PATH, "login response was empty"))?;

		let auth = response.into_auth(APPROLE_LOGIN_PATH)?;
		let token = IssuedToken {
			client_token: auth.client_token,
			accessor: auth.accessor,
			policies: auth.policies.unwrap_or_default(),
			lease_duration: auth.lease_duration,
			num_uses: auth.num_uses,
		};

		info!(
			policies = ?token.policies,
			lease_duration = token.lease_duration,
			num_uses = token.num_uses,
			"token issued"
		);
		Ok(token)
	}
}
