// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller authorization configuration section.

use cloudops_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_ADMIN_KEY: &str = "admin";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfigLayer {
	/// Secret an admin caller must present.
	#[serde(skip_serializing)]
	pub admin_secret: Option<SecretString>,
	/// Header keys classified as admin.
	pub admin_keys: Option<Vec<String>>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.admin_secret.is_some() {
			self.admin_secret = other.admin_secret;
		}
		if other.admin_keys.is_some() {
			self.admin_keys = other.admin_keys;
		}
	}

	pub fn finalize(self) -> Result<AuthConfig, ConfigError> {
		let admin_secret = self.admin_secret.ok_or_else(|| {
			ConfigError::Missing(
				"auth.admin_secret (set CLOUDOPS_ADMIN_SECRET or CLOUDOPS_ADMIN_SECRET_FILE)"
					.to_string(),
			)
		})?;
		if admin_secret.is_empty() {
			return Err(ConfigError::Validation(
				"auth.admin_secret must not be empty".to_string(),
			));
		}

		let admin_keys: Vec<String> = self
			.admin_keys
			.unwrap_or_else(|| vec![DEFAULT_ADMIN_KEY.to_string()])
			.into_iter()
			.map(|k| k.trim().to_string())
			.filter(|k| !k.is_empty())
			.collect();
		if admin_keys.is_empty() {
			return Err(ConfigError::Validation(
				"auth.admin_keys must contain at least one key".to_string(),
			));
		}

		Ok(AuthConfig {
			admin_secret,
			admin_keys,
		})
	}
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub admin_secret: SecretString,
	pub admin_keys: Vec<String>,
}
