// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parameters written onto every project's AppRole.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SECRET_ID_TTL: &str = "8776h";
pub const DEFAULT_TOKEN_MAX_TTL: &str = "10m";
pub const DEFAULT_TOKEN_NUM_USES: u32 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppRoleConfigLayer {
	pub secret_id_ttl: Option<String>,
	pub token_max_ttl: Option<String>,
	pub token_num_uses: Option<u32>,
}

impl AppRoleConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.secret_id_ttl.is_some() {
			self.secret_id_ttl = other.secret_id_ttl;
		}
		if other.token_max_ttl.is_some() {
			self.token_max_ttl = other.token_max_ttl;
		}
		if other.token_num_uses.is_some() {
			self.token_num_uses = other.token_num_uses;
		}
	}

	pub fn finalize(self) -> Result<AppRoleConfig, ConfigError> {
		let token_num_uses = self.token_num_uses.unwrap_or(DEFAULT_TOKEN_NUM_USES);
		// zero means unlimited uses to the backend
		if token_num_uses == 0 {
			return Err(ConfigError::InvalidValue {
				key: "approle.token_num_uses".to_string(),
				message: "must be at least 1".to_string(),
			});
		}

		Ok(AppRoleConfig {
			secret_id_ttl: self
				.secret_id_ttl
				.unwrap_or_else(|| DEFAULT_SECRET_ID_TTL.to_string()),
			token_max_ttl: self
				.token_max_ttl
				.unwrap_or_else(|| DEFAULT_TOKEN_MAX_TTL.to_string()),
			token_num_uses,
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRoleConfig {
	pub secret_id_ttl: String,
	pub token_max_ttl: String,
	pub token_num_uses: u32,
}
