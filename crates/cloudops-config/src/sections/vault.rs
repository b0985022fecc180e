// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vault connection configuration section.

use cloudops_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::ConfigError;

pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8200";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfigLayer {
	pub address: Option<String>,
	/// Token sent as `X-Vault-Token`.
	#[serde(skip_serializing)]
	pub token: Option<SecretString>,
	/// Enterprise namespace.
	pub namespace: Option<String>,
	pub timeout_secs: Option<u64>,
	/// Allow plain HTTP to non-loopback addresses.
	pub allow_insecure: Option<bool>,
}

impl VaultConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.address.is_some() {
			self.address = other.address;
		}
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.allow_insecure.is_some() {
			self.allow_insecure = other.allow_insecure;
		}
	}

	pub fn finalize(self) -> Result<VaultConfig, ConfigError> {
		let config = VaultConfig {
			address: self
				.address
				.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
			token: self.token.filter(|t| !t.is_empty()),
			namespace: self.namespace.filter(|ns| !ns.is_empty()),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
			allow_insecure: self.allow_insecure.unwrap_or(false),
		};
		config.validate()?;
		Ok(config)
	}
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
	pub address: String,
	pub token: Option<SecretString>,
	pub namespace: Option<String>,
	pub timeout_secs: u64,
	pub allow_insecure: bool,
}

impl VaultConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		let url = Url::parse(&self.address).map_err(|e| ConfigError::InvalidValue {
			key: "vault.address".to_string(),
			message: format!("'{}' is not a valid URL: {e}", self.address),
		})?;

		match url.scheme() {
			"https" => {}
			"http" if self.allow_insecure || is_loopback(&url) => {}
			"http" => {
				return Err(ConfigError::Validation(format!(
					"vault.address '{}' uses plain HTTP to a remote host; use https or set \
					 CLOUDOPS_VAULT_ALLOW_INSECURE=true",
					self.address
				)))
			}
			other => {
				return Err(ConfigError::InvalidValue {
					key: "vault.address".to_string(),
					message: format!("unsupported scheme '{other}'"),
				})
			}
		}

		if self.timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "vault.timeout_secs".to_string(),
				message: "must be greater than 0".to_string(),
			});
		}
		Ok(())
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

#[cfg(test)]
mod tests {
	use super::*;

	fn layer(address: &str) -> VaultConfigLayer {
		VaultConfigLayer {
			address: Some(address.to_string()),
			..Default::default()
		}
	}

	#[test]
	fn test_defaults() {
		let config = VaultConfigLayer::default().finalize().unwrap();
		assert_eq!(config.address, "http://127.0.0.1:8200");
		assert_eq!(config.timeout_secs, 30);
		assert!(!config.allow_insecure);
		assert!(config.token.is_none());
	}

	#[test]
	fn test_remote_http_requires_allow_insecure() {
		assert!(matches!(
			layer("http://vault.internal:8200").finalize(),
			Err(ConfigError::Validation(_))
		));

		let mut insecure = layer("http://vault.internal:8200");
		insecure.allow_insecure = Some(true);
		assert!(insecure.finalize().is_ok());
	}

	#[test]
	fn test_https_and_loopback_accepted() {
		assert!(layer("https://vault.internal:8200").finalize().is_ok());
		assert!(layer("http://localhost:8200").finalize().is_ok());
	}

	#[test]
	fn test_invalid_address() {
		assert!(matches!(
			layer("vault").finalize(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_zero_timeout_rejected() {
		let mut l = layer("https://vault.internal");
		l.timeout_secs = Some(0);
		assert!(l.finalize().is_err());
	}

	#[test]
	fn test_empty_namespace_is_none() {
		let mut l = layer("https://vault.internal");
		l.namespace = Some(String::new());
		assert!(l.finalize().unwrap().namespace.is_none());
	}
}
