// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_with;
use crate::error::ConfigError;
use crate::layer::CredentialsConfigLayer;
use crate::sections::{
	AppRoleConfigLayer, AuthConfigLayer, LogFormat, LoggingConfigLayer, NamingConfigLayer,
	VaultConfigLayer,
};

/// Default location of the TOML config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/cloudops/credentials.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<CredentialsConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<CredentialsConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(CredentialsConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is skipped.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<CredentialsConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(CredentialsConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: CredentialsConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: CLOUDOPS_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<CredentialsConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_env_layer(&|name: &str| std::env::var(name).ok())
	}
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Build a layer from `CLOUDOPS_*` variables resolved through `lookup`.
pub fn load_env_layer(lookup: Lookup<'_>) -> Result<CredentialsConfigLayer, ConfigError> {
	Ok(CredentialsConfigLayer {
		vault: Some(load_vault_from_env(lookup)?),
		auth: Some(load_auth_from_env(lookup)?),
		naming: Some(load_naming_from_env(lookup)),
		approle: Some(load_approle_from_env(lookup)?),
		logging: Some(load_logging_from_env(lookup)?),
	})
}

fn env_var(lookup: Lookup<'_>, name: &str) -> Option<String> {
	lookup(name).filter(|s| !s.is_empty())
}

fn env_bool(lookup: Lookup<'_>, name: &str) -> Option<bool> {
	env_var(lookup, name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u32(lookup: Lookup<'_>, name: &str) -> Result<Option<u32>, ConfigError> {
	match env_var(lookup, name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u32 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(lookup: Lookup<'_>, name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(lookup, name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_list(lookup: Lookup<'_>, name: &str) -> Option<Vec<String>> {
	env_var(lookup, name).map(|v| {
		v.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect()
	})
}

fn load_vault_from_env(lookup: Lookup<'_>) -> Result<VaultConfigLayer, ConfigError> {
	Ok(VaultConfigLayer {
		address: env_var(lookup, "CLOUDOPS_VAULT_ADDR"),
		token: load_secret_with("CLOUDOPS_VAULT_TOKEN", lookup)?,
		namespace: env_var(lookup, "CLOUDOPS_VAULT_NAMESPACE"),
		timeout_secs: env_u64(lookup, "CLOUDOPS_VAULT_TIMEOUT_SECS")?,
		allow_insecure: env_bool(lookup, "CLOUDOPS_VAULT_ALLOW_INSECURE"),
	})
}

fn load_auth_from_env(lookup: Lookup<'_>) -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		admin_secret: load_secret_with("CLOUDOPS_ADMIN_SECRET", lookup)?,
		admin_keys: env_list(lookup, "CLOUDOPS_ADMIN_KEYS"),
	})
}

fn load_naming_from_env(lookup: Lookup<'_>) -> NamingConfigLayer {
	NamingConfigLayer {
		project_prefix: env_var(lookup, "CLOUDOPS_PROJECT_PREFIX"),
		aws_mount: env_var(lookup, "CLOUDOPS_AWS_MOUNT"),
	}
}

fn load_approle_from_env(lookup: Lookup<'_>) -> Result<AppRoleConfigLayer, ConfigError> {
	Ok(AppRoleConfigLayer {
		secret_id_ttl: env_var(lookup, "CLOUDOPS_SECRET_ID_TTL"),
		token_max_ttl: env_var(lookup, "CLOUDOPS_TOKEN_MAX_TTL"),
		token_num_uses: env_u32(lookup, "CLOUDOPS_TOKEN_NUM_USES")?,
	})
}

fn load_logging_from_env(lookup: Lookup<'_>) -> Result<LoggingConfigLayer, ConfigError> {
	Ok(LoggingConfigLayer {
		level: env_var(lookup, "CLOUDOPS_LOG_LEVEL"),
		format: env_var(lookup, "CLOUDOPS_LOG_FORMAT")
			.map(|v| LogFormat::from_str_value(&v))
			.transpose()?,
	})
}
