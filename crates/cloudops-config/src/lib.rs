// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the cloudops credential service.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`CLOUDOPS_*`)
//! - `*_FILE` loading for the Vault token and admin secret
//!
//! # Usage
//!
//! ```ignore
//! use cloudops_config::load_config;
//!
//! let config = load_config()?;
//! println!("Vault at {}", config.vault.address);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, load_secret_with, SecretEnvError};
pub use error::ConfigError;
pub use layer::CredentialsConfigLayer;
pub use sections::*;
pub use sources::{
	load_env_layer, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource,
	SYSTEM_CONFIG_PATH,
};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
	pub vault: VaultConfig,
	pub auth: AuthConfig,
	pub naming: NamingConfig,
	pub approle: AppRoleConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`CLOUDOPS_*`)
/// 2. Config file (`/etc/cloudops/credentials.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<CredentialsConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<CredentialsConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<CredentialsConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = CredentialsConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize a merged layer into resolved config, applying defaults and
/// validation.
pub fn finalize(layer: CredentialsConfigLayer) -> Result<CredentialsConfig, ConfigError> {
	let vault = layer.vault.unwrap_or_default().finalize()?;
	let auth = layer.auth.unwrap_or_default().finalize()?;
	let naming = layer.naming.unwrap_or_default().finalize()?;
	let approle = layer.approle.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		vault_address = %vault.address,
		vault_namespace = vault.namespace.as_deref().unwrap_or("-"),
		vault_token_configured = vault.token.is_some(),
		admin_keys = auth.admin_keys.len(),
		project_prefix = %naming.project_prefix,
		aws_mount = %naming.aws_mount,
		token_num_uses = approle.token_num_uses,
		"credentials configuration loaded"
	);

	Ok(CredentialsConfig {
		vault,
		auth,
		naming,
		approle,
		logging,
	})
}
