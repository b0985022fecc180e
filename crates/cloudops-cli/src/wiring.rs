// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns resolved configuration into backend clients and a provider factory.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cloudops_config::{AppRoleConfig, CredentialsConfig, NamingConfig, VaultConfig};
use cloudops_credentials::{
	AdminKeys, AppRoleSettings, LogicalBackend, Namespace, PolicyBackend, ProviderFactory,
};
use cloudops_vault::{VaultClient, VaultClientConfig};

pub fn vault_client_config(vault: &VaultConfig) -> VaultClientConfig {
	VaultClientConfig {
		address: vault.address.clone(),
		token: vault.token.clone(),
		namespace: vault.namespace.clone(),
		timeout: Duration::from_secs(vault.timeout_secs),
		allow_insecure: vault.allow_insecure,
	}
}

pub fn namespace(naming: &NamingConfig) -> Namespace {
	Namespace::new(naming.project_prefix.clone(), naming.aws_mount.clone())
}

pub fn role_settings(approle: &AppRoleConfig) -> AppRoleSettings {
	AppRoleSettings {
		secret_id_ttl: approle.secret_id_ttl.clone(),
		token_max_ttl: approle.token_max_ttl.clone(),
		token_num_uses: approle.token_num_uses,
	}
}

/// Build the factory against the configured Vault server.
pub fn build_factory(config: &CredentialsConfig) -> Result<ProviderFactory> {
	let client = Arc::new(
		VaultClient::new(vault_client_config(&config.vault))
			.context("failed to create Vault client")?,
	);

	Ok(factory_for(client.clone(), client, config))
}

pub fn factory_for(
	logical: Arc<dyn LogicalBackend>,
	policies: Arc<dyn PolicyBackend>,
	config: &CredentialsConfig,
) -> ProviderFactory {
	ProviderFactory::new(logical, policies, config.auth.admin_secret.clone())
		.with_admin_keys(AdminKeys::new(config.auth.admin_keys.iter()))
		.with_namespace(namespace(&config.naming))
		.with_role_settings(role_settings(&config.approle))
}

#[cfg(test)]
mod tests {
	use super::*;
	use cloudops_config::{
		AppRoleConfigLayer, AuthConfigLayer, CredentialsConfigLayer, NamingConfigLayer,
		VaultConfigLayer,
	};
	use cloudops_credentials::{CredentialClass, MemoryBackend, Operation, Provider, SecretString};

	fn test_config() -> CredentialsConfig {
		cloudops_config::finalize(CredentialsConfigLayer {
			vault: Some(VaultConfigLayer {
				namespace: Some("team-a".to_string()),
				timeout_secs: Some(5),
				..Default::default()
			}),
			auth: Some(AuthConfigLayer {
				admin_secret: Some(SecretString::from("s3cret")),
				admin_keys: Some(vec!["admin".to_string(), "operator".to_string()]),
			}),
			naming: Some(NamingConfigLayer {
				project_prefix: Some("team".to_string()),
				aws_mount: Some("aws-prod".to_string()),
			}),
			approle: Some(AppRoleConfigLayer {
				token_num_uses: Some(5),
				..Default::default()
			}),
			logging: None,
		})
		.unwrap()
	}

	#[test]
	fn vault_settings_are_carried_over() {
		let config = test_config();
		let client = vault_client_config(&config.vault);
		assert_eq!(client.address, "http://127.0.0.1:8200");
		assert_eq!(client.namespace.as_deref(), Some("team-a"));
		assert_eq!(client.timeout, Duration::from_secs(5));
		assert!(client.token.is_none());
	}

	#[test]
	fn build_factory_accepts_default_address() {
		assert!(build_factory(&test_config()).is_ok());
	}

	#[tokio::test]
	async fn factory_uses_configured_naming_and_keys() {
		let config = test_config();
		let backend = Arc::new(MemoryBackend::new());
		let factory = factory_for(backend.clone(), backend.clone(), &config);

		let auth = factory.parse_authorization("vault:operator:s3cret").unwrap();
		assert_eq!(auth.class(), CredentialClass::Admin);

		let admin = factory.provider(auth);
		admin.create_project("payments").await.unwrap();

		let ops = backend.operations().await;
		assert!(ops.contains(&Operation::PutPolicy("team-payments".to_string())));
		assert!(ops.contains(&Operation::Write(
			"auth/approle/role/team-payments".to_string()
		)));
		let role = backend.stored("auth/approle/role/team-payments").await.unwrap();
		assert_eq!(role["token_num_uses"], 5);
	}
}
