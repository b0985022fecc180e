// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The credential provider facade.
//!
//! A [`CredentialProvider`] is built per request with the caller's parsed
//! [`Authorization`] bound in and checks it before every operation:
//!
//! | Operation | Requires |
//! |---|---|
//! | project create/get/exists/delete | authorized admin |
//! | target create/get/exists/list/delete | authorized admin |
//! | token | tenant |
//!
//! Permission is checked before any backend I/O. A provider holds no
//! mutable state and should not outlive the request it was built for.

use std::sync::Arc;

use async_trait::async_trait;
use cloudops_common_secret::SecretString;
use tracing::{instrument, warn};

use crate::authorization::{AdminKeys, Authorization, CredentialClass};
use crate::backend::{LogicalBackend, PolicyBackend};
use crate::error::{CredentialsError, Result};
use crate::naming::Namespace;
use crate::project::{AppRoleSettings, ProjectCredentials, ProjectDescriptor, ProjectManager};
use crate::target::{CreateTargetRequest, TargetManager, TargetProperties};
use crate::token::{IssuedToken, TokenExchanger};

/// Operations exposed to callers of the credential service.
#[async_trait]
pub trait Provider: Send + Sync {
	async fn create_project(&self, name: &str) -> Result<ProjectCredentials>;

	async fn create_target(&self, project: &str, request: &CreateTargetRequest) -> Result<()>;

	async fn delete_project(&self, name: &str) -> Result<()>;

	async fn delete_target(&self, project: &str, target: &str) -> Result<()>;

	async fn get_project(&self, name: &str) -> Result<ProjectDescriptor>;

	async fn get_target(&self, project: &str, target: &str) -> Result<TargetProperties>;

	/// Exchange the caller's own credential pair for a short-lived token.
	async fn get_token(&self) -> Result<SecretString>;

	async fn list_targets(&self, project: &str) -> Result<Vec<String>>;

	async fn project_exists(&self, name: &str) -> Result<bool>;

	async fn target_exists(&self, project: &str, target: &str) -> Result<bool>;
}

/// [`Provider`] bound to one caller.
pub struct CredentialProvider {
	authorization: Authorization,
	admin_secret: SecretString,
	projects: ProjectManager,
	targets: TargetManager,
	tokens: TokenExchanger,
}

impl CredentialProvider {
	pub fn authorization(&self) -> &Authorization {
		&self.authorization
	}

	/// Like [`Provider::get_token`] but returns the whole login result.
	#[instrument(skip(self), fields(class = %self.authorization.class()))]
	pub async fn issue_token(&self) -> Result<IssuedToken> {
		self.require_tenant("get_token")?;
		self
			.tokens
			.exchange(self.authorization.key(), self.authorization.secret())
			.await
	}

	fn require_admin(&self, operation: &'static str) -> Result<()> {
		if self.authorization.is_authorized_admin(&self.admin_secret) {
			return Ok(());
		}
		warn!(
			operation,
			class = %self.authorization.class(),
			"rejected operation without authorized admin credentials"
		);
		Err(CredentialsError::PermissionDenied {
			operation,
			required: CredentialClass::Admin,
		})
	}

	fn require_tenant(&self, operation: &'static str) -> Result<()> {
		if self.authorization.class() == CredentialClass::Tenant {
			return Ok(());
		}
		warn!(operation, "rejected token exchange for admin credentials");
		Err(CredentialsError::PermissionDenied {
			operation,
			required: CredentialClass::Tenant,
		})
	}
}

#[async_trait]
impl Provider for CredentialProvider {
	async fn create_project(&self, name: &str) -> Result<ProjectCredentials> {
		self.require_admin("create_project")?;
		self.projects.create(name).await
	}

	async fn create_target(&self, project: &str, request: &CreateTargetRequest) -> Result<()> {
		self.require_admin("create_target")?;
		self.targets.create(project, request).await
	}

	async fn delete_project(&self, name: &str) -> Result<()> {
		self.require_admin("delete_project")?;
		self.projects.delete(name).await
	}

	async fn delete_target(&self, project: &str, target: &str) -> Result<()> {
		self.require_admin("delete_target")?;
		self.targets.delete(project, target).await
	}

	async fn get_project(&self, name: &str) -> Result<ProjectDescriptor> {
		self.require_admin("get_project")?;
		self.projects.get(name).await
	}

	async fn get_target(&self, project: &str, target: &str) -> Result<TargetProperties> {
		self.require_admin("get_target")?;
		self.targets.get(project, target).await
	}

	async fn get_token(&self) -> Result<SecretString> {
		Ok(self.issue_token().await?.client_token)
	}

	async fn list_targets(&self, project: &str) -> Result<Vec<String>> {
		self.require_admin("list_targets")?;
		self.targets.list(project).await
	}

	async fn project_exists(&self, name: &str) -> Result<bool> {
		self.require_admin("project_exists")?;
		self.projects.exists(name).await
	}

	async fn target_exists(&self, project: &str, target: &str) -> Result<bool> {
		self.require_admin("target_exists")?;
		self.targets.exists(project, target).await
	}
}

/// Long-lived holder of backend handles and configuration that builds a
/// [`CredentialProvider`] per caller.
#[derive(Clone)]
pub struct ProviderFactory {
	logical: Arc<dyn LogicalBackend>,
	policies: Arc<dyn PolicyBackend>,
	admin_secret: SecretString,
	admin_keys: AdminKeys,
	namespace: Namespace,
	settings: AppRoleSettings,
}

impl ProviderFactory {
	pub fn new(
		logical: Arc<dyn LogicalBackend>,
		policies: Arc<dyn PolicyBackend>,
		admin_secret: SecretString,
	) -> Self {
		Self {
			logical,
			policies,
			admin_secret,
			admin_keys: AdminKeys::default(),
			namespace: Namespace::default(),
			settings: AppRoleSettings::default(),
		}
	}

	pub fn with_admin_keys(mut self, admin_keys: AdminKeys) -> Self {
		self.admin_keys = admin_keys;
		self
	}

	pub fn with_namespace(mut self, namespace: Namespace) -> Self {
		self.namespace = namespace;
		self
	}

	pub fn with_role_settings(mut self, settings: AppRoleSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Parse a raw header against the configured admin keys.
	pub fn parse_authorization(&self, raw: &str) -> Result<Authorization> {
		Authorization::parse_with(raw, &self.admin_keys)
	}

	pub fn provider(&self, authorization: Authorization) -> CredentialProvider {
		CredentialProvider {
			authorization,
			admin_secret: self.admin_secret.clone(),
			projects: ProjectManager::new(
				self.logical.clone(),
				self.policies.clone(),
				self.namespace.clone(),
				self.settings.clone(),
			),
			targets: TargetManager::new(self.logical.clone(), self.namespace.clone()),
			tokens: TokenExchanger::new(self.logical.clone()),
		}
	}

	pub fn provider_for_header(&self, raw: &str) -> Result<CredentialProvider> {
		Ok(self.provider(self.parse_authorization(raw)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryBackend;
	use crate::target::TargetProperties;

	const ADMIN_SECRET: &str = "s3cret";

	fn factory(backend: &Arc<MemoryBackend>) -> ProviderFactory {
		ProviderFactory::new(
			backend.clone(),
			backend.clone(),
			SecretString::from(ADMIN_SECRET),
		)
	}

	fn target_request(name: &str) -> CreateTargetRequest {
		CreateTargetRequest {
			name: name.to_string(),
			properties: TargetProperties {
				credential_type: "assumed_role".to_string(),
				policy_arns: vec![],
				role_arn: "arn:aws:iam::123456789012:role/r".to_string(),
			},
			target_type: "aws_account".to_string(),
		}
	}

	async fn assert_all_admin_ops_denied(provider: &CredentialProvider) {
		let request = target_request("t");
		let results = [
			provider.create_project("p").await.err(),
			provider.create_target("p", &request).await.err(),
			provider.delete_project("p").await.err(),
			provider.delete_target("p", "t").await.err(),
			provider.get_project("p").await.err(),
			provider.get_target("p", "t").await.err(),
			provider.list_targets("p").await.err(),
			provider.project_exists("p").await.err(),
			provider.target_exists("p", "t").await.err(),
		];
		for err in results {
			let err = err.expect("operation should be denied");
			assert!(
				matches!(
					err,
					CredentialsError::PermissionDenied {
						required: CredentialClass::Admin,
						..
					}
				),
				"{err}"
			);
		}
	}

	#[tokio::test]
	async fn tenant_cannot_run_admin_operations() {
		let backend = Arc::new(MemoryBackend::new());
		let provider = factory(&backend)
			.provider_for_header("vault:role-id:secret-id")
			.unwrap();

		assert_all_admin_ops_denied(&provider).await;
		assert!(backend.operations().await.is_empty());
	}

	#[tokio::test]
	async fn admin_with_wrong_secret_is_denied() {
		let backend = Arc::new(MemoryBackend::new());
		let provider = factory(&backend)
			.provider_for_header("vault:admin:not-the-secret")
			.unwrap();

		assert_all_admin_ops_denied(&provider).await;
		assert!(backend.operations().await.is_empty());
	}

	#[tokio::test]
	async fn gating_precedes_name_validation() {
		let backend = Arc::new(MemoryBackend::new());
		let provider = factory(&backend).provider_for_header("v:r:s").unwrap();

		let err = provider.create_project("bad/name").await.unwrap_err();
		assert!(err.is_permission_denied());
	}

	#[tokio::test]
	async fn admin_cannot_get_token() {
		let backend = Arc::new(MemoryBackend::new());
		let provider = factory(&backend)
			.provider_for_header(&format!("vault:admin:{ADMIN_SECRET}"))
			.unwrap();

		let err = provider.get_token().await.unwrap_err();
		assert!(matches!(
			err,
			CredentialsError::PermissionDenied {
				operation: "get_token",
				required: CredentialClass::Tenant,
			}
		));
		assert!(backend.operations().await.is_empty());
	}

	#[tokio::test]
	async fn tenant_gets_token_for_own_project() {
		let backend = Arc::new(MemoryBackend::new());
		let factory = factory(&backend);
		let admin = factory
			.provider_for_header(&format!("vault:admin:{ADMIN_SECRET}"))
			.unwrap();
		let creds = admin.create_project("proj1").await.unwrap();

		let tenant = factory.provider_for_header(&format!(
			"vault:{}:{}",
			creds.role_id,
			creds.secret_id.expose()
		))
		.unwrap();
		let token = tenant.get_token().await.unwrap();

		assert_eq!(
			backend.token_policies(token.expose()).await,
			Some(vec!["argo-cloudops-projects-proj1".to_string()])
		);
	}

	#[tokio::test]
	async fn target_exists_follows_get_target() {
		let backend = Arc::new(MemoryBackend::new());
		let admin = factory(&backend)
			.provider_for_header(&format!("vault:admin:{ADMIN_SECRET}"))
			.unwrap();

		assert!(!admin.target_exists("proj1", "t").await.unwrap());
		admin.create_target("proj1", &target_request("t")).await.unwrap();
		assert!(admin.target_exists("proj1", "t").await.unwrap());
	}

	#[test]
	fn configured_admin_keys_drive_classification() {
		let backend = Arc::new(MemoryBackend::new());
		let factory = factory(&backend).with_admin_keys(AdminKeys::new(["operator"]));

		let operator = factory.parse_authorization("vault:operator:x").unwrap();
		let admin = factory.parse_authorization("vault:admin:x").unwrap();
		assert_eq!(operator.class(), CredentialClass::Admin);
		assert_eq!(admin.class(), CredentialClass::Tenant);
	}

	#[test]
	fn custom_namespace_reaches_managers() {
		let backend = Arc::new(MemoryBackend::new());
		let admin = factory(&backend)
			.with_namespace(Namespace::new("team", "aws-prod"))
			.with_role_settings(AppRoleSettings {
				token_num_uses: 5,
				..AppRoleSettings::default()
			})
			.provider_for_header(&format!("vault:admin:{ADMIN_SECRET}"))
			.unwrap();

		tokio_test::block_on(async {
			admin.create_project("p").await.unwrap();
			let role = backend.stored("auth/approle/role/team-p").await.unwrap();
			assert_eq!(role["token_num_uses"], 5);
			assert!(backend
				.policy("team-p")
				.await
				.unwrap()
				.contains("aws-prod/sts/team-p-target-*"));
		});
	}

	#[test]
	fn malformed_header_is_rejected() {
		let backend = Arc::new(MemoryBackend::new());
		assert!(matches!(
			factory(&backend).provider_for_header("vault:admin"),
			Err(CredentialsError::MalformedAuthorization)
		));
	}
}
