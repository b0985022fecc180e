// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project lifecycle: policy, AppRole identity and durable credential pair.
//!
//! # Step ordering
//!
//! ```text
//! create:  WritePolicy → WriteRole → ReadRoleId → GenerateSecretId
//! delete:  DeletePolicy → DeleteRole
//! ```
//!
//! The backend has no transactions. A failed step returns immediately and
//! earlier steps are **not** rolled back. Every step is safe to re-run
//! (policy and role writes overwrite, deletes of missing entries succeed), so
//! a partially created project is finished by calling `create` again or
//! removed by calling `delete`. Callers that run lifecycle operations for the
//! same project concurrently must serialize them themselves.

use std::fmt;
use std::sync::Arc;

use cloudops_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::backend::{LogicalBackend, Payload, PolicyBackend, RoleIdData, SecretIdData};
use crate::error::{CredentialsError, EntityKind, Result};
use crate::naming::{validate_name, Namespace};
use crate::policy::synthesize_readonly_policy;

/// Secret ID lifetime: roughly one year.
pub const DEFAULT_SECRET_ID_TTL: &str = "8776h";
/// Maximum lifetime of a token issued from a project's credential pair.
pub const DEFAULT_TOKEN_MAX_TTL: &str = "10m";
/// Uses allowed per issued token. With a single use the backend reports the
/// limit as reached before the caller can read STS credentials, so three.
pub const DEFAULT_TOKEN_NUM_USES: u32 = 3;

/// Operational parameters written onto every project role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoleSettings {
	pub secret_id_ttl: String,
	pub token_max_ttl: String,
	pub token_num_uses: u32,
}

impl Default for AppRoleSettings {
	fn default() -> Self {
		Self {
			secret_id_ttl: DEFAULT_SECRET_ID_TTL.to_string(),
			token_max_ttl: DEFAULT_TOKEN_MAX_TTL.to_string(),
			token_num_uses: DEFAULT_TOKEN_NUM_USES,
		}
	}
}

/// One backend call within a project lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStep {
	WritePolicy,
	WriteRole,
	ReadRoleId,
	GenerateSecretId,
	DeletePolicy,
	DeleteRole,
}

impl ProjectStep {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProjectStep::WritePolicy => "write_policy",
			ProjectStep::WriteRole => "write_role",
			ProjectStep::ReadRoleId => "read_role_id",
			ProjectStep::GenerateSecretId => "generate_secret_id",
			ProjectStep::DeletePolicy => "delete_policy",
			ProjectStep::DeleteRole => "delete_role",
		}
	}
}

impl fmt::Display for ProjectStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Body of a project creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
	pub name: String,
}

/// What the service reveals about an existing project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
	pub name: String,
}

/// The durable credential pair handed to a project's owner once, at creation.
#[derive(Debug, Clone)]
pub struct ProjectCredentials {
	pub role_id: String,
	pub secret_id: SecretString,
}

/// Creates, inspects and removes projects. Performs no authorization.
#[derive(Clone)]
pub struct ProjectManager {
	logical: Arc<dyn LogicalBackend>,
	policies: Arc<dyn PolicyBackend>,
	namespace: Namespace,
	settings: AppRoleSettings,
}

impl ProjectManager {
	pub fn new(
		logical: Arc<dyn LogicalBackend>,
		policies: Arc<dyn PolicyBackend>,
		namespace: Namespace,
		settings: AppRoleSettings,
	) -> Self {
		Self {
			logical,
			policies,
			namespace,
			settings,
		}
	}

	/// Run the create steps in order and return the fresh credential pair.
	#[instrument(skip(self), fields(project = %name))]
	pub async fn create(&self, name: &str) -> Result<ProjectCredentials> {
		validate_name(EntityKind::Project, name)?;

		self.write_policy(name).await?;
		self.write_role(name).await?;
		let role_id = self.read_role_id(name).await?;
		let secret_id = self.generate_secret_id(name).await?;

		info!(role_id = %role_id, "project created");
		Ok(ProjectCredentials { role_id, secret_id })
	}

	/// Read the project's role. `NotFound` only when the backend has no role.
	#[instrument(skip(self), fields(project = %name))]
	pub async fn get(&self, name: &str) -> Result<ProjectDescriptor> {
		validate_name(EntityKind::Project, name)?;

		let path = self.namespace.project_role_path(name);
		let response = self
			.logical
			.read(&path)
			.await
			.map_err(CredentialsError::backend("get_project", path))?;

		match response {
			Some(_) => Ok(ProjectDescriptor {
				name: name.to_string(),
			}),
			None => Err(CredentialsError::NotFound {
				kind: EntityKind::Project,
				name: name.to_string(),
			}),
		}
	}

	pub async fn exists(&self, name: &str) -> Result<bool> {
		match self.get(name).await {
			Ok(_) => Ok(true),
			Err(e) if e.is_not_found() => Ok(false),
			Err(e) => Err(e),
		}
	}

	/// Remove the policy, then the role.
	#[instrument(skip(self), fields(project = %name))]
	pub async fn delete(&self, name: &str) -> Result<()> {
		validate_name(EntityKind::Project, name)?;

		self.delete_policy(name).await?;
		self.delete_role(name).await?;

		info!("project deleted");
		Ok(())
	}

	async fn write_policy(&self, name: &str) -> Result<()> {
		debug!(step = %ProjectStep::WritePolicy, "running project step");
		let policy_name = self.namespace.policy_name(name);
		let rules = synthesize_readonly_policy(&self.namespace, name);
		self
			.policies
			.put_policy(&policy_name, &rules)
			.await
			.map_err(CredentialsError::backend(
				ProjectStep::WritePolicy.as_str(),
				policy_name,
			))
	}

	async fn write_role(&self, name: &str) -> Result<()> {
		debug!(step = %ProjectStep::WriteRole, "running project step");
		let path = self.namespace.project_role_path(name);
		self
			.logical
			.write(&path, self.role_payload(name))
			.await
			.map_err(CredentialsError::backend(ProjectStep::WriteRole.as_str(), path))?;
		Ok(())
	}

	async fn read_role_id(&self, name: &str) -> Result<String> {
		debug!(step = %ProjectStep::ReadRoleId, "running project step");
		let path = self.namespace.role_id_path(name);
		let response = self
			.logical
			.read(&path)
			.await
			.map_err(CredentialsError::backend(
				ProjectStep::ReadRoleId.as_str(),
				path.clone(),
			))?
			.ok_or_else(|| CredentialsError::decode(&path, "role-id response was empty"))?;
		let data: RoleIdData = response.decode_data(&path)?;
		Ok(data.role_id)
	}

	/// Writing to `secret-id` always mints a new secret; earlier ones stay
	/// valid until their TTL.
	async fn generate_secret_id(&self, name: &str) -> Result<SecretString> {
		debug!(step = %ProjectStep::GenerateSecretId, "running project step");
		let path = self.namespace.secret_id_path(name);
		let mut payload = Payload::new();
		payload.insert("force".to_string(), Value::Bool(true));

		let response = self
			.logical
			.write(&path, payload)
			.await
			.map_err(CredentialsError::backend(
				ProjectStep::GenerateSecretId.as_str(),
				path.clone(),
			))?
			.ok_or_else(|| CredentialsError::decode(&path, "secret-id response was empty"))?;
		let data: SecretIdData = response.decode_data(&path)?;
		Ok(data.secret_id)
	}

	async fn delete_policy(&self, name: &str) -> Result<()> {
		debug!(step = %ProjectStep::DeletePolicy, "running project step");
		let policy = self.namespace.policy_name(name);
		self
			.policies
			.delete_policy(&policy)
			.await
			.map_err(CredentialsError::backend(
				ProjectStep::DeletePolicy.as_str(),
				policy,
			))
	}

	async fn delete_role(&self, name: &str) -> Result<()> {
		debug!(step = %ProjectStep::DeleteRole, "running project step");
		let path = self.namespace.project_role_path(name);
		self
			.logical
			.delete(&path)
			.await
			.map_err(CredentialsError::backend(ProjectStep::DeleteRole.as_str(), path))
	}

	fn role_payload(&self, name: &str) -> Payload {
		let mut payload = Payload::new();
		payload.insert(
			"secret_id_ttl".to_string(),
			json!(self.settings.secret_id_ttl),
		);
		payload.insert(
			"token_max_ttl".to_string(),
			json!(self.settings.token_max_ttl),
		);
		payload.insert("token_no_default_policy".to_string(), json!("true"));
		payload.insert(
			"token_num_uses".to_string(),
			json!(self.settings.token_num_uses),
		);
		payload.insert(
			"token_policies".to_string(),
			json!(self.namespace.policy_name(name)),
		);
		payload
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::BackendError;
	use crate::memory::{MemoryBackend, Operation};

	fn manager(backend: &Arc<MemoryBackend>) -> ProjectManager {
		ProjectManager::new(
			backend.clone(),
			backend.clone(),
			Namespace::default(),
			AppRoleSettings::default(),
		)
	}

	#[tokio::test]
	async fn create_runs_steps_in_order() {
		let backend = Arc::new(MemoryBackend::new());
		let creds = manager(&backend).create("proj1").await.unwrap();

		assert!(!creds.role_id.is_empty());
		assert!(!creds.secret_id.is_empty());

		let role = "auth/approle/role/argo-cloudops-projects-proj1";
		assert_eq!(
			backend.operations().await,
			vec![
				Operation::PutPolicy("argo-cloudops-projects-proj1".to_string()),
				Operation::Write(role.to_string()),
				Operation::Read(format!("{role}/role-id")),
				Operation::Write(format!("{role}/secret-id")),
			]
		);
	}

	#[tokio::test]
	async fn create_writes_role_parameters() {
		let backend = Arc::new(MemoryBackend::new());
		manager(&backend).create("proj1").await.unwrap();

		let role = backend
			.stored("auth/approle/role/argo-cloudops-projects-proj1")
			.await
			.unwrap();
		assert_eq!(role["secret_id_ttl"], "8776h");
		assert_eq!(role["token_max_ttl"], "10m");
		assert_eq!(role["token_num_uses"], 3);
		assert_eq!(role["token_no_default_policy"], "true");
		assert_eq!(role["token_policies"], "argo-cloudops-projects-proj1");

		let policy = backend.policy("argo-cloudops-projects-proj1").await.unwrap();
		assert!(policy.contains("aws/sts/argo-cloudops-projects-proj1-target-*"));
	}

	#[tokio::test]
	async fn create_is_rerunnable() {
		let backend = Arc::new(MemoryBackend::new());
		let manager = manager(&backend);
		let first = manager.create("proj1").await.unwrap();
		let second = manager.create("proj1").await.unwrap();

		assert_eq!(first.role_id, second.role_id);
		assert_ne!(first.secret_id, second.secret_id);
	}

	#[tokio::test]
	async fn create_stops_at_first_failure_without_rollback() {
		let backend = Arc::new(MemoryBackend::new());
		backend
			.fail_path(
				"auth/approle/role/argo-cloudops-projects-proj1/role-id",
				BackendError::Api {
					status: 500,
					errors: vec!["boom".to_string()],
				},
			)
			.await;

		let err = manager(&backend).create("proj1").await.unwrap_err();
		assert!(matches!(
			err,
			CredentialsError::Backend { operation: "read_role_id", .. }
		));

		// policy and role were written and remain
		assert!(backend.policy("argo-cloudops-projects-proj1").await.is_some());
		assert!(backend
			.stored("auth/approle/role/argo-cloudops-projects-proj1")
			.await
			.is_some());
		assert!(!backend
			.operations()
			.await
			.iter()
			.any(|op| matches!(op, Operation::Write(p) if p.ends_with("/secret-id"))));
	}

	#[tokio::test]
	async fn get_and_exists() {
		let backend = Arc::new(MemoryBackend::new());
		let manager = manager(&backend);

		let err = manager.get("proj1").await.unwrap_err();
		assert!(err.is_not_found());
		assert!(!manager.exists("proj1").await.unwrap());

		manager.create("proj1").await.unwrap();
		assert_eq!(
			manager.get("proj1").await.unwrap(),
			ProjectDescriptor {
				name: "proj1".to_string()
			}
		);
		assert!(manager.exists("proj1").await.unwrap());
	}

	#[tokio::test]
	async fn exists_propagates_backend_errors() {
		let backend = Arc::new(MemoryBackend::new());
		backend
			.fail_path(
				"auth/approle/role/argo-cloudops-projects-proj1",
				BackendError::Transport("connection refused".to_string()),
			)
			.await;

		let err = manager(&backend).exists("proj1").await.unwrap_err();
		assert!(matches!(
			err,
			CredentialsError::Backend {
				operation: "get_project",
				source: BackendError::Transport(_),
				..
			}
		));
	}

	#[tokio::test]
	async fn delete_removes_policy_then_role() {
		let backend = Arc::new(MemoryBackend::new());
		let manager = manager(&backend);
		manager.create("proj1").await.unwrap();
		backend.clear_operations().await;

		manager.delete("proj1").await.unwrap();

		assert_eq!(
			backend.operations().await,
			vec![
				Operation::DeletePolicy("argo-cloudops-projects-proj1".to_string()),
				Operation::Delete("auth/approle/role/argo-cloudops-projects-proj1".to_string()),
			]
		);
		assert!(!manager.exists("proj1").await.unwrap());
	}

	#[tokio::test]
	async fn delete_surfaces_policy_failure() {
		let backend = Arc::new(MemoryBackend::new());
		backend
			.fail_path(
				"argo-cloudops-projects-proj1",
				BackendError::Api {
					status: 403,
					errors: vec!["permission denied".to_string()],
				},
			)
			.await;

		let err = manager(&backend).delete("proj1").await.unwrap_err();
		assert!(matches!(
			err,
			CredentialsError::Backend { operation: "delete_policy", .. }
		));
		assert!(err.to_string().contains("permission denied"));
	}

	#[tokio::test]
	async fn rejects_invalid_names_before_io() {
		let backend = Arc::new(MemoryBackend::new());
		let err = manager(&backend).create("a/b").await.unwrap_err();
		assert!(matches!(err, CredentialsError::InvalidName { .. }));
		assert!(backend.operations().await.is_empty());
	}

	#[tokio::test]
	async fn delete_stops_before_role_when_policy_fails() {
		let backend = Arc::new(MemoryBackend::new());
		let manager = manager(&backend);
		manager.create("proj1").await.unwrap();
		backend
			.fail_path(
				"argo-cloudops-projects-proj1",
				BackendError::Transport("reset".to_string()),
			)
			.await;
		backend.clear_operations().await;

		manager.delete("proj1").await.unwrap_err();

		assert_eq!(
			backend.operations().await,
			vec![Operation::DeletePolicy(
				"argo-cloudops-projects-proj1".to_string()
			)]
		);
		assert!(manager.exists("proj1").await.unwrap());
	}

	#[test]
	fn step_names() {
		assert_eq!(ProjectStep::WritePolicy.as_str(), "write_policy");
		assert_eq!(ProjectStep::DeleteRole.as_str(), "delete_role");
		assert_eq!(ProjectStep::GenerateSecretId.to_string(), "generate_secret_id");
	}
}
