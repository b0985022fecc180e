// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Target lifecycle: project-scoped AWS secrets-engine roles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::backend::{KeyList, LogicalBackend, Payload, TargetRoleData};
use crate::error::{CredentialsError, EntityKind, Result};
use crate::naming::{validate_name, Namespace};

/// Cloud role a target hands out credentials for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProperties {
	pub credential_type: String,
	pub policy_arns: Vec<String>,
	pub role_arn: String,
}

/// Body of a target creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTargetRequest {
	pub name: String,
	pub properties: TargetProperties,
	#[serde(rename = "type", default)]
	pub target_type: String,
}

/// Creates, reads, lists and removes a project's targets. Performs no
/// authorization.
#[derive(Clone)]
pub struct TargetManager {
	logical: Arc<dyn LogicalBackend>,
	namespace: Namespace,
}

impl TargetManager {
	pub fn new(logical: Arc<dyn LogicalBackend>, namespace: Namespace) -> Self {
		Self { logical, namespace }
	}

	/// Store the target role verbatim.
	///
	/// ARNs are not validated and the referenced AWS role is not checked for
	/// existence; the secrets engine reports problems only when credentials
	/// are first requested.
	#[instrument(skip(self, request), fields(project = %project, target = %request.name))]
	pub async fn create(&self, project: &str, request: &CreateTargetRequest) -> Result<()> {
		validate_name(EntityKind::Project, project)?;
		validate_name(EntityKind::Target, &request.name)?;

		let path = self.namespace.target_role_path(project, &request.name);
		let properties = &request.properties;

		let mut payload = Payload::new();
		payload.insert("role_arns".to_string(), json!([properties.role_arn]));
		payload.insert(
			"credential_type".to_string(),
			json!(properties.credential_type),
		);
		payload.insert("policy_arns".to_string(), json!(properties.policy_arns));

		self
			.logical
			.write(&path, payload)
			.await
			.map_err(CredentialsError::backend("create_target", path))?;

		info!("target created");
		Ok(())
	}

	#[instrument(skip(self), fields(project = %project, target = %target))]
	pub async fn get(&self, project: &str, target: &str) -> Result<TargetProperties> {
		validate_name(EntityKind::Project, project)?;
		validate_name(EntityKind::Target, target)?;

		let path = self.namespace.target_role_path(project, target);
		let response = self
			.logical
			.read(&path)
			.await
			.map_err(CredentialsError::backend("get_target", path.clone()))?
			.ok_or_else(|| CredentialsError::NotFound {
				kind: EntityKind::Target,
				name: format!("{project}/{target}"),
			})?;

		let data: TargetRoleData = response.decode_data(&path)?;
		let role_arn = data
			.role_arns
			.into_iter()
			.next()
			.ok_or_else(|| CredentialsError::decode(&path, "role_arns is empty"))?;

		Ok(TargetProperties {
			credential_type: data.credential_type,
			policy_arns: data.policy_arns,
			role_arn,
		})
	}

	pub async fn exists(&self, project: &str, target: &str) -> Result<bool> {
		match self.get(project, target).await {
			Ok(_) => Ok(true),
			Err(e) if e.is_not_found() => Ok(false),
			Err(e) => Err(e),
		}
	}

	/// Names of the project's targets, in backend listing order.
	///
	/// The backend can only list the whole roles directory, so entries are
	/// filtered by the project's target prefix.
	#[instrument(skip(self), fields(project = %project))]
	pub async fn list(&self, project: &str) -> Result<Vec<String>> {
		validate_name(EntityKind::Project, project)?;

		let dir = self.namespace.target_roles_dir();
		let Some(response) = self
			.logical
			.list(&dir)
			.await
			.map_err(CredentialsError::backend("list_targets", dir.clone()))?
		else {
			return Ok(Vec::new());
		};

		let listing: KeyList = response.decode_data(&dir)?;
		let prefix = self.namespace.target_prefix(project);
		let targets: Vec<String> = listing
			.keys
			.iter()
			.filter_map(|key| key.strip_prefix(prefix.as_str()))
			.filter(|name| !name.is_empty())
			.map(str::to_string)
			.collect();

		debug!(
			total = listing.keys.len(),
			matched = targets.len(),
			"filtered target roles"
		);
		Ok(targets)
	}

	/// Delete the target role. Deleting a target that does not exist succeeds.
	#[instrument(skip(self), fields(project = %project, target = %target))]
	pub async fn delete(&self, project: &str, target: &str) -> Result<()> {
		validate_name(EntityKind::Project, project)?;
		validate_name(EntityKind::Target, target)?;

		let path = self.namespace.target_role_path(project, target);
		self
			.logical
			.delete(&path)
			.await
			.map_err(CredentialsError::backend("delete_target", path))?;

		info!("target deleted");
		Ok(())
	}
}
