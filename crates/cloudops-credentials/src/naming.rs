// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backend path and policy naming conventions.
//!
//! These strings address entries that already exist in deployed backends, so
//! the defaults must stay bit-exact:
//!
//! ```text
//! project role     auth/approle/role/<prefix>-<project>
//! role id          auth/approle/role/<prefix>-<project>/role-id
//! secret id        auth/approle/role/<prefix>-<project>/secret-id
//! target role      aws/roles/<prefix>-<project>-target-<target>
//! policy name      <prefix>-<project>
//! sts pattern      aws/sts/<prefix>-<project>-target-*
//! login            auth/approle/login
//! ```

use crate::error::{CredentialsError, EntityKind, Result};

/// Default prefix namespacing every project owned by this service.
pub const DEFAULT_PROJECT_PREFIX: &str = "argo-cloudops-projects";

/// Default mount point of the AWS secrets engine.
pub const DEFAULT_AWS_MOUNT: &str = "aws";

/// AppRole role definitions live under this path.
pub const APPROLE_ROLE_PREFIX: &str = "auth/approle/role";

/// Credential-pair login endpoint.
pub const APPROLE_LOGIN_PATH: &str = "auth/approle/login";

const TARGET_SEPARATOR: &str = "-target-";
const TARGET_SUFFIX: &str = "-target";

/// Derives every backend path and policy name from project/target names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
	project_prefix: String,
	aws_mount: String,
}

impl Namespace {
	pub fn new(project_prefix: impl Into<String>, aws_mount: impl Into<String>) -> Self {
		Self {
			project_prefix: project_prefix.into(),
			aws_mount: aws_mount.into().trim_matches('/').to_string(),
		}
	}

	pub fn project_prefix(&self) -> &str {
		&self.project_prefix
	}

	pub fn aws_mount(&self) -> &str {
		&self.aws_mount
	}

	/// `<prefix>-<project>`: both the AppRole name and the policy name.
	pub fn project_role_name(&self, project: &str) -> String {
		format!("{}-{}", self.project_prefix, project)
	}

	pub fn policy_name(&self, project: &str) -> String {
		self.project_role_name(project)
	}

	pub fn project_role_path(&self, project: &str) -> String {
		format!("{}/{}", APPROLE_ROLE_PREFIX, self.project_role_name(project))
	}

	pub fn role_id_path(&self, project: &str) -> String {
		format!("{}/role-id", self.project_role_path(project))
	}

	pub fn secret_id_path(&self, project: &str) -> String {
		format!("{}/secret-id", self.project_role_path(project))
	}

	/// Prefix shared by every target role name of `project`.
	pub fn target_prefix(&self, project: &str) -> String {
		format!("{}{}", self.project_role_name(project), TARGET_SEPARATOR)
	}

	pub fn target_role_name(&self, project: &str, target: &str) -> String {
		format!("{}{}", self.target_prefix(project), target)
	}

	pub fn target_role_path(&self, project: &str, target: &str) -> String {
		format!(
			"{}/roles/{}",
			self.aws_mount,
			self.target_role_name(project, target)
		)
	}

	/// Directory listed to enumerate target roles across all projects.
	pub fn target_roles_dir(&self) -> String {
		format!("{}/roles/", self.aws_mount)
	}

	/// Credential-issuing path pattern a project's tokens may read.
	pub fn sts_pattern(&self, project: &str) -> String {
		format!("{}/sts/{}*", self.aws_mount, self.target_prefix(project))
	}
}

impl Default for Namespace {
	fn default() -> Self {
		Self::new(DEFAULT_PROJECT_PREFIX, DEFAULT_AWS_MOUNT)
	}
}

/// Reject names that would alter the meaning of a path or policy.
///
/// Names are spliced into backend paths and into policy path globs, so `/`,
/// `*`, quotes and whitespace would let one project address another's
/// namespace.
///
/// Project names additionally must not contain `-target-` or end in
/// `-target`. Otherwise `<prefix>-a-target-*` (project `a`'s STS glob and
/// list prefix) would also cover the targets of projects `a-target-b` and
/// `a-target`.
pub fn validate_name(kind: EntityKind, name: &str) -> Result<()> {
	let invalid = |reason| CredentialsError::InvalidName {
		kind,
		name: name.to_string(),
		reason,
	};

	if name.is_empty() {
		return Err(invalid("must not be empty"));
	}
	if !name
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
	{
		return Err(invalid(
			"only ASCII letters, digits, '-', '_' and '.' are allowed",
		));
	}
	if name.starts_with('.') {
		return Err(invalid("must not start with '.'"));
	}
	if kind == EntityKind::Project
		&& (name.contains(TARGET_SEPARATOR) || name.ends_with(TARGET_SUFFIX))
	{
		return Err(invalid(
			"must not contain '-target-' or end in '-target'",
		));
	}
	Ok(())
}
