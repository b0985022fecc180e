// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backend naming configuration section.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PROJECT_PREFIX: &str = "argo-cloudops-projects";
pub const DEFAULT_AWS_MOUNT: &str = "aws";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamingConfigLayer {
	/// Prefix of every project's role and policy name.
	pub project_prefix: Option<String>,
	/// Mount point of the AWS secrets engine.
	pub aws_mount: Option<String>,
}

impl NamingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.project_prefix.is_some() {
			self.project_prefix = other.project_prefix;
		}
		if other.aws_mount.is_some() {
			self.aws_mount = other.aws_mount;
		}
	}

	pub fn finalize(self) -> Result<NamingConfig, ConfigError> {
		let config = NamingConfig {
			project_prefix: self
				.project_prefix
				.unwrap_or_else(|| DEFAULT_PROJECT_PREFIX.to_string()),
			aws_mount: self
				.aws_mount
				.unwrap_or_else(|| DEFAULT_AWS_MOUNT.to_string()),
		};

		if config.project_prefix.trim().is_empty() {
			return Err(ConfigError::Validation(
				"naming.project_prefix must not be empty".to_string(),
			));
		}
		if config.aws_mount.trim_matches('/').is_empty() {
			return Err(ConfigError::Validation(
				"naming.aws_mount must not be empty".to_string(),
			));
		}
		Ok(config)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamingConfig {
	pub project_prefix: String,
	pub aws_mount: String,
}
