// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand definitions and their execution against a provider.

use anyhow::{Context, Result};
use clap::Subcommand;
use cloudops_credentials::{
	CreateProjectRequest, CreateTargetRequest, CredentialProvider, Provider, ProjectCredentials,
	TargetProperties,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
	/// Manage projects
	Project {
		#[command(subcommand)]
		command: ProjectCommand,
	},

	/// Manage a project's cloud targets
	Target {
		#[command(subcommand)]
		command: TargetCommand,
	},

	/// Exchange tenant credentials for a short-lived token
	Token,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommand {
	/// Create a project and print its role_id and secret_id
	Create {
		#[arg(required_unless_present = "body")]
		name: Option<String>,

		/// Request body as JSON, e.g. `{"name": "payments"}`
		#[arg(long, conflicts_with = "name")]
		body: Option<String>,
	},

	/// Show a project
	Get { name: String },

	/// Report whether a project exists
	Exists { name: String },

	/// Delete a project's policy and role
	Delete { name: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TargetCommand {
	/// Register a cloud role under a project
	Create {
		project: String,

		/// Target name
		#[arg(long)]
		name: String,

		/// Cloud role assumed when issuing credentials
		#[arg(long)]
		role_arn: String,

		#[arg(long, default_value = "assumed_role")]
		credential_type: String,

		/// Session policy ARN (repeatable)
		#[arg(long = "policy-arn", value_name = "ARN")]
		policy_arns: Vec<String>,

		/// Cloud provider type label
		#[arg(long = "type", default_value = "aws")]
		target_type: String,
	},

	/// Show a target's properties
	Get { project: String, target: String },

	/// Report whether a target exists
	Exists { project: String, target: String },

	/// List a project's target names
	List { project: String },

	/// Delete a target
	Delete { project: String, target: String },
}

/// Run `command` and return the JSON document to print.
#[instrument(skip(provider), fields(caller = %provider.authorization().key()))]
pub async fn execute(provider: &CredentialProvider, command: Command) -> Result<Value> {
	match command {
		Command::Project { command } => execute_project(provider, command).await,
		Command::Target { command } => execute_target(provider, command).await,
		Command::Token => {
			let issued = provider
				.issue_token()
				.await
				.context("failed to issue token")?;
			debug!(lease = issued.lease_duration, "token issued");
			Ok(json!({
				"token": issued.client_token.expose(),
				"accessor": issued.accessor,
				"policies": issued.policies,
				"lease_duration": issued.lease_duration,
				"num_uses": issued.num_uses,
			}))
		}
	}
}

async fn execute_project(provider: &dyn Provider, command: ProjectCommand) -> Result<Value> {
	match command {
		ProjectCommand::Create { name, body } => {
			let CreateProjectRequest { name } = project_request(name, body.as_deref())?;
			let creds = provider
				.create_project(&name)
				.await
				.with_context(|| format!("failed to create project {name}"))?;
			Ok(credentials_json(&name, &creds))
		}
		ProjectCommand::Get { name } => {
			let project = provider
				.get_project(&name)
				.await
				.with_context(|| format!("failed to get project {name}"))?;
			Ok(serde_json::to_value(project)?)
		}
		ProjectCommand::Exists { name } => {
			let exists = provider
				.project_exists(&name)
				.await
				.with_context(|| format!("failed to check project {name}"))?;
			Ok(json!({ "name": name, "exists": exists }))
		}
		ProjectCommand::Delete { name } => {
			provider
				.delete_project(&name)
				.await
				.with_context(|| format!("failed to delete project {name}"))?;
			Ok(json!({ "name": name, "deleted": true }))
		}
	}
}

async fn execute_target(provider: &dyn Provider, command: TargetCommand) -> Result<Value> {
	match command {
		TargetCommand::Create {
			project,
			name,
			role_arn,
			credential_type,
			policy_arns,
			target_type,
		} => {
			let request = CreateTargetRequest {
				name,
				properties: TargetProperties {
					credential_type,
					policy_arns,
					role_arn,
				},
				target_type,
			};
			provider
				.create_target(&project, &request)
				.await
				.with_context(|| format!("failed to create target {} in {project}", request.name))?;
			Ok(json!({ "project": project, "name": request.name, "created": true }))
		}
		TargetCommand::Get { project, target } => {
			let properties = provider
				.get_target(&project, &target)
				.await
				.with_context(|| format!("failed to get target {target} in {project}"))?;
			Ok(serde_json::to_value(properties)?)
		}
		TargetCommand::Exists { project, target } => {
			let exists = provider
				.target_exists(&project, &target)
				.await
				.with_context(|| format!("failed to check target {target} in {project}"))?;
			Ok(json!({ "project": project, "name": target, "exists": exists }))
		}
		TargetCommand::List { project } => {
			let targets = provider
				.list_targets(&project)
				.await
				.with_context(|| format!("failed to list targets in {project}"))?;
			Ok(json!(targets))
		}
		TargetCommand::Delete { project, target } => {
			provider
				.delete_target(&project, &target)
				.await
				.with_context(|| format!("failed to delete target {target} in {project}"))?;
			Ok(json!({ "project": project, "name": target, "deleted": true }))
		}
	}
}

fn project_request(name: Option<String>, body: Option<&str>) -> Result<CreateProjectRequest> {
	match (name, body) {
		(_, Some(body)) => serde_json::from_str(body).context("invalid project request body"),
		(Some(name), None) => Ok(CreateProjectRequest { name }),
		(None, None) => anyhow::bail!("a project name or --body is required"),
	}
}

// The secret_id is shown exactly once, here.
fn credentials_json(name: &str, creds: &ProjectCredentials) -> Value {
	json!({
		"name": name,
		"role_id": creds.role_id,
		"secret_id": creds.secret_id.expose(),
	})
}
