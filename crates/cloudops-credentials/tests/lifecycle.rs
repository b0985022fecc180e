// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end project lifecycle against the in-memory backend.

use std::sync::Arc;

use cloudops_credentials::{
	CreateTargetRequest, CredentialsError, EntityKind, MemoryBackend, Provider, ProviderFactory,
	SecretString, TargetProperties,
};

const ADMIN_HEADER: &str = "vault:admin:admin-secret";

fn factory(backend: &Arc<MemoryBackend>) -> ProviderFactory {
	ProviderFactory::new(
		backend.clone(),
		backend.clone(),
		SecretString::from("admin-secret"),
	)
}

fn target(name: &str, role: &str) -> CreateTargetRequest {
	CreateTargetRequest {
		name: name.to_string(),
		properties: TargetProperties {
			credential_type: "assumed_role".to_string(),
			policy_arns: vec!["arn:aws:iam::aws:policy/ReadOnlyAccess".to_string()],
			role_arn: format!("arn:aws:iam::123456789012:role/{role}"),
		},
		target_type: "aws_account".to_string(),
	}
}

#[tokio::test]
async fn project_lifecycle_end_to_end() {
	let backend = Arc::new(MemoryBackend::new());
	let factory = factory(&backend);
	let admin = factory.provider_for_header(ADMIN_HEADER).unwrap();

	assert!(!admin.project_exists("payments").await.unwrap());
	let creds = admin.create_project("payments").await.unwrap();
	assert!(admin.project_exists("payments").await.unwrap());

	admin
		.create_target("payments", &target("prod", "deployer"))
		.await
		.unwrap();
	admin
		.create_target("payments", &target("staging", "deployer-staging"))
		.await
		.unwrap();

	let mut targets = admin.list_targets("payments").await.unwrap();
	targets.sort();
	assert_eq!(targets, vec!["prod", "staging"]);

	let prod = admin.get_target("payments", "prod").await.unwrap();
	assert_eq!(prod, target("prod", "deployer").properties);

	let tenant = factory
		.provider_for_header(&format!(
			"vault:{}:{}",
			creds.role_id,
			creds.secret_id.expose()
		))
		.unwrap();
	let issued = tenant.issue_token().await.unwrap();
	assert_eq!(issued.policies, vec!["argo-cloudops-projects-payments"]);
	assert_eq!(issued.num_uses, 3);

	admin.delete_target("payments", "staging").await.unwrap();
	assert_eq!(admin.list_targets("payments").await.unwrap(), vec!["prod"]);

	admin.delete_project("payments").await.unwrap();
	assert!(!admin.project_exists("payments").await.unwrap());
	assert!(backend.policy("argo-cloudops-projects-payments").await.is_none());

	// the deleted role's secret ids no longer log in
	let err = tenant.get_token().await.unwrap_err();
	assert!(matches!(err, CredentialsError::Backend { .. }));
}

#[tokio::test]
async fn tokens_are_scoped_to_their_own_project() {
	let backend = Arc::new(MemoryBackend::new());
	let factory = factory(&backend);
	let admin = factory.provider_for_header(ADMIN_HEADER).unwrap();

	let alpha = admin.create_project("alpha").await.unwrap();
	let beta = admin.create_project("beta").await.unwrap();
	assert_ne!(alpha.role_id, beta.role_id);

	for (creds, project) in [(&alpha, "alpha"), (&beta, "beta")] {
		let tenant = factory
			.provider_for_header(&format!(
				"vault:{}:{}",
				creds.role_id,
				creds.secret_id.expose()
			))
			.unwrap();
		let token = tenant.get_token().await.unwrap();

		let policies = backend.token_policies(token.expose()).await.unwrap();
		assert_eq!(policies, vec![format!("argo-cloudops-projects-{project}")]);

		let rules = backend.policy(&policies[0]).await.unwrap();
		assert!(rules.contains(&format!("argo-cloudops-projects-{project}-target-*")));
	}

	// a pair mixing two projects' halves is rejected
	let mixed = factory
		.provider_for_header(&format!(
			"vault:{}:{}",
			alpha.role_id,
			beta.secret_id.expose()
		))
		.unwrap();
	assert!(mixed.get_token().await.is_err());
}

#[tokio::test]
async fn failed_create_is_cleaned_up_by_delete() {
	let backend = Arc::new(MemoryBackend::new());
	let admin = factory(&backend).provider_for_header(ADMIN_HEADER).unwrap();

	backend
		.fail_path(
			"auth/approle/role/argo-cloudops-projects-gamma/secret-id",
			cloudops_credentials::BackendError::Transport("reset".to_string()),
		)
		.await;
	let err = admin.create_project("gamma").await.unwrap_err();
	assert!(matches!(
		err,
		CredentialsError::Backend {
			operation: "generate_secret_id",
			..
		}
	));
	// partial state remains
	assert!(admin.project_exists("gamma").await.unwrap());

	admin.delete_project("gamma").await.unwrap();
	assert!(!admin.project_exists("gamma").await.unwrap());
}

#[tokio::test]
async fn project_names_overlapping_a_target_namespace_are_rejected() {
	let backend = Arc::new(MemoryBackend::new());
	let admin = factory(&backend).provider_for_header(ADMIN_HEADER).unwrap();

	admin.create_project("a").await.unwrap();
	admin.create_target("a", &target("prod", "deployer")).await.unwrap();
	backend.clear_operations().await;

	for name in ["a-target-b", "a-target"] {
		let err = admin.create_project(name).await.unwrap_err();
		assert!(
			matches!(
				err,
				CredentialsError::InvalidName {
					kind: EntityKind::Project,
					..
				}
			),
			"{name}: {err:?}"
		);
	}
	assert!(backend.operations().await.is_empty());
	assert!(backend
		.policy("argo-cloudops-projects-a-target-b")
		.await
		.is_none());

	assert_eq!(admin.list_targets("a").await.unwrap(), vec!["prod"]);
}

#[tokio::test]
async fn issued_tokens_read_only_their_project_targets_until_spent() {
	let backend = Arc::new(MemoryBackend::new());
	let factory = factory(&backend);
	let admin = factory.provider_for_header(ADMIN_HEADER).unwrap();

	let alpha = admin.create_project("alpha").await.unwrap();
	admin.create_project("beta").await.unwrap();
	admin.create_target("alpha", &target("prod", "deployer")).await.unwrap();
	admin.create_target("beta", &target("prod", "deployer")).await.unwrap();

	let tenant = factory
		.provider_for_header(&format!(
			"vault:{}:{}",
			alpha.role_id,
			alpha.secret_id.expose()
		))
		.unwrap();
	let issued = tenant.issue_token().await.unwrap();
	let token = issued.client_token.expose();
	assert_eq!(issued.num_uses, 3);

	let own = "aws/sts/argo-cloudops-projects-alpha-target-prod";
	let other = "aws/sts/argo-cloudops-projects-beta-target-prod";

	assert!(backend.read_with_token(token, own).await.unwrap().is_some());
	assert!(backend.read_with_token(token, other).await.is_err());
	assert!(backend.read_with_token(token, own).await.unwrap().is_some());
	assert_eq!(backend.token_remaining_uses(token).await, None);
	assert!(backend.read_with_token(token, own).await.is_err());
}
