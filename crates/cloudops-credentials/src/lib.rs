// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project and target credential scoping over a Vault-style secret backend.
//!
//! This crate turns one privileged backend into per-project credential
//! domains:
//! 1. Admin callers create projects. Each gets an ACL policy and an AppRole
//!    identity whose tokens carry only that policy.
//! 2. Admin callers register targets: cloud roles under the project's
//!    namespace in the AWS secrets engine.
//! 3. Tenants exchange their project's `(role_id, secret_id)` pair for a
//!    short-lived, use-limited token that can only read their own targets'
//!    STS credentials.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cloudops_credentials::{MemoryBackend, Provider, ProviderFactory, SecretString};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(MemoryBackend::new());
//!     let factory = ProviderFactory::new(backend.clone(), backend, SecretString::from("s3cret"));
//!
//!     let admin = factory.provider_for_header("vault:admin:s3cret")?;
//!     let creds = admin.create_project("payments").await?;
//!
//!     let tenant = factory.provider_for_header(&format!(
//!         "vault:{}:{}",
//!         creds.role_id,
//!         creds.secret_id.expose()
//!     ))?;
//!     let token = tenant.get_token().await?;
//!     println!("token: {token}"); // Prints: token: [REDACTED]
//!     Ok(())
//! }
//! ```

pub mod authorization;
pub mod backend;
pub mod error;
pub mod memory;
pub mod naming;
pub mod policy;
pub mod project;
pub mod provider;
pub mod target;
pub mod token;

pub use authorization::{AdminKeys, Authorization, CredentialClass};
pub use backend::{
	BackendError, BackendResult, LogicalBackend, Payload, PolicyBackend, SecretAuth, SecretResponse,
};
pub use error::{CredentialsError, EntityKind, Result};
pub use memory::{MemoryBackend, Operation};
pub use naming::Namespace;
pub use policy::synthesize_readonly_policy;
pub use project::{
	AppRoleSettings, CreateProjectRequest, ProjectCredentials, ProjectDescriptor, ProjectManager,
	ProjectStep,
};
pub use provider::{CredentialProvider, Provider, ProviderFactory};
pub use target::{CreateTargetRequest, TargetManager, TargetProperties};
pub use token::{IssuedToken, TokenExchanger};

pub use cloudops_common_secret::SecretString;
