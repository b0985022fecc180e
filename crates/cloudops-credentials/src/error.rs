// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for credential operations.

use std::fmt;

use thiserror::Error;

use crate::authorization::CredentialClass;
use crate::backend::BackendError;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialsError>;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
	Project,
	Target,
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EntityKind::Project => write!(f, "project"),
			EntityKind::Target => write!(f, "target"),
		}
	}
}

/// Errors surfaced by the credential provider.
///
/// Messages carry the operation and backend path but never credential
/// material.
#[derive(Debug, Error)]
pub enum CredentialsError {
	/// The authorization header did not split into `provider:key:secret`.
	#[error("invalid authorization header provided")]
	MalformedAuthorization,

	/// The caller's credential class may not perform the operation.
	#[error("permission denied: {operation} requires {required} credentials")]
	PermissionDenied {
		operation: &'static str,
		required: CredentialClass,
	},

	/// A project or target name cannot be embedded in backend paths.
	#[error("invalid {kind} name '{name}': {reason}")]
	InvalidName {
		kind: EntityKind,
		name: String,
		reason: &'static str,
	},

	/// The entity does not exist in the backend.
	#[error("{kind} not found: {name}")]
	NotFound { kind: EntityKind, name: String },

	/// The backend rejected or failed a request.
	#[error("{operation} failed at {path}: {source}")]
	Backend {
		operation: &'static str,
		path: String,
		#[source]
		source: BackendError,
	},

	/// The backend answered with a body missing or mistyping an expected field.
	#[error("unexpected backend response at {path}: {message}")]
	Decode { path: String, message: String },
}

impl CredentialsError {
	/// Build a `map_err` adapter that wraps a [`BackendError`] with context.
	pub(crate) fn backend(
		operation: &'static str,
		path: impl Into<String>,
	) -> impl FnOnce(BackendError) -> CredentialsError {
		let path = path.into();
		move |source| CredentialsError::Backend {
			operation,
			path,
			source,
		}
	}

	pub(crate) fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
		CredentialsError::Decode {
			path: path.into(),
			message: message.into(),
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, CredentialsError::NotFound { .. })
	}

	pub fn is_permission_denied(&self) -> bool {
		matches!(self, CredentialsError::PermissionDenied { .. })
	}
}
