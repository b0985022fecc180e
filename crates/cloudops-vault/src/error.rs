// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for constructing the Vault client.
//!
//! Request-time failures are reported as
//! [`cloudops_credentials::BackendError`] through the backend traits.

use thiserror::Error;

/// Errors that can occur when building a [`crate::VaultClient`].
#[derive(Debug, Error)]
pub enum VaultError {
	/// The configured address is not a valid URL.
	#[error("invalid vault address: {0}")]
	InvalidAddress(#[from] url::ParseError),

	/// The configuration is rejected.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The HTTP client could not be built.
	#[error("failed to create HTTP client: {0}")]
	Http(#[from] reqwest::Error),
}

/// Result type for client construction.
pub type VaultResult<T> = Result<T, VaultError>;
