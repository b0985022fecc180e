// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vault HTTP API backend for the credential provider.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cloudops_vault::{VaultClient, VaultClientConfig};
//!
//! let client = Arc::new(VaultClient::new(VaultClientConfig {
//!     address: "https://vault.internal:8200".to_string(),
//!     token: Some(token),
//!     ..VaultClientConfig::default()
//! })?);
//! let factory = ProviderFactory::new(client.clone(), client, admin_secret);
//! ```

mod client;
mod error;
pub mod http;

pub use client::{VaultClient, VaultClientConfig, DEFAULT_ADDRESS, DEFAULT_TIMEOUT};
pub use error::{VaultError, VaultResult};
