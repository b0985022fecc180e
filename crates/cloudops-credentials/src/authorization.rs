// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing and classification of caller authorization headers.
//!
//! Callers present `<provider>:<key>:<secret>`. Only the first two colons are
//! significant, so the secret may itself contain colons. The key decides the
//! [`CredentialClass`]: keys listed in [`AdminKeys`] are admin credentials,
//! anything else is a tenant's `(role_id, secret_id)` pair.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use cloudops_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialsError, Result};

/// Separator between the three header segments.
pub const AUTHORIZATION_DELIMITER: char = ':';

/// Key recognised as admin when no other set is configured.
pub const DEFAULT_ADMIN_KEY: &str = "admin";

/// Which side of the provider a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialClass {
	/// Control-plane operator: manages projects and targets.
	Admin,
	/// A project's durable role credentials: may only exchange for tokens.
	Tenant,
}

impl fmt::Display for CredentialClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CredentialClass::Admin => write!(f, "admin"),
			CredentialClass::Tenant => write!(f, "tenant"),
		}
	}
}

/// The set of header keys that classify a caller as admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminKeys(BTreeSet<String>);

impl AdminKeys {
	pub fn new<I, S>(keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(keys.into_iter().map(Into::into).collect())
	}

	pub fn contains(&self, key: &str) -> bool {
		self.0.contains(key)
	}

	pub fn classify(&self, key: &str) -> CredentialClass {
		if self.contains(key) {
			CredentialClass::Admin
		} else {
			CredentialClass::Tenant
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

impl Default for AdminKeys {
	fn default() -> Self {
		Self::new([DEFAULT_ADMIN_KEY])
	}
}

/// A parsed, classified authorization header.
///
/// Immutable once parsed. The secret is held redacted.
#[derive(Debug, Clone)]
pub struct Authorization {
	provider: String,
	key: String,
	secret: SecretString,
	class: CredentialClass,
}

impl Authorization {
	/// Parse a header using the default admin key set.
	pub fn parse(raw: &str) -> Result<Self> {
		Self::parse_with(raw, &AdminKeys::default())
	}

	/// Parse a header and classify it against `admin_keys`.
	pub fn parse_with(raw: &str, admin_keys: &AdminKeys) -> Result<Self> {
		let mut segments = raw.splitn(3, AUTHORIZATION_DELIMITER);
		let (Some(provider), Some(key), Some(secret)) =
			(segments.next(), segments.next(), segments.next())
		else {
			return Err(CredentialsError::MalformedAuthorization);
		};

		if provider.is_empty() || key.is_empty() || secret.is_empty() {
			return Err(CredentialsError::MalformedAuthorization);
		}

		Ok(Self {
			provider: provider.to_string(),
			key: key.to_string(),
			secret: SecretString::new(secret.to_string()),
			class: admin_keys.classify(key),
		})
	}

	pub fn provider(&self) -> &str {
		&self.provider
	}

	/// The key segment. For tenants this is the project's role ID.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// The secret segment. For tenants this is the project's secret ID.
	pub fn secret(&self) -> &SecretString {
		&self.secret
	}

	pub fn class(&self) -> CredentialClass {
		self.class
	}

	pub fn is_admin(&self) -> bool {
		self.class == CredentialClass::Admin
	}

	/// Admin key *and* a secret equal to the process-wide admin secret.
	pub fn is_authorized_admin(&self, admin_secret: &SecretString) -> bool {
		self.is_admin() && admin_secret.constant_time_eq(self.secret.expose())
	}
}

impl FromStr for Authorization {
	type Err = CredentialsError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}
