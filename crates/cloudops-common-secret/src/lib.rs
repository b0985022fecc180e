// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for credential material.
//!
//! Project secret IDs, issued tokens, the Vault token and the admin secret all
//! travel through the system as [`SecretString`]. The wrapper:
//!
//! - prints `[REDACTED]` for both `Debug` and `Display`, so `tracing` fields
//!   recorded with `%` or `?` never carry the value
//! - serializes as `"[REDACTED]"` (deserializes normally, so config files work)
//! - zeroizes its memory on drop
//! - only hands out the value through an explicit [`Secret::expose`]
//!
//! ```
//! use cloudops_common_secret::SecretString;
//!
//! let secret_id = SecretString::new("9a1c-role-secret".to_string());
//! assert_eq!(format!("{secret_id}"), "[REDACTED]");
//! assert_eq!(secret_id.expose(), "9a1c-role-secret");
//! ```

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Placeholder written wherever a secret would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must not leak into logs, errors or serialized output.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// The common case: a secret string.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Every call site is a deliberate disclosure.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl<T> Secret<T>
where
	T: Zeroize + AsRef<[u8]>,
{
	/// Compare against a candidate without short-circuiting on the first
	/// differing byte. Lengths are still compared up front.
	pub fn constant_time_eq(&self, candidate: impl AsRef<[u8]>) -> bool {
		let expected = self.inner.as_ref();
		let candidate = candidate.as_ref();
		if expected.len() != candidate.len() {
			return false;
		}
		expected.ct_eq(candidate).into()
	}
}

impl SecretString {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod secret_type {
		use super::*;

		#[test]
		fn debug_and_display_are_redacted() {
			let secret = SecretString::from("role-secret-value");
			assert_eq!(format!("{secret}"), REDACTED);
			assert_eq!(format!("{secret:?}"), "Secret(\"[REDACTED]\")");
		}

		#[test]
		fn option_debug_is_redacted() {
			let secret = Some(SecretString::from("role-secret-value"));
			let debug = format!("{secret:?}");
			assert!(debug.contains(REDACTED));
			assert!(!debug.contains("role-secret-value"));
		}

		#[test]
		fn constant_time_eq_matches_only_identical_values() {
			let secret = SecretString::from("s3cr3t");
			assert!(secret.constant_time_eq("s3cr3t"));
			assert!(!secret.constant_time_eq("s3cr3T"));
			assert!(!secret.constant_time_eq("s3cr3t-longer"));
			assert!(!secret.constant_time_eq(""));
		}

		#[test]
		fn empty_secret_is_empty() {
			assert!(SecretString::from("").is_empty());
			assert!(!SecretString::from("x").is_empty());
		}

		#[cfg(feature = "serde")]
		#[test]
		fn serializes_redacted_and_deserializes_value() {
			let secret = SecretString::from("role-secret-value");
			let json = serde_json::to_string(&secret).unwrap();
			assert_eq!(json, "\"[REDACTED]\"");

			let parsed: SecretString = serde_json::from_str("\"from-config\"").unwrap();
			assert_eq!(parsed.expose(), "from-config");
		}
	}

	mod property_tests {
		use super::*;
		use proptest::prelude::*;

		proptest! {
			#[test]
			fn formatting_never_contains_value(inner in "[a-zA-Z0-9:_-]{3,40}") {
				prop_assume!(!inner.contains("REDACTED"));
				prop_assume!(!inner.contains("Secret"));

				let secret = SecretString::new(inner.clone());
				let display = format!("{secret}");
				let debug = format!("{secret:?}");
				prop_assert!(!display.contains(inner.as_str()));
				prop_assert!(!debug.contains(inner.as_str()));
			}

			#[test]
			fn constant_time_eq_agrees_with_eq(a in "[a-z0-9]{0,20}", b in "[a-z0-9]{0,20}") {
				let secret = SecretString::new(a.clone());
				prop_assert_eq!(secret.constant_time_eq(b.as_bytes()), a == b);
			}
		}
	}
}
