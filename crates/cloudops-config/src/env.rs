// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable helpers for loading secrets.
//!
//! Secrets support the `*_FILE` convention used by Docker and Kubernetes
//! secret mounts: `CLOUDOPS_ADMIN_SECRET_FILE=/run/secrets/admin` is read in
//! preference to `CLOUDOPS_ADMIN_SECRET`.

use std::fs;
use std::path::PathBuf;

use cloudops_common_secret::SecretString;
use thiserror::Error;

/// Errors that can occur when loading secrets from environment variables.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	/// Failed to read the secret file.
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The secret file path was empty.
	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret using the `VAR` / `VAR_FILE` convention from the process
/// environment.
///
/// # Precedence
///
/// 1. If `{var}_FILE` is set, read the secret from that file path
/// 2. Otherwise, if `{var}` is set, use its value directly
/// 3. Otherwise, return `Ok(None)`
///
/// A single trailing newline is stripped from file contents.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	load_secret_with(var, |name| std::env::var(name).ok())
}

/// [`load_secret_env`] with an explicit variable lookup.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<Option<SecretString>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path_str) = lookup(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(lookup(var).map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn returns_none_when_not_set() {
		let result = load_secret_with("CLOUDOPS_X", lookup(&[])).unwrap();
		assert!(result.is_none());
	}

	#[test]
	fn reads_direct_value() {
		let result = load_secret_with("CLOUDOPS_X", lookup(&[("CLOUDOPS_X", "direct")])).unwrap();
		assert_eq!(result.unwrap().expose(), "direct");
	}

	#[test]
	fn file_var_takes_precedence_and_strips_newline() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();
		let path = file.path().to_str().unwrap().to_string();

		let result = load_secret_with(
			"CLOUDOPS_X",
			lookup(&[("CLOUDOPS_X", "direct"), ("CLOUDOPS_X_FILE", &path)]),
		)
		.unwrap();
		assert_eq!(result.unwrap().expose(), "from-file");
	}

	#[test]
	fn empty_file_path_is_error() {
		let err = load_secret_with("CLOUDOPS_X", lookup(&[("CLOUDOPS_X_FILE", "")])).unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { ref var } if var == "CLOUDOPS_X_FILE"));
	}

	#[test]
	fn missing_file_is_io_error() {
		let err = load_secret_with(
			"CLOUDOPS_X",
			lookup(&[("CLOUDOPS_X_FILE", "/nonexistent/cloudops/secret")]),
		)
		.unwrap_err();
		assert!(matches!(err, SecretEnvError::Io { .. }));
	}

	#[test]
	fn reads_process_environment() {
		let var = "CLOUDOPS_TEST_DIRECT_SECRET_7731";
		std::env::set_var(var, "env-secret");
		std::env::remove_var(format!("{var}_FILE"));

		let result = load_secret_env(var).unwrap();
		assert_eq!(result.unwrap().expose(), "env-secret");

		std::env::remove_var(var);
	}
}
