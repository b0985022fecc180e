// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory backend for tests and local runs.
//!
//! Emulates the subset of backend behavior the managers rely on: AppRole role
//! definitions with generated role ids, secret-id minting, credential-pair
//! login, AWS role storage with list support, and ACL policies. Issued tokens
//! carry their role's policies and use count, and [`MemoryBackend::read_with_token`]
//! enforces both. Every call is recorded, including calls that fail, and
//! failures can be injected per path or policy name.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use cloudops_common_secret::SecretString;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{
	BackendError, BackendResult, LogicalBackend, Payload, PolicyBackend, SecretAuth, SecretResponse,
};
use crate::naming::{APPROLE_LOGIN_PATH, APPROLE_ROLE_PREFIX};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	Read(String),
	Write(String),
	Delete(String),
	List(String),
	PutPolicy(String),
	DeletePolicy(String),
}

#[derive(Debug)]
struct Role {
	params: Payload,
	role_id: String,
	secret_ids: HashSet<String>,
}

#[derive(Debug)]
struct IssuedToken {
	policies: Vec<String>,
	remaining_uses: u32,
}

#[derive(Debug, Default)]
struct State {
	roles: HashMap<String, Role>,
	entries: BTreeMap<String, Payload>,
	policies: HashMap<String, String>,
	tokens: HashMap<String, IssuedToken>,
	failures: HashMap<String, BackendError>,
	operations: Vec<Operation>,
}

/// Where an AppRole path points.
enum RolePath<'a> {
	Role(&'a str),
	RoleId(&'a str),
	SecretId(&'a str),
}

fn role_path(path: &str) -> Option<RolePath<'_>> {
	let rest = path.strip_prefix(APPROLE_ROLE_PREFIX)?.strip_prefix('/')?;
	match rest.split_once('/') {
		None if !rest.is_empty() => Some(RolePath::Role(rest)),
		Some((name, "role-id")) => Some(RolePath::RoleId(name)),
		Some((name, "secret-id")) => Some(RolePath::SecretId(name)),
		_ => None,
	}
}

fn bad_request(message: impl Into<String>) -> BackendError {
	BackendError::Api {
		status: 400,
		errors: vec![message.into()],
	}
}

fn permission_denied() -> BackendError {
	BackendError::Api {
		status: 403,
		errors: vec!["permission denied".to_string()],
	}
}

/// Path globs of every `path "<glob>" { ... }` stanza granting `read`.
fn readable_globs(rules: &str) -> Vec<&str> {
	let mut globs = Vec::new();
	let mut rest = rules;
	while let Some(start) = rest.find("path \"") {
		rest = &rest[start + "path \"".len()..];
		let Some(end) = rest.find('"') else {
			break;
		};
		let glob = &rest[..end];
		rest = &rest[end + 1..];
		let block = match (rest.find('{'), rest.find('}')) {
			(Some(open), Some(close)) if open < close => &rest[open..=close],
			_ => break,
		};
		if block.contains("\"read\"") {
			globs.push(glob);
		}
	}
	globs
}

/// A trailing `*` matches any suffix; otherwise the match is exact.
fn glob_matches(glob: &str, path: &str) -> bool {
	match glob.strip_suffix('*') {
		Some(prefix) => path.starts_with(prefix),
		None => glob == path,
	}
}

/// Parse a TTL given as seconds or as `<n>s`, `<n>m`, `<n>h`.
fn parse_ttl(value: Option<&Value>) -> u64 {
	let Some(value) = value else {
		return 0;
	};
	if let Some(secs) = value.as_u64() {
		return secs;
	}
	let Some(text) = value.as_str() else {
		return 0;
	};
	let (digits, unit) = match text.char_indices().last() {
		Some((i, c)) if c.is_ascii_alphabetic() => (&text[..i], c),
		_ => (text, 's'),
	};
	let n: u64 = digits.parse().unwrap_or(0);
	match unit {
		'm' => n * 60,
		'h' => n * 3600,
		_ => n,
	}
}

/// Policies may be written as a comma-separated string or a list.
fn string_list(value: Option<&Value>) -> Vec<String> {
	match value {
		Some(Value::String(s)) => s
			.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect(),
		Some(Value::Array(items)) => items
			.iter()
			.filter_map(Value::as_str)
			.map(str::to_string)
			.collect(),
		_ => Vec::new(),
	}
}

/// Backend held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	state: Mutex<State>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every call made so far, in order.
	pub async fn operations(&self) -> Vec<Operation> {
		self.state.lock().await.operations.clone()
	}

	pub async fn clear_operations(&self) {
		self.state.lock().await.operations.clear();
	}

	/// Make every call addressing `target` (a path or a policy name) fail
	/// with `error` until the backend is dropped.
	pub async fn fail_path(&self, target: &str, error: BackendError) {
		self
			.state
			.lock()
			.await
			.failures
			.insert(target.to_string(), error);
	}

	/// Store `data` at `path` without recording an operation.
	pub async fn seed(&self, path: &str, data: Payload) {
		self
			.state
			.lock()
			.await
			.entries
			.insert(path.to_string(), data);
	}

	/// The parameters currently stored at `path`.
	pub async fn stored(&self, path: &str) -> Option<Payload> {
		let state = self.state.lock().await;
		if let Some(RolePath::Role(name)) = role_path(path) {
			return state.roles.get(name).map(|role| role.params.clone());
		}
		state.entries.get(path).cloned()
	}

	/// Rules of the policy `name`.
	pub async fn policy(&self, name: &str) -> Option<String> {
		self.state.lock().await.policies.get(name).cloned()
	}

	/// Policies attached to an issued token.
	pub async fn token_policies(&self, token: &str) -> Option<Vec<String>> {
		self
			.state
			.lock()
			.await
			.tokens
			.get(token)
			.map(|t| t.policies.clone())
	}

	/// Read `path` as the holder of `token`.
	///
	/// Each call spends one use, whether or not the read is allowed, and the
	/// token is revoked after its last use. A `num_uses` of 0 never runs out.
	/// Reads outside the token's policies fail with 403. Reads under
	/// `<mount>/sts/<role>` return generated credentials when
	/// `<mount>/roles/<role>` exists.
	pub async fn read_with_token(
		&self,
		token: &str,
		path: &str,
	) -> BackendResult<Option<SecretResponse>> {
		let mut state = self.state.lock().await;
		state.record(Operation::Read(path.to_string()), path)?;
		state.use_token(token, path)?;
		state.read_authorized(path)
	}

	/// Uses left on an issued token; `None` once revoked.
	pub async fn token_remaining_uses(&self, token: &str) -> Option<u32> {
		self
			.state
			.lock()
			.await
			.tokens
			.get(token)
			.map(|t| t.remaining_uses)
	}
}

impl State {
	fn record(&mut self, op: Operation, target: &str) -> BackendResult<()> {
		self.operations.push(op);
		match self.failures.get(target) {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}

	fn write_role(&mut self, name: &str, data: Payload) {
		match self.roles.get_mut(name) {
			Some(role) => role.params.extend(data),
			None => {
				self.roles.insert(
					name.to_string(),
					Role {
						params: data,
						role_id: Uuid::new_v4().to_string(),
						secret_ids: HashSet::new(),
					},
				);
			}
		}
	}

	fn mint_secret_id(&mut self, name: &str) -> BackendResult<SecretResponse> {
		let role = self
			.roles
			.get_mut(name)
			.ok_or_else(|| bad_request(format!("role \"{name}\" does not exist")))?;
		let secret_id = Uuid::new_v4().to_string();
		role.secret_ids.insert(secret_id.clone());

		let mut data = Payload::new();
		data.insert("secret_id".to_string(), json!(secret_id));
		data.insert(
			"secret_id_accessor".to_string(),
			json!(Uuid::new_v4().to_string()),
		);
		Ok(SecretResponse::with_data(data))
	}

	fn login(&mut self, data: &Payload) -> BackendResult<SecretResponse> {
		let role_id = data.get("role_id").and_then(Value::as_str).unwrap_or("");
		let secret_id = data.get("secret_id").and_then(Value::as_str).unwrap_or("");

		let role = self
			.roles
			.values()
			.find(|role| role.role_id == role_id && role.secret_ids.contains(secret_id))
			.ok_or_else(|| bad_request("invalid role or secret ID"))?;

		let policies = string_list(role.params.get("token_policies"));
		let num_uses = role
			.params
			.get("token_num_uses")
			.and_then(Value::as_u64)
			.and_then(|n| u32::try_from(n).ok())
			.unwrap_or(0);
		let lease_duration = parse_ttl(role.params.get("token_max_ttl"));

		let client_token = format!("hvs.{}", Uuid::new_v4().simple());
		self.tokens.insert(
			client_token.clone(),
			IssuedToken {
				policies: policies.clone(),
				remaining_uses: num_uses,
			},
		);

		Ok(SecretResponse::with_auth(SecretAuth {
			client_token: SecretString::new(client_token),
			accessor: Some(Uuid::new_v4().to_string()),
			policies: Some(policies),
			lease_duration,
			renewable: true,
			num_uses,
		}))
	}

	fn use_token(&mut self, token: &str, path: &str) -> BackendResult<()> {
		let Some(issued) = self.tokens.get_mut(token) else {
			return Err(permission_denied());
		};
		let policies = issued.policies.clone();
		let remaining = issued.remaining_uses;
		if remaining > 1 {
			issued.remaining_uses = remaining - 1;
		} else if remaining == 1 {
			self.tokens.remove(token);
		}

		let allowed = policies
			.iter()
			.filter_map(|name| self.policies.get(name))
			.any(|rules| {
				readable_globs(rules)
					.into_iter()
					.any(|glob| glob_matches(glob, path))
			});
		if allowed {
			Ok(())
		} else {
			Err(permission_denied())
		}
	}

	fn read_authorized(&self, path: &str) -> BackendResult<Option<SecretResponse>> {
		let Some((mount, role)) = path.split_once("/sts/") else {
			return Ok(self.entries.get(path).cloned().map(SecretResponse::with_data));
		};
		if !self.entries.contains_key(&format!("{mount}/roles/{role}")) {
			return Err(bad_request(format!("Role \"{role}\" not found")));
		}

		let mut data = Payload::new();
		let key_id = Uuid::new_v4().simple().to_string().to_uppercase();
		data.insert("access_key".to_string(), json!(format!("ASIA{}", &key_id[..16])));
		data.insert(
			"secret_key".to_string(),
			json!(Uuid::new_v4().simple().to_string()),
		);
		data.insert(
			"security_token".to_string(),
			json!(Uuid::new_v4().to_string()),
		);
		Ok(Some(SecretResponse::with_data(data)))
	}

	fn list(&self, dir: &str) -> Option<SecretResponse> {
		let prefix = if dir.ends_with('/') {
			dir.to_string()
		} else {
			format!("{dir}/")
		};
		let mut keys: Vec<String> = Vec::new();
		for path in self.entries.keys() {
			let Some(rest) = path.strip_prefix(prefix.as_str()) else {
				continue;
			};
			let key = match rest.split_once('/') {
				Some((head, _)) => format!("{head}/"),
				None => rest.to_string(),
			};
			if !key.is_empty() && keys.last() != Some(&key) {
				keys.push(key);
			}
		}
		if keys.is_empty() {
			return None;
		}

		let mut data = Payload::new();
		data.insert("keys".to_string(), json!(keys));
		Some(SecretResponse::with_data(data))
	}
}

#[async_trait]
impl LogicalBackend for MemoryBackend {
	async fn read(&self, path: &str) -> BackendResult<Option<SecretResponse>> {
		let mut state = self.state.lock().await;
		state.record(Operation::Read(path.to_string()), path)?;

		let response = match role_path(path) {
			Some(RolePath::Role(name)) => state
				.roles
				.get(name)
				.map(|role| SecretResponse::with_data(role.params.clone())),
			Some(RolePath::RoleId(name)) => state.roles.get(name).map(|role| {
				let mut data = Payload::new();
				data.insert("role_id".to_string(), json!(role.role_id));
				SecretResponse::with_data(data)
			}),
			Some(RolePath::SecretId(_)) => None,
			None => state.entries.get(path).cloned().map(SecretResponse::with_data),
		};
		Ok(response)
	}

	async fn write(&self, path: &str, data: Payload) -> BackendResult<Option<SecretResponse>> {
		let mut state = self.state.lock().await;
		state.record(Operation::Write(path.to_string()), path)?;
		debug!(path, "memory backend write");

		if path == APPROLE_LOGIN_PATH {
			return state.login(&data).map(Some);
		}

		match role_path(path) {
			Some(RolePath::Role(name)) => {
				state.write_role(name, data);
				Ok(None)
			}
			Some(RolePath::SecretId(name)) => state.mint_secret_id(name).map(Some),
			Some(RolePath::RoleId(_)) => Err(bad_request("role-id is read-only")),
			None => {
				let mut data = data;
				if let Some(value) = data.get("role_arns") {
					let arns = string_list(Some(value));
					data.insert("role_arns".to_string(), json!(arns));
				}
				state.entries.insert(path.to_string(), data);
				Ok(None)
			}
		}
	}

	async fn delete(&self, path: &str) -> BackendResult<()> {
		let mut state = self.state.lock().await;
		state.record(Operation::Delete(path.to_string()), path)?;

		match role_path(path) {
			Some(RolePath::Role(name)) => {
				state.roles.remove(name);
			}
			Some(_) => {}
			None => {
				state.entries.remove(path);
			}
		}
		Ok(())
	}

	async fn list(&self, path: &str) -> BackendResult<Option<SecretResponse>> {
		let mut state = self.state.lock().await;
		state.record(Operation::List(path.to_string()), path)?;
		Ok(state.list(path))
	}
}

#[async_trait]
impl PolicyBackend for MemoryBackend {
	async fn put_policy(&self, name: &str, rules: &str) -> BackendResult<()> {
		let mut state = self.state.lock().await;
		state.record(Operation::PutPolicy(name.to_string()), name)?;
		state.policies.insert(name.to_string(), rules.to_string());
		Ok(())
	}

	async fn delete_policy(&self, name: &str) -> BackendResult<()> {
		let mut state = self.state.lock().await;
		state.record(Operation::DeletePolicy(name.to_string()), name)?;
		state.policies.remove(name);
		Ok(())
	}
}
