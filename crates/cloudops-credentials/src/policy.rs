// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access policy text attached to every project's tokens.

use crate::naming::Namespace;

/// Policy granting `read` on the project's own STS target paths and nothing
/// else.
///
/// Pure: the same namespace and project always yield the same text, so
/// re-creating a project rewrites an identical policy.
pub fn synthesize_readonly_policy(namespace: &Namespace, project: &str) -> String {
	format!(
		"path \"{}\" {{ capabilities = [\"read\"] }}",
		namespace.sts_pattern(project)
	)
}
