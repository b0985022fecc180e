// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod approle;
pub mod auth;
pub mod logging;
pub mod naming;
pub mod vault;

pub use approle::{AppRoleConfig, AppRoleConfigLayer};
pub use auth::{AuthConfig, AuthConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use naming::{NamingConfig, NamingConfigLayer};
pub use vault::{VaultConfig, VaultConfigLayer};
