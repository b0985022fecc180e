// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent header.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Returns the User-Agent sent on every backend request.
///
/// Format: `cloudops/{version}`
pub fn user_agent() -> String {
	format!("cloudops/{}", env!("CARGO_PKG_VERSION"))
}

/// Creates an HTTP client builder with the standard User-Agent header.
///
/// Redirects are not followed: a redirect from the backend would resend the
/// token to wherever it points.
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.redirect(reqwest::redirect::Policy::none())
}

/// Creates a builder with the standard User-Agent and a request timeout.
pub fn builder_with_timeout(timeout: Duration) -> ClientBuilder {
	builder().timeout(timeout)
}
