// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! cloudops - project and target credential administration over Vault.
//!
//! Every invocation acts on behalf of one caller, identified by an
//! authorization header of the form `vault:<key>:<secret>`. Admin callers
//! manage projects and targets; tenants exchange their project's
//! `role_id`/`secret_id` for a short-lived token. Results are printed to
//! stdout as JSON, logs go to stderr.

mod commands;
mod wiring;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cloudops_config::{load_config, load_config_with_file, LogFormat, LoggingConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "cloudops", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Caller authorization, `vault:<key>:<secret>`
	#[arg(long, env = "CLOUDOPS_AUTHORIZATION", hide_env_values = true)]
	authorization: String,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	#[command(subcommand)]
	command: Command,
}

fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) {
	let level = level_override.unwrap_or(&logging.level);
	let directives = ["cloudops", "cloudops_config", "cloudops_credentials", "cloudops_vault"]
		.iter()
		.map(|target| format!("{target}={level}"))
		.collect::<Vec<_>>()
		.join(",");
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging, args.log_level.as_deref());
	info!(vault = %config.vault.address, "starting cloudops");

	let factory = wiring::build_factory(&config)?;
	let provider = factory
		.provider_for_header(&args.authorization)
		.context("invalid authorization")?;

	let output = commands::execute(&provider, args.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}
