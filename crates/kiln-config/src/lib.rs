// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for kiln.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment, CLI)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`KILN_*`)
//!
//! # Usage
//!
//! ```ignore
//! use kiln_config::load_config;
//!
//! let config = load_config()?;
//! let provisioner = Provisioner::new(store, config.provisioning.to_provision_config());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::KilnConfigLayer;
pub use sections::*;
pub use sources::{CliSource, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved kiln configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KilnConfig {
	pub provisioning: ProvisioningConfig,
	pub kube: KubeConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KILN_*`)
/// 2. Config file (`/etc/kiln/kiln.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<KilnConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	];
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<KilnConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	];
	load_from_sources(sources)
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<KilnConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = KilnConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: KilnConfigLayer) -> Result<KilnConfig, ConfigError> {
	let provisioning = layer.provisioning.unwrap_or_default().resolve()?;
	let kube = layer.kube.unwrap_or_default().resolve()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		namespace = %kube.namespace,
		interval_ms = provisioning.interval.as_millis() as u64,
		visibility_timeout_ms = provisioning.visibility_timeout.as_millis() as u64,
		readiness_timeout_ms = provisioning.readiness_timeout.as_millis() as u64,
		use_watch = provisioning.use_watch,
		"Kiln configuration loaded"
	);

	Ok(KilnConfig {
		provisioning,
		kube,
		logging,
	})
}
