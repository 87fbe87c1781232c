// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::KilnConfigLayer;
use crate::sections::{
	KubeConfigLayer, LogFormat, LogLevel, LoggingConfigLayer, ProvisioningConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 90,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<KilnConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(KilnConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/kiln/kiln.toml")
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(KilnConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: KilnConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: KILN_<SECTION>_<FIELD>
pub struct EnvSource {
	lookup: Lookup,
}

impl EnvSource {
	/// Read from the process environment.
	pub fn new() -> Self {
		Self {
			lookup: Box::new(|name| std::env::var(name).ok()),
		}
	}

	/// Read from a fixed set of variables instead of the process environment.
	pub fn from_map(vars: BTreeMap<String, String>) -> Self {
		Self {
			lookup: Box::new(move |name| vars.get(name).cloned()),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		self.parsed(name, "u64")
	}

	fn parsed<T: FromStr>(&self, name: &str, what: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {what} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		self.var(name).map(|s| {
			s.split(',')
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty())
				.collect()
		})
	}

	fn load_provisioning(&self) -> Result<ProvisioningConfigLayer, ConfigError> {
		Ok(ProvisioningConfigLayer {
			interval_ms: self.u64("KILN_PROVISIONING_INTERVAL_MS")?,
			visibility_timeout_ms: self.u64("KILN_PROVISIONING_VISIBILITY_TIMEOUT_MS")?,
			readiness_timeout_ms: self.u64("KILN_PROVISIONING_READINESS_TIMEOUT_MS")?,
			use_watch: self.bool("KILN_PROVISIONING_USE_WATCH"),
		})
	}

	fn load_kube(&self) -> Result<KubeConfigLayer, ConfigError> {
		Ok(KubeConfigLayer {
			namespace: self.var("KILN_KUBE_NAMESPACE"),
			kubeconfig: self.var("KILN_KUBE_KUBECONFIG").map(PathBuf::from),
			name_prefix: self.var("KILN_KUBE_NAME_PREFIX"),
			known_kinds: self.list("KILN_KUBE_KNOWN_KINDS"),
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.parsed::<LogLevel>("KILN_LOG_LEVEL", "log level")?,
			format: self.parsed::<LogFormat>("KILN_LOG_FORMAT", "log format")?,
		})
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(KilnConfigLayer {
			provisioning: Some(self.load_provisioning()?),
			kube: Some(self.load_kube()?),
			logging: Some(self.load_logging()?),
		})
	}
}

/// Overrides supplied on the command line.
pub struct CliSource {
	layer: KilnConfigLayer,
}

impl CliSource {
	pub fn new(layer: KilnConfigLayer) -> Self {
		Self { layer }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"command-line"
	}

	fn precedence(&self) -> Precedence {
		Precedence::CommandLine
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		Ok(self.layer.clone())
	}
}
