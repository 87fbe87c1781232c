// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl FromStr for LogLevel {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"error" => Ok(LogLevel::Error),
			"warn" | "warning" => Ok(LogLevel::Warn),
			"info" => Ok(LogLevel::Info),
			"debug" => Ok(LogLevel::Debug),
			"trace" => Ok(LogLevel::Trace),
			other => Err(format!("unknown log level '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl FromStr for LogFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"pretty" => Ok(LogFormat::Pretty),
			"json" => Ok(LogFormat::Json),
			"compact" => Ok(LogFormat::Compact),
			other => Err(format!("unknown log format '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfigLayer {
	pub level: Option<LogLevel>,
	pub format: Option<LogFormat>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_default(),
			format: self.format.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = LoggingConfigLayer::default().finalize();
		assert_eq!(config.level, LogLevel::Info);
		assert_eq!(config.format, LogFormat::Pretty);
	}

	#[test]
	fn test_parse_level() {
		assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
		assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
		assert!("verbose".parse::<LogLevel>().is_err());
	}

	#[test]
	fn test_parse_format() {
		assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
		assert!("xml".parse::<LogFormat>().is_err());
	}

	#[test]
	fn test_merge() {
		let mut base = LoggingConfigLayer {
			level: Some(LogLevel::Warn),
			format: Some(LogFormat::Compact),
		};
		base.merge(LoggingConfigLayer {
			level: Some(LogLevel::Trace),
			format: None,
		});
		let config = base.finalize();
		assert_eq!(config.level, LogLevel::Trace);
		assert_eq!(config.format, LogFormat::Compact);
	}

	#[test]
	fn test_toml_lowercase_names() {
		let layer: LoggingConfigLayer = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
		assert_eq!(layer.level, Some(LogLevel::Debug));
		assert_eq!(layer.format, Some(LogFormat::Json));
	}
}
