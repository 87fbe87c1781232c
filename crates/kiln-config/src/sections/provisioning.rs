// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning configuration section.

use std::time::Duration;

use kiln_provisioning::{PollSettings, ProvisionConfig, Timeouts};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Provisioning configuration layer (for merging).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisioningConfigLayer {
	/// Interval between polls in both wait stages
	pub interval_ms: Option<u64>,
	/// Budget for a submitted workload to become readable
	pub visibility_timeout_ms: Option<u64>,
	/// Budget for a visible workload to become ready
	pub readiness_timeout_ms: Option<u64>,
	/// Use store watches to wake polls early
	pub use_watch: Option<bool>,
}

impl ProvisioningConfigLayer {
	/// Values from `other` take precedence when present.
	pub fn merge(&mut self, other: ProvisioningConfigLayer) {
		if other.interval_ms.is_some() {
			self.interval_ms = other.interval_ms;
		}
		if other.visibility_timeout_ms.is_some() {
			self.visibility_timeout_ms = other.visibility_timeout_ms;
		}
		if other.readiness_timeout_ms.is_some() {
			self.readiness_timeout_ms = other.readiness_timeout_ms;
		}
		if other.use_watch.is_some() {
			self.use_watch = other.use_watch;
		}
	}

	pub fn resolve(self) -> Result<ProvisioningConfig, ConfigError> {
		let defaults = ProvisioningConfig::default();
		let millis = |value: Option<u64>, default: Duration| {
			value.map(Duration::from_millis).unwrap_or(default)
		};
		let config = ProvisioningConfig {
			interval: millis(self.interval_ms, defaults.interval),
			visibility_timeout: millis(self.visibility_timeout_ms, defaults.visibility_timeout),
			readiness_timeout: millis(self.readiness_timeout_ms, defaults.readiness_timeout),
			use_watch: self.use_watch.unwrap_or(defaults.use_watch),
		};

		if config.interval.is_zero() {
			return Err(ConfigError::Validation(
				"provisioning.interval_ms must be greater than zero".to_string(),
			));
		}
		if config.visibility_timeout.is_zero() || config.readiness_timeout.is_zero() {
			return Err(ConfigError::Validation(
				"provisioning timeouts must be greater than zero".to_string(),
			));
		}

		Ok(config)
	}
}

/// Provisioning configuration (runtime, fully resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningConfig {
	pub interval: Duration,
	pub visibility_timeout: Duration,
	pub readiness_timeout: Duration,
	pub use_watch: bool,
}

impl ProvisioningConfig {
	pub fn timeouts(&self) -> Timeouts {
		Timeouts {
			visibility: PollSettings::new(self.interval, self.visibility_timeout),
			readiness: PollSettings::new(self.interval, self.readiness_timeout),
		}
	}

	pub fn to_provision_config(&self) -> ProvisionConfig {
		ProvisionConfig {
			timeouts: self.timeouts(),
			use_watch: self.use_watch,
		}
	}
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		let provision = ProvisionConfig::default();
		Self {
			interval: provision.timeouts.readiness.interval,
			visibility_timeout: provision.timeouts.visibility.timeout,
			readiness_timeout: provision.timeouts.readiness.timeout,
			use_watch: provision.use_watch,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults_match_provisioner_defaults() {
		let config = ProvisioningConfigLayer::default().resolve().unwrap();
		assert_eq!(config, ProvisioningConfig::default());
		assert_eq!(config.to_provision_config(), ProvisionConfig::default());
	}

	#[test]
	fn test_defaults_follow_provisioning_constants() {
		let config = ProvisioningConfig::default();
		assert_eq!(config.interval, kiln_provisioning::DEFAULT_POLL_INTERVAL);
		assert_eq!(
			config.visibility_timeout,
			kiln_provisioning::config::DEFAULT_VISIBILITY_TIMEOUT
		);
		assert_eq!(
			config.readiness_timeout,
			kiln_provisioning::config::DEFAULT_READINESS_TIMEOUT
		);
		assert_eq!(config.timeouts(), Timeouts::default());
	}

	#[test]
	fn test_merge_overrides_present_fields_only() {
		let mut base = ProvisioningConfigLayer {
			interval_ms: Some(250),
			readiness_timeout_ms: Some(60_000),
			..Default::default()
		};
		base.merge(ProvisioningConfigLayer {
			readiness_timeout_ms: Some(5_000),
			use_watch: Some(true),
			..Default::default()
		});

		assert_eq!(base.interval_ms, Some(250));
		assert_eq!(base.readiness_timeout_ms, Some(5_000));
		assert_eq!(base.use_watch, Some(true));
		assert_eq!(base.visibility_timeout_ms, None);
	}

	#[test]
	fn test_zero_interval_rejected() {
		let layer = ProvisioningConfigLayer {
			interval_ms: Some(0),
			..Default::default()
		};
		let err = layer.resolve().unwrap_err();
		assert!(err.to_string().contains("interval_ms"));
	}

	#[test]
	fn test_zero_timeout_rejected() {
		let layer = ProvisioningConfigLayer {
			visibility_timeout_ms: Some(0),
			..Default::default()
		};
		assert!(layer.resolve().is_err());
	}

	#[test]
	fn test_timeouts_share_interval() {
		let config = ProvisioningConfigLayer {
			interval_ms: Some(50),
			visibility_timeout_ms: Some(2_000),
			readiness_timeout_ms: Some(9_000),
			use_watch: Some(true),
		}
		.resolve()
		.unwrap();

		let provision = config.to_provision_config();
		assert!(provision.use_watch);
		assert_eq!(provision.timeouts.visibility.interval, Duration::from_millis(50));
		assert_eq!(provision.timeouts.readiness.interval, Duration::from_millis(50));
		assert_eq!(provision.timeouts.visibility.timeout, Duration::from_secs(2));
		assert_eq!(provision.timeouts.readiness.timeout, Duration::from_secs(9));
	}

	proptest! {
		#[test]
		fn merge_with_empty_is_identity(
			interval in proptest::option::of(1u64..10_000),
			visibility in proptest::option::of(1u64..100_000),
			readiness in proptest::option::of(1u64..100_000),
			use_watch in proptest::option::of(any::<bool>()),
		) {
			let original = ProvisioningConfigLayer {
				interval_ms: interval,
				visibility_timeout_ms: visibility,
				readiness_timeout_ms: readiness,
				use_watch,
			};
			let mut merged = original.clone();
			merged.merge(ProvisioningConfigLayer::default());
			prop_assert_eq!(merged, original);
		}

		#[test]
		fn merge_later_layer_wins(a in 1u64..10_000, b in 1u64..10_000) {
			let mut base = ProvisioningConfigLayer {
				interval_ms: Some(a),
				..Default::default()
			};
			base.merge(ProvisioningConfigLayer {
				interval_ms: Some(b),
				..Default::default()
			});
			prop_assert_eq!(base.resolve().unwrap().interval, Duration::from_millis(b));
		}
	}
}
