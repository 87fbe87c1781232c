// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner configuration.

use std::time::Duration;

use crate::poll::{PollSettings, DEFAULT_POLL_INTERVAL};

/// Default budget for a submitted record to become readable.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for a visible workload to report ready.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-stage polling budgets for one provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
	pub visibility: PollSettings,
	pub readiness: PollSettings,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			visibility: PollSettings::new(DEFAULT_POLL_INTERVAL, DEFAULT_VISIBILITY_TIMEOUT),
			readiness: PollSettings::new(DEFAULT_POLL_INTERVAL, DEFAULT_READINESS_TIMEOUT),
		}
	}
}

/// Configuration for the [`Provisioner`](crate::Provisioner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
	/// Budgets used by `provision_with_defaults`.
	pub timeouts: Timeouts,
	/// Open a store watch during each wait stage and use its events to
	/// trigger early polls.
	pub use_watch: bool,
}

impl Default for ProvisionConfig {
	fn default() -> Self {
		Self {
			timeouts: Timeouts::default(),
			use_watch: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_control_plane_latency() {
		let timeouts = Timeouts::default();
		assert_eq!(timeouts.visibility.interval, Duration::from_millis(100));
		assert_eq!(timeouts.visibility.timeout, Duration::from_secs(10));
		assert_eq!(timeouts.readiness.interval, Duration::from_millis(100));
		assert_eq!(timeouts.readiness.timeout, Duration::from_secs(30));
	}

	#[test]
	fn watch_is_opt_in() {
		assert!(!ProvisionConfig::default().use_watch);
	}
}
