// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning stages and outcomes.

use std::fmt;
use std::time::Duration;

use kiln_k8s::WorkloadId;
use serde::{Serialize, Serializer};

use crate::error::FailureKind;

/// Stage of a provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
	/// Create request sent to the control plane
	Submit,
	/// Waiting for the record to become readable
	AwaitVisible,
	/// Waiting for the workload to report ready
	AwaitReady,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Stage::Submit => "submit",
			Stage::AwaitVisible => "await-visible",
			Stage::AwaitReady => "await-ready",
		};
		f.write_str(s)
	}
}

/// Terminal failure of a provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionFailure {
	pub id: WorkloadId,
	pub stage: Stage,
	pub kind: FailureKind,
	pub message: String,
	#[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
	pub elapsed: Duration,
}

/// Result of one provisioning attempt. Produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProvisioningOutcome {
	Success {
		id: WorkloadId,
		#[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
		elapsed: Duration,
	},
	Failure(ProvisionFailure),
}

impl ProvisioningOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, ProvisioningOutcome::Success { .. })
	}

	pub fn id(&self) -> &WorkloadId {
		match self {
			ProvisioningOutcome::Success { id, .. } => id,
			ProvisioningOutcome::Failure(failure) => &failure.id,
		}
	}

	/// Total wall-clock time from submission to the terminal outcome.
	pub fn elapsed(&self) -> Duration {
		match self {
			ProvisioningOutcome::Success { elapsed, .. } => *elapsed,
			ProvisioningOutcome::Failure(failure) => failure.elapsed,
		}
	}

	pub fn failure(&self) -> Option<&ProvisionFailure> {
		match self {
			ProvisioningOutcome::Success { .. } => None,
			ProvisioningOutcome::Failure(failure) => Some(failure),
		}
	}

	pub fn kind(&self) -> Option<&FailureKind> {
		self.failure().map(|f| &f.kind)
	}
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_u64(duration.as_millis() as u64)
}
