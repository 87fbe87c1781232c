// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner error types.

use std::time::Duration;

use kiln_k8s::{StoreError, WorkloadId};
use serde::Serialize;

use crate::types::Stage;

/// Category of a terminal provisioning failure, as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	/// Create request rejected
	SubmitError,
	/// Record never became readable within budget
	VisibilityTimeout,
	/// Reading the record failed with something other than not-found
	ObservationError,
	/// Workload reached an unrecoverable state
	WorkloadFailed { reason: String },
	/// Record visible but never ready within budget
	ReadinessTimeout,
	/// Caller cancelled the attempt
	Cancelled,
}

impl std::fmt::Display for FailureKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FailureKind::SubmitError => f.write_str("submit_error"),
			FailureKind::VisibilityTimeout => f.write_str("visibility_timeout"),
			FailureKind::ObservationError => f.write_str("observation_error"),
			FailureKind::WorkloadFailed { reason } => write!(f, "workload_failed({reason})"),
			FailureKind::ReadinessTimeout => f.write_str("readiness_timeout"),
			FailureKind::Cancelled => f.write_str("cancelled"),
		}
	}
}

/// Errors that end a provisioning attempt.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
	/// Create request failed
	#[error("Failed to submit workload {id}: {source}")]
	Submit {
		id: WorkloadId,
		#[source]
		source: StoreError,
	},

	/// Get request failed during a wait stage
	#[error("Failed to observe workload {id} during {stage}: {source}")]
	Observe {
		id: WorkloadId,
		stage: Stage,
		#[source]
		source: StoreError,
	},

	/// Record never became readable
	#[error("Workload {id} not visible after {elapsed:?}")]
	VisibilityTimeout { id: WorkloadId, elapsed: Duration },

	/// Record visible but never ready
	#[error("Workload {id} not ready after {elapsed:?}")]
	ReadinessTimeout { id: WorkloadId, elapsed: Duration },

	/// Workload reached a terminal failure state
	#[error("Workload {id} failed: {reason}: {message}")]
	WorkloadFailed {
		id: WorkloadId,
		reason: String,
		message: String,
	},

	/// Cancelled by the caller
	#[error("Provisioning of {id} cancelled externally during {stage}")]
	Cancelled { id: WorkloadId, stage: Stage },
}

impl ProvisionError {
	pub fn kind(&self) -> FailureKind {
		match self {
			ProvisionError::Submit { .. } => FailureKind::SubmitError,
			ProvisionError::Observe { .. } => FailureKind::ObservationError,
			ProvisionError::VisibilityTimeout { .. } => FailureKind::VisibilityTimeout,
			ProvisionError::ReadinessTimeout { .. } => FailureKind::ReadinessTimeout,
			ProvisionError::WorkloadFailed { reason, .. } => FailureKind::WorkloadFailed {
				reason: reason.clone(),
			},
			ProvisionError::Cancelled { .. } => FailureKind::Cancelled,
		}
	}

	pub fn stage(&self) -> Stage {
		match self {
			ProvisionError::Submit { .. } => Stage::Submit,
			ProvisionError::Observe { stage, .. } | ProvisionError::Cancelled { stage, .. } => *stage,
			ProvisionError::VisibilityTimeout { .. } => Stage::AwaitVisible,
			ProvisionError::ReadinessTimeout { .. } | ProvisionError::WorkloadFailed { .. } => {
				Stage::AwaitReady
			}
		}
	}

	pub fn id(&self) -> &WorkloadId {
		match self {
			ProvisionError::Submit { id, .. }
			| ProvisionError::Observe { id, .. }
			| ProvisionError::VisibilityTimeout { id, .. }
			| ProvisionError::ReadinessTimeout { id, .. }
			| ProvisionError::WorkloadFailed { id, .. }
			| ProvisionError::Cancelled { id, .. } => id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id() -> WorkloadId {
		WorkloadId::new("default", "web")
	}

	#[test]
	fn submit_error_wraps_identifier() {
		let err = ProvisionError::Submit {
			id: id(),
			source: StoreError::Api {
				message: "forbidden".into(),
			},
		};
		assert_eq!(err.kind(), FailureKind::SubmitError);
		assert_eq!(err.stage(), Stage::Submit);
		assert_eq!(
			err.to_string(),
			"Failed to submit workload default/web: K8s API error: forbidden"
		);
	}

	#[test]
	fn observe_error_names_stage() {
		let err = ProvisionError::Observe {
			id: id(),
			stage: Stage::AwaitReady,
			source: StoreError::Api {
				message: "etcd timeout".into(),
			},
		};
		assert_eq!(err.kind(), FailureKind::ObservationError);
		assert_eq!(err.stage(), Stage::AwaitReady);
		assert!(err.to_string().contains("during await-ready"));
	}

	#[test]
	fn workload_failed_carries_reason() {
		let err = ProvisionError::WorkloadFailed {
			id: id(),
			reason: "Unschedulable".into(),
			message: "0/3 nodes are available".into(),
		};
		assert_eq!(
			err.kind(),
			FailureKind::WorkloadFailed {
				reason: "Unschedulable".into()
			}
		);
		assert_eq!(err.stage(), Stage::AwaitReady);
	}

	#[test]
	fn cancelled_is_distinct_from_timeouts() {
		let cancelled = ProvisionError::Cancelled {
			id: id(),
			stage: Stage::AwaitVisible,
		};
		let timed_out = ProvisionError::VisibilityTimeout {
			id: id(),
			elapsed: Duration::from_secs(10),
		};
		assert_eq!(cancelled.stage(), timed_out.stage());
		assert_ne!(cancelled.kind(), timed_out.kind());
		assert!(cancelled.to_string().contains("cancelled externally"));
	}

	#[test]
	fn failure_kind_display() {
		assert_eq!(FailureKind::ReadinessTimeout.to_string(), "readiness_timeout");
		assert_eq!(
			FailureKind::WorkloadFailed {
				reason: "OOMKilled".into()
			}
			.to_string(),
			"workload_failed(OOMKilled)"
		);
	}
}
