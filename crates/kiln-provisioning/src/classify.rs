// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interpretation of observed workload records.

use kiln_k8s::{ConditionStatus, ConditionType, ContainerState, Phase, WorkloadRecord};
use serde::Serialize;

/// What an observed record says about provisioning progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
	/// Keep polling.
	Pending,
	/// Running with a true Ready condition.
	Ready,
	/// Unrecoverable. Retrying the same spec would reproduce it.
	Failed { reason: String, message: String },
}

impl Verdict {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, Verdict::Pending)
	}
}

/// Classify a record. Pure and total over every record shape.
///
/// Failure signals win over readiness when a record carries both. They are
/// checked in this order:
///
/// 1. A `Scheduled` condition with status `False`
/// 2. A container terminated with a nonzero exit code
/// 3. Phase `Failed`
///
/// Phase `Succeeded` is `Pending`: a workload that ran to completion with a
/// zero exit code can never report ready, so the attempt waits out its
/// readiness budget. Use [`ran_to_completion`] to detect this early.
pub fn classify(record: &WorkloadRecord) -> Verdict {
	if let Some(verdict) = unschedulable(record)
		.or_else(|| crashed_container(record))
		.or_else(|| failed_phase(record))
	{
		return verdict;
	}

	let ready = record.conditions.iter().any(|c| {
		c.kind == ConditionType::Ready && c.status == ConditionStatus::True
	});
	if record.phase == Phase::Running && ready {
		Verdict::Ready
	} else {
		Verdict::Pending
	}
}

/// True when every container exited and the workload finished cleanly.
/// Such a record stays `Pending` under [`classify`].
pub fn ran_to_completion(record: &WorkloadRecord) -> bool {
	record.phase == Phase::Succeeded
}

fn unschedulable(record: &WorkloadRecord) -> Option<Verdict> {
	let condition = record.conditions.iter().find(|c| {
		c.kind == ConditionType::Scheduled && c.status == ConditionStatus::False
	})?;

	Some(Verdict::Failed {
		reason: non_empty(condition.reason.as_deref()).unwrap_or("Unschedulable").to_string(),
		message: non_empty(condition.message.as_deref())
			.unwrap_or("workload could not be scheduled")
			.to_string(),
	})
}

fn crashed_container(record: &WorkloadRecord) -> Option<Verdict> {
	record.container_statuses.iter().find_map(|status| match &status.state {
		ContainerState::Terminated {
			reason,
			message,
			exit_code,
		} if *exit_code != 0 => {
			let mut detail = format!(
				"container {} terminated with exit code {exit_code}",
				status.name
			);
			if let Some(message) = non_empty(message.as_deref()) {
				detail.push_str(": ");
				detail.push_str(message);
			}
			Some(Verdict::Failed {
				reason: non_empty(reason.as_deref()).unwrap_or("Error").to_string(),
				message: detail,
			})
		}
		_ => None,
	})
}

fn failed_phase(record: &WorkloadRecord) -> Option<Verdict> {
	if record.phase != Phase::Failed {
		return None;
	}
	Some(Verdict::Failed {
		reason: non_empty(record.reason.as_deref()).unwrap_or("Failed").to_string(),
		message: non_empty(record.message.as_deref())
			.unwrap_or("workload phase is Failed")
			.to_string(),
	})
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_k8s::{Condition, ContainerStatus, WorkloadId};

	fn record(phase: Phase) -> WorkloadRecord {
		WorkloadRecord::new(WorkloadId::new("default", "web"), phase)
	}

	#[test]
	fn succeeded_is_pending_but_flagged_as_completed() {
		let done = record(Phase::Succeeded)
			.with_container(terminated("workload", 0, Some("Completed")));
		assert_eq!(classify(&done), Verdict::Pending);
		assert!(ran_to_completion(&done));
		assert!(!ran_to_completion(&record(Phase::Running)));
	}

	fn ready_condition() -> Condition {
		Condition::new(ConditionType::Ready, ConditionStatus::True)
	}

	fn terminated(name: &str, exit_code: i32, reason: Option<&str>) -> ContainerStatus {
		ContainerStatus {
			name: name.to_string(),
			ready: false,
			state: ContainerState::Terminated {
				reason: reason.map(str::to_string),
				message: None,
				exit_code,
			},
		}
	}

	#[test]
	fn empty_record_is_pending() {
		assert_eq!(classify(&record(Phase::Unknown)), Verdict::Pending);
		assert_eq!(classify(&record(Phase::Pending)), Verdict::Pending);
	}

	#[test]
	fn running_with_ready_true_is_ready() {
		let r = record(Phase::Running).with_condition(ready_condition());
		assert_eq!(classify(&r), Verdict::Ready);
	}

	#[test]
	fn running_without_ready_is_pending() {
		let r = record(Phase::Running).with_condition(Condition::new(
			ConditionType::Ready,
			ConditionStatus::False,
		));
		assert_eq!(classify(&r), Verdict::Pending);
	}

	#[test]
	fn ready_condition_requires_running_phase() {
		let r = record(Phase::Pending).with_condition(ready_condition());
		assert_eq!(classify(&r), Verdict::Pending);
	}

	#[test]
	fn unschedulable_uses_condition_reason() {
		let r = record(Phase::Pending).with_condition(
			Condition::new(ConditionType::Scheduled, ConditionStatus::False)
				.with_reason("Unschedulable", "0/3 nodes are available: insufficient cpu"),
		);
		assert_eq!(
			classify(&r),
			Verdict::Failed {
				reason: "Unschedulable".into(),
				message: "0/3 nodes are available: insufficient cpu".into(),
			}
		);
	}

	#[test]
	fn unschedulable_without_reason_gets_default() {
		let r = record(Phase::Pending)
			.with_condition(Condition::new(ConditionType::Scheduled, ConditionStatus::False));
		match classify(&r) {
			Verdict::Failed { reason, .. } => assert_eq!(reason, "Unschedulable"),
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[test]
	fn nonzero_exit_is_failed() {
		let r = record(Phase::Running).with_container(terminated("workload", 137, Some("OOMKilled")));
		match classify(&r) {
			Verdict::Failed { reason, message } => {
				assert_eq!(reason, "OOMKilled");
				assert_eq!(message, "container workload terminated with exit code 137");
			}
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[test]
	fn nonzero_exit_without_reason_defaults_to_error() {
		let r = record(Phase::Running).with_container(terminated("workload", 1, None));
		match classify(&r) {
			Verdict::Failed { reason, .. } => assert_eq!(reason, "Error"),
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[test]
	fn zero_exit_is_not_failure() {
		let r = record(Phase::Succeeded).with_container(terminated("workload", 0, Some("Completed")));
		assert_eq!(classify(&r), Verdict::Pending);
	}

	#[test]
	fn failed_phase_uses_record_reason() {
		let mut r = record(Phase::Failed);
		r.reason = Some("Evicted".into());
		r.message = Some("node was low on memory".into());
		assert_eq!(
			classify(&r),
			Verdict::Failed {
				reason: "Evicted".into(),
				message: "node was low on memory".into(),
			}
		);
	}

	#[test]
	fn failed_phase_without_reason_gets_default() {
		match classify(&record(Phase::Failed)) {
			Verdict::Failed { reason, message } => {
				assert_eq!(reason, "Failed");
				assert_eq!(message, "workload phase is Failed");
			}
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[test]
	fn failure_wins_over_readiness() {
		let r = record(Phase::Running)
			.with_condition(ready_condition())
			.with_container(terminated("sidecar", 2, None));
		assert!(matches!(classify(&r), Verdict::Failed { .. }));
	}

	#[test]
	fn scheduling_failure_checked_before_container_crash() {
		let r = record(Phase::Failed)
			.with_condition(
				Condition::new(ConditionType::Scheduled, ConditionStatus::False)
					.with_reason("Unschedulable", "no nodes"),
			)
			.with_container(terminated("workload", 1, Some("Error")));
		match classify(&r) {
			Verdict::Failed { reason, .. } => assert_eq!(reason, "Unschedulable"),
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[test]
	fn verdict_terminality() {
		assert!(!Verdict::Pending.is_terminal());
		assert!(Verdict::Ready.is_terminal());
		assert!(Verdict::Failed {
			reason: "x".into(),
			message: "y".into()
		}
		.is_terminal());
	}
}
