// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Observability hooks for provisioning progress.
//!
//! The provisioner reports every poll observation through a
//! [`ProvisionObserver`]. The default [`TracingObserver`] emits structured
//! events so status can be followed tick by tick without the state machine
//! knowing how it is rendered.

use std::time::Duration;

use kiln_k8s::{ContainerState, WorkloadId, WorkloadRecord};
use tracing::{debug, info, warn};

use crate::classify::ran_to_completion;
use crate::poll::PollTick;
use crate::types::{ProvisioningOutcome, Stage};

/// Receives provisioning progress. All methods default to no-ops.
pub trait ProvisionObserver: Send + Sync {
	/// The create request was accepted.
	fn on_submitted(&self, _id: &WorkloadId, _elapsed: Duration) {}

	/// A visibility poll found no record yet.
	fn on_not_visible(&self, _id: &WorkloadId, _tick: &PollTick) {}

	/// A poll read a record.
	fn on_observed(&self, _stage: Stage, _record: &WorkloadRecord, _tick: &PollTick) {}

	/// The attempt reached its terminal outcome.
	fn on_outcome(&self, _outcome: &ProvisioningOutcome) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProvisionObserver for NoopObserver {}

/// Observer that logs each observation with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProvisionObserver for TracingObserver {
	fn on_submitted(&self, id: &WorkloadId, elapsed: Duration) {
		info!(workload = %id, elapsed_ms = elapsed.as_millis() as u64, "Workload submitted");
	}

	fn on_not_visible(&self, id: &WorkloadId, tick: &PollTick) {
		debug!(
			workload = %id,
			attempt = tick.attempt,
			elapsed_ms = tick.elapsed.as_millis() as u64,
			"Workload not visible yet"
		);
	}

	fn on_observed(&self, stage: Stage, record: &WorkloadRecord, tick: &PollTick) {
		info!(
			workload = %record.id,
			%stage,
			attempt = tick.attempt,
			elapsed_ms = tick.elapsed.as_millis() as u64,
			phase = %record.phase,
			reason = record.reason.as_deref().unwrap_or(""),
			message = record.message.as_deref().unwrap_or(""),
			"Workload status"
		);

		if stage == Stage::AwaitReady && ran_to_completion(record) {
			warn!(
				workload = %record.id,
				"Workload ran to completion and will never report ready; waiting out the readiness budget"
			);
		}

		for condition in &record.conditions {
			debug!(
				workload = %record.id,
				condition = %condition.kind,
				status = %condition.status,
				reason = condition.reason.as_deref().unwrap_or(""),
				message = condition.message.as_deref().unwrap_or(""),
				"Workload condition"
			);
		}

		for container in &record.container_statuses {
			match &container.state {
				ContainerState::Waiting { reason, message } => debug!(
					workload = %record.id,
					container = %container.name,
					ready = container.ready,
					reason = reason.as_deref().unwrap_or(""),
					message = message.as_deref().unwrap_or(""),
					"Container waiting"
				),
				ContainerState::Running { started_at } => debug!(
					workload = %record.id,
					container = %container.name,
					ready = container.ready,
					started_at = ?started_at,
					"Container running"
				),
				ContainerState::Terminated {
					reason,
					message,
					exit_code,
				} => debug!(
					workload = %record.id,
					container = %container.name,
					ready = container.ready,
					exit_code,
					reason = reason.as_deref().unwrap_or(""),
					message = message.as_deref().unwrap_or(""),
					"Container terminated"
				),
			}
		}
	}

	fn on_outcome(&self, outcome: &ProvisioningOutcome) {
		let elapsed_ms = outcome.elapsed().as_millis() as u64;
		match outcome {
			ProvisioningOutcome::Success { id, .. } => {
				info!(workload = %id, elapsed_ms, "Workload ready");
			}
			ProvisioningOutcome::Failure(failure) => {
				warn!(
					workload = %failure.id,
					stage = %failure.stage,
					kind = %failure.kind,
					elapsed_ms,
					message = %failure.message,
					"Workload provisioning failed"
				);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_k8s::{Condition, ConditionStatus, ConditionType, ContainerStatus, Phase};

	fn record() -> WorkloadRecord {
		WorkloadRecord::new(WorkloadId::new("default", "web"), Phase::Running)
			.with_condition(Condition::new(ConditionType::Ready, ConditionStatus::True))
			.with_container(ContainerStatus {
				name: "workload".into(),
				ready: false,
				state: ContainerState::Terminated {
					reason: Some("Error".into()),
					message: None,
					exit_code: 1,
				},
			})
	}

	#[test]
	fn observers_are_object_safe() {
		let observers: Vec<Box<dyn ProvisionObserver>> =
			vec![Box::new(NoopObserver), Box::new(TracingObserver)];
		let tick = PollTick {
			attempt: 1,
			elapsed: Duration::from_millis(100),
		};
		let record = record();
		let completed = WorkloadRecord::new(record.id.clone(), Phase::Succeeded);
		for observer in &observers {
			observer.on_submitted(&record.id, Duration::from_millis(5));
			observer.on_not_visible(&record.id, &tick);
			observer.on_observed(Stage::AwaitReady, &record, &tick);
			observer.on_observed(Stage::AwaitReady, &completed, &tick);
			observer.on_outcome(&ProvisioningOutcome::Success {
				id: record.id.clone(),
				elapsed: Duration::from_millis(250),
			});
		}
	}
}
