// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Conversion between kiln workload types and Kubernetes Pods.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::types::{
	Condition, ConditionStatus, ConditionType, ContainerState, ContainerStatus, Phase, Pod,
	ResourceSpec, WorkloadId, WorkloadRecord, WorkloadSpec,
};

/// Label set on every pod created by kiln.
pub const MANAGED_LABEL: &str = "kiln.dev/managed";

/// Build the Pod submitted for a workload spec.
pub fn build_pod(spec: &WorkloadSpec) -> Pod {
	let mut labels = spec.labels.clone();
	labels.insert(MANAGED_LABEL.to_string(), "true".to_string());

	let env: Vec<core::EnvVar> = spec
		.env
		.iter()
		.map(|(name, value)| core::EnvVar {
			name: name.clone(),
			value: Some(value.clone()),
			..Default::default()
		})
		.collect();

	let container = core::Container {
		name: spec.container_name.clone(),
		image: Some(spec.image.clone()),
		command: non_empty(&spec.command),
		args: non_empty(&spec.args),
		env: (!env.is_empty()).then_some(env),
		resources: resource_requirements(&spec.resources),
		..Default::default()
	};

	Pod {
		metadata: ObjectMeta {
			name: Some(spec.id.name.clone()),
			namespace: Some(spec.id.namespace.clone()),
			labels: Some(labels),
			..Default::default()
		},
		spec: Some(core::PodSpec {
			containers: vec![container],
			restart_policy: Some("Never".to_string()),
			..Default::default()
		}),
		status: None,
	}
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
	(!values.is_empty()).then(|| values.to_vec())
}

fn resource_requirements(resources: &ResourceSpec) -> Option<core::ResourceRequirements> {
	let requests = quantities(&resources.cpu_request, &resources.memory_request);
	let limits = quantities(&resources.cpu_limit, &resources.memory_limit);

	if requests.is_none() && limits.is_none() {
		return None;
	}

	Some(core::ResourceRequirements {
		requests,
		limits,
		..Default::default()
	})
}

fn quantities(
	cpu: &Option<String>,
	memory: &Option<String>,
) -> Option<BTreeMap<String, Quantity>> {
	let mut map = BTreeMap::new();
	if let Some(cpu) = cpu {
		map.insert("cpu".to_string(), Quantity(cpu.clone()));
	}
	if let Some(memory) = memory {
		map.insert("memory".to_string(), Quantity(memory.clone()));
	}
	(!map.is_empty()).then_some(map)
}

/// Convert an observed Pod into a [`WorkloadRecord`].
///
/// The identifier is taken from the pod metadata, falling back to `id` for
/// fields the API server left empty.
pub fn record_from_pod(id: &WorkloadId, pod: &Pod) -> WorkloadRecord {
	let id = WorkloadId {
		namespace: pod
			.metadata
			.namespace
			.clone()
			.unwrap_or_else(|| id.namespace.clone()),
		name: pod.metadata.name.clone().unwrap_or_else(|| id.name.clone()),
	};

	let Some(status) = pod.status.as_ref() else {
		return WorkloadRecord::new(id, Phase::Unknown);
	};

	let conditions = status
		.conditions
		.iter()
		.flatten()
		.map(|c| Condition {
			kind: ConditionType::from_k8s(&c.type_),
			status: ConditionStatus::from_k8s(&c.status),
			reason: c.reason.clone(),
			message: c.message.clone(),
		})
		.collect();

	let container_statuses = status
		.container_statuses
		.iter()
		.flatten()
		.map(|cs| ContainerStatus {
			name: cs.name.clone(),
			ready: cs.ready,
			state: container_state(cs.state.as_ref()),
		})
		.collect();

	WorkloadRecord {
		id,
		phase: Phase::from_k8s(status.phase.as_deref()),
		reason: status.reason.clone(),
		message: status.message.clone(),
		conditions,
		container_statuses,
	}
}

fn container_state(state: Option<&core::ContainerState>) -> ContainerState {
	let Some(state) = state else {
		return ContainerState::Waiting {
			reason: None,
			message: None,
		};
	};

	if let Some(terminated) = &state.terminated {
		return ContainerState::Terminated {
			reason: terminated.reason.clone(),
			message: terminated.message.clone(),
			exit_code: terminated.exit_code,
		};
	}
	if let Some(running) = &state.running {
		return ContainerState::Running {
			started_at: running.started_at.as_ref().map(|t| t.0),
		};
	}
	match &state.waiting {
		Some(waiting) => ContainerState::Waiting {
			reason: waiting.reason.clone(),
			message: waiting.message.clone(),
		},
		None => ContainerState::Waiting {
			reason: None,
			message: None,
		},
	}
}
