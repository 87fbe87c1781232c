// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use k8s_openapi::api::core::v1::Pod;

/// Container name used when the caller does not pick one.
pub const DEFAULT_CONTAINER_NAME: &str = "workload";

const MAX_NAME_LENGTH: usize = 63;

/// A pinned stream of observed records for a single workload.
pub type WatchStream = Pin<Box<dyn Stream<Item = Result<WorkloadRecord, StoreError>> + Send>>;

/// Stable identifier of a workload: name within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadId {
	pub namespace: String,
	pub name: String,
}

impl WorkloadId {
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			name: name.into(),
		}
	}

	/// Generate a fresh identifier of the form `<prefix>-<unix seconds>-<suffix>`.
	///
	/// Resubmitting after a failure should use a fresh identifier so the new
	/// attempt never observes the old record.
	pub fn generate(namespace: impl Into<String>, prefix: &str) -> Self {
		let prefix: String = prefix
			.to_ascii_lowercase()
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
			.collect();
		let prefix = prefix.trim_matches('-');
		let prefix = if prefix.is_empty() { "workload" } else { prefix };

		let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
			.take(5)
			.map(|c| c.to_ascii_lowercase())
			.collect();
		let tail = format!("-{}-{suffix}", Utc::now().timestamp());

		let max_prefix = MAX_NAME_LENGTH - tail.len();
		let prefix = &prefix[..prefix.len().min(max_prefix)];
		let prefix = prefix.trim_end_matches('-');

		Self::new(namespace, format!("{prefix}{tail}"))
	}
}

impl fmt::Display for WorkloadId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// Resource requests and limits (e.g., cpu "100m", memory "100Mi").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
	pub cpu_request: Option<String>,
	pub memory_request: Option<String>,
	pub cpu_limit: Option<String>,
	pub memory_limit: Option<String>,
}

/// Desired workload submitted by the caller. Never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
	pub id: WorkloadId,
	pub container_name: String,
	pub image: String,
	#[serde(default)]
	pub command: Vec<String>,
	#[serde(default)]
	pub args: Vec<String>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
	#[serde(default)]
	pub resources: ResourceSpec,
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
}

impl WorkloadSpec {
	pub fn new(id: WorkloadId, image: impl Into<String>) -> Self {
		Self {
			id,
			container_name: DEFAULT_CONTAINER_NAME.to_string(),
			image: image.into(),
			command: Vec::new(),
			args: Vec::new(),
			env: BTreeMap::new(),
			resources: ResourceSpec::default(),
			labels: BTreeMap::new(),
		}
	}

	pub fn with_command<I, S>(mut self, command: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.command = command.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env.insert(key.into(), value.into());
		self
	}

	pub fn with_resources(mut self, resources: ResourceSpec) -> Self {
		self.resources = resources;
		self
	}

	pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.labels.insert(key.into(), value.into());
		self
	}
}

/// Coarse lifecycle stage reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	Pending,
	Running,
	Succeeded,
	Failed,
	Unknown,
}

impl Phase {
	/// Map a Kubernetes pod phase string. Missing or unrecognised phases are `Unknown`.
	pub fn from_k8s(phase: Option<&str>) -> Self {
		match phase {
			Some("Pending") => Phase::Pending,
			Some("Running") => Phase::Running,
			Some("Succeeded") => Phase::Succeeded,
			Some("Failed") => Phase::Failed,
			_ => Phase::Unknown,
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Phase::Pending => "Pending",
			Phase::Running => "Running",
			Phase::Succeeded => "Succeeded",
			Phase::Failed => "Failed",
			Phase::Unknown => "Unknown",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
	Scheduled,
	Initialized,
	ContainersReady,
	Ready,
	Other(String),
}

impl ConditionType {
	pub fn from_k8s(kind: &str) -> Self {
		match kind {
			"PodScheduled" | "Scheduled" => ConditionType::Scheduled,
			"Initialized" => ConditionType::Initialized,
			"ContainersReady" => ConditionType::ContainersReady,
			"Ready" => ConditionType::Ready,
			other => ConditionType::Other(other.to_string()),
		}
	}
}

impl fmt::Display for ConditionType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConditionType::Scheduled => f.write_str("Scheduled"),
			ConditionType::Initialized => f.write_str("Initialized"),
			ConditionType::ContainersReady => f.write_str("ContainersReady"),
			ConditionType::Ready => f.write_str("Ready"),
			ConditionType::Other(kind) => f.write_str(kind),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
	True,
	False,
	Unknown,
}

impl ConditionStatus {
	pub fn from_k8s(status: &str) -> Self {
		match status {
			"True" => ConditionStatus::True,
			"False" => ConditionStatus::False,
			_ => ConditionStatus::Unknown,
		}
	}
}

impl fmt::Display for ConditionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ConditionStatus::True => "True",
			ConditionStatus::False => "False",
			ConditionStatus::Unknown => "Unknown",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
	pub kind: ConditionType,
	pub status: ConditionStatus,
	pub reason: Option<String>,
	pub message: Option<String>,
}

impl Condition {
	pub fn new(kind: ConditionType, status: ConditionStatus) -> Self {
		Self {
			kind,
			status,
			reason: None,
			message: None,
		}
	}

	pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self.message = Some(message.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ContainerState {
	Waiting {
		reason: Option<String>,
		message: Option<String>,
	},
	Running {
		started_at: Option<DateTime<Utc>>,
	},
	Terminated {
		reason: Option<String>,
		message: Option<String>,
		exit_code: i32,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
	pub name: String,
	pub ready: bool,
	pub state: ContainerState,
}

/// The control plane's observed view of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRecord {
	pub id: WorkloadId,
	pub phase: Phase,
	pub reason: Option<String>,
	pub message: Option<String>,
	pub conditions: Vec<Condition>,
	pub container_statuses: Vec<ContainerStatus>,
}

impl WorkloadRecord {
	/// A record with the given phase and no conditions or container statuses.
	pub fn new(id: WorkloadId, phase: Phase) -> Self {
		Self {
			id,
			phase,
			reason: None,
			message: None,
			conditions: Vec::new(),
			container_statuses: Vec::new(),
		}
	}

	pub fn with_condition(mut self, condition: Condition) -> Self {
		self.conditions.push(condition);
		self
	}

	pub fn with_container(mut self, status: ContainerStatus) -> Self {
		self.container_statuses.push(status);
		self
	}

	/// First condition of the given type, if any.
	pub fn condition(&self, kind: &ConditionType) -> Option<&Condition> {
		self.conditions.iter().find(|c| &c.kind == kind)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn workload_id_display() {
		let id = WorkloadId::new("default", "nginx");
		assert_eq!(id.to_string(), "default/nginx");
	}

	#[test]
	fn generate_uses_prefix_and_namespace() {
		let id = WorkloadId::generate("ci", "test-pod");
		assert_eq!(id.namespace, "ci");
		assert!(id.name.starts_with("test-pod-"), "{}", id.name);
	}

	#[test]
	fn generate_produces_distinct_names() {
		let a = WorkloadId::generate("default", "job");
		let b = WorkloadId::generate("default", "job");
		assert_ne!(a, b);
	}

	#[test]
	fn generate_sanitizes_prefix() {
		let id = WorkloadId::generate("default", "My_Job!");
		assert!(id.name.starts_with("my-job-"), "{}", id.name);

		let id = WorkloadId::generate("default", "---");
		assert!(id.name.starts_with("workload-"), "{}", id.name);
	}

	#[test]
	fn phase_from_k8s() {
		assert_eq!(Phase::from_k8s(Some("Pending")), Phase::Pending);
		assert_eq!(Phase::from_k8s(Some("Running")), Phase::Running);
		assert_eq!(Phase::from_k8s(Some("Succeeded")), Phase::Succeeded);
		assert_eq!(Phase::from_k8s(Some("Failed")), Phase::Failed);
		assert_eq!(Phase::from_k8s(Some("Weird")), Phase::Unknown);
		assert_eq!(Phase::from_k8s(None), Phase::Unknown);
	}

	#[test]
	fn condition_type_maps_pod_scheduled() {
		assert_eq!(
			ConditionType::from_k8s("PodScheduled"),
			ConditionType::Scheduled
		);
		assert_eq!(ConditionType::from_k8s("Ready"), ConditionType::Ready);
		assert_eq!(
			ConditionType::from_k8s("DisruptionTarget"),
			ConditionType::Other("DisruptionTarget".to_string())
		);
	}

	#[test]
	fn condition_lookup_returns_first_match() {
		let record = WorkloadRecord::new(WorkloadId::new("default", "a"), Phase::Pending)
			.with_condition(Condition::new(
				ConditionType::Initialized,
				ConditionStatus::True,
			))
			.with_condition(Condition::new(ConditionType::Ready, ConditionStatus::False));

		let ready = record.condition(&ConditionType::Ready).unwrap();
		assert_eq!(ready.status, ConditionStatus::False);
		assert!(record.condition(&ConditionType::Scheduled).is_none());
	}

	#[test]
	fn spec_builder_sets_fields() {
		let spec = WorkloadSpec::new(WorkloadId::new("default", "sleeper"), "busybox")
			.with_command(["sleep", "3600"])
			.with_env("MODE", "test")
			.with_label("team", "infra");

		assert_eq!(spec.container_name, DEFAULT_CONTAINER_NAME);
		assert_eq!(spec.command, vec!["sleep", "3600"]);
		assert_eq!(spec.env.get("MODE"), Some(&"test".to_string()));
		assert_eq!(spec.labels.get("team"), Some(&"infra".to_string()));
	}

	#[test]
	fn container_state_serializes_tagged() {
		let state = ContainerState::Terminated {
			reason: Some("Error".into()),
			message: None,
			exit_code: 2,
		};
		let json = serde_json::to_value(&state).unwrap();
		assert_eq!(json["state"], "terminated");
		assert_eq!(json["exit_code"], 2);
	}
}
