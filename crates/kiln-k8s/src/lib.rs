// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Workload store abstraction for kiln provisioning.
//!
//! This crate provides:
//! - A trait-based workload store (create/get/watch) for testability
//! - Production implementation on Pods using the kube crate
//! - The workload data model the provisioner reasons about

mod client;
mod error;
mod kinds;
mod kube_client;
mod pod;
mod types;

pub use client::WorkloadStore;
pub use error::{StoreError, StoreResult};
pub use kinds::KnownKinds;
pub use kube_client::KubeWorkloadStore;
pub use pod::{build_pod, record_from_pod, MANAGED_LABEL};
pub use types::{
	Condition, ConditionStatus, ConditionType, ContainerState, ContainerStatus, Phase, Pod,
	ResourceSpec, WatchStream, WorkloadId, WorkloadRecord, WorkloadSpec, DEFAULT_CONTAINER_NAME,
};
