// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{WatchStream, WorkloadId, WorkloadRecord, WorkloadSpec};

/// Trait for workload store operations against the control plane.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the operations needed by the provisioner.
/// Implementations are shared between concurrent provisioning attempts.
#[async_trait]
pub trait WorkloadStore: Send + Sync {
	/// Submit a workload. Returns the identifier the control plane assigned.
	async fn create(&self, spec: &WorkloadSpec) -> Result<WorkloadId, StoreError>;

	/// Read the current record.
	///
	/// Returns [`StoreError::NotFound`] while the record is not readable,
	/// which includes the window right after `create` when the read path
	/// has not caught up yet.
	async fn get(&self, id: &WorkloadId) -> Result<WorkloadRecord, StoreError>;

	/// Open a stream of record updates for one workload.
	///
	/// Returns `Ok(None)` when the store has no watch support; callers fall
	/// back to polling.
	async fn watch(&self, _id: &WorkloadId) -> Result<Option<WatchStream>, StoreError> {
		Ok(None)
	}
}
