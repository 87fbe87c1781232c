// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::types::WorkloadId;

/// Result type alias for workload store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during workload store operations.
#[derive(Error, Debug)]
pub enum StoreError {
	#[error("Workload not found: {id}")]
	NotFound { id: WorkloadId },

	#[error("Workload already exists: {id}")]
	AlreadyExists { id: WorkloadId },

	#[error("K8s API error: {message}")]
	Api { message: String },

	#[error("Watch stream error: {message}")]
	Watch { message: String },

	#[error("Client configuration error: {message}")]
	Config { message: String },

	#[error("Resource kind not registered: {kind}")]
	UnknownKind { kind: String },
}

impl StoreError {
	/// Whether this error means the record is not (yet) readable.
	pub fn is_not_found(&self) -> bool {
		matches!(self, StoreError::NotFound { .. })
	}
}

impl From<kube::Error> for StoreError {
	fn from(err: kube::Error) -> Self {
		StoreError::Api {
			message: err.to_string(),
		}
	}
}
