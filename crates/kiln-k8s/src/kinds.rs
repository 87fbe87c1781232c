// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Set of resource kinds (`<apiVersion>/<kind>`) a store is allowed to handle.
///
/// Passed to store constructors instead of relying on a process-wide registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownKinds(BTreeSet<String>);

impl KnownKinds {
	pub fn new<I, S>(kinds: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(kinds.into_iter().map(Into::into).collect())
	}

	/// The core kinds kiln provisions: `v1/Pod`.
	pub fn core() -> Self {
		Self::new([key::<k8s_openapi::api::core::v1::Pod>()])
	}

	pub fn contains(&self, api_version: &str, kind: &str) -> bool {
		self.0.contains(&format!("{api_version}/{kind}"))
	}

	/// Fail with [`StoreError::UnknownKind`] unless `K` is registered.
	pub fn require<K: k8s_openapi::Resource>(&self) -> Result<(), StoreError> {
		if self.contains(K::API_VERSION, K::KIND) {
			Ok(())
		} else {
			Err(StoreError::UnknownKind { kind: key::<K>() })
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

fn key<K: k8s_openapi::Resource>() -> String {
	format!("{}/{}", K::API_VERSION, K::KIND)
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::api::core::v1::{ConfigMap, Pod};

	#[test]
	fn core_contains_pods() {
		let kinds = KnownKinds::core();
		assert!(kinds.contains("v1", "Pod"));
		assert!(kinds.require::<Pod>().is_ok());
	}

	#[test]
	fn require_rejects_unregistered_kind() {
		let kinds = KnownKinds::core();
		let err = kinds.require::<ConfigMap>().unwrap_err();
		assert!(matches!(err, StoreError::UnknownKind { ref kind } if kind == "v1/ConfigMap"));
	}

	#[test]
	fn empty_set_rejects_pods() {
		let kinds = KnownKinds::default();
		assert!(kinds.require::<Pod>().is_err());
	}

	#[test]
	fn iter_is_sorted() {
		let kinds = KnownKinds::new(["v1/Pod", "batch/v1/Job"]);
		let all: Vec<_> = kinds.iter().collect();
		assert_eq!(all, vec!["batch/v1/Job", "v1/Pod"]);
	}
}
