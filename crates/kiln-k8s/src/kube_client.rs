// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
	api::{Api, PostParams},
	config::{KubeConfigOptions, Kubeconfig},
	runtime::{watcher, WatchStreamExt},
	Client, Config,
};
use tracing::{debug, instrument};

use crate::client::WorkloadStore;
use crate::error::StoreError;
use crate::kinds::KnownKinds;
use crate::pod::{build_pod, record_from_pod};
use crate::types::{WatchStream, WorkloadId, WorkloadRecord, WorkloadSpec};

/// Production workload store backed by Pods, using the kube crate.
pub struct KubeWorkloadStore {
	client: Client,
}

impl KubeWorkloadStore {
	/// Create a store that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn try_default(kinds: &KnownKinds) -> Result<Self, StoreError> {
		kinds.require::<Pod>()?;
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Create a store from an explicit kubeconfig file.
	pub async fn from_kubeconfig(path: &Path, kinds: &KnownKinds) -> Result<Self, StoreError> {
		kinds.require::<Pod>()?;
		let kubeconfig = Kubeconfig::read_from(path).map_err(|e| StoreError::Config {
			message: format!("failed to read {}: {e}", path.display()),
		})?;
		let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
			.await
			.map_err(|e| StoreError::Config {
				message: e.to_string(),
			})?;
		let client = Client::try_from(config)?;
		debug!(path = %path.display(), "K8s client initialized from kubeconfig");
		Ok(Self { client })
	}

	/// Wrap an existing client.
	pub fn from_client(client: Client, kinds: &KnownKinds) -> Result<Self, StoreError> {
		kinds.require::<Pod>()?;
		Ok(Self { client })
	}

	fn pods(&self, namespace: &str) -> Api<Pod> {
		Api::namespaced(self.client.clone(), namespace)
	}
}

#[async_trait]
impl WorkloadStore for KubeWorkloadStore {
	#[instrument(skip(self, spec), fields(workload = %spec.id))]
	async fn create(&self, spec: &WorkloadSpec) -> Result<WorkloadId, StoreError> {
		let pod = build_pod(spec);
		let created = match self
			.pods(&spec.id.namespace)
			.create(&PostParams::default(), &pod)
			.await
		{
			Ok(pod) => pod,
			Err(kube::Error::Api(err)) if err.code == 409 => {
				return Err(StoreError::AlreadyExists {
					id: spec.id.clone(),
				})
			}
			Err(e) => return Err(e.into()),
		};

		let id = WorkloadId {
			namespace: created
				.metadata
				.namespace
				.unwrap_or_else(|| spec.id.namespace.clone()),
			name: created.metadata.name.unwrap_or_else(|| spec.id.name.clone()),
		};
		debug!(workload = %id, "Pod create accepted");
		Ok(id)
	}

	async fn get(&self, id: &WorkloadId) -> Result<WorkloadRecord, StoreError> {
		match self.pods(&id.namespace).get(&id.name).await {
			Ok(pod) => Ok(record_from_pod(id, &pod)),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(StoreError::NotFound { id: id.clone() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn watch(&self, id: &WorkloadId) -> Result<Option<WatchStream>, StoreError> {
		let config = watcher::Config::default().fields(&format!("metadata.name={}", id.name));
		let owned_id = id.clone();

		let stream = watcher(self.pods(&id.namespace), config)
			.default_backoff()
			.applied_objects()
			.map(move |event| match event {
				Ok(pod) => Ok(record_from_pod(&owned_id, &pod)),
				Err(e) => Err(StoreError::Watch {
					message: e.to_string(),
				}),
			});
		let stream: WatchStream = Box::pin(stream);

		debug!(workload = %id, "Opened pod watch");
		Ok(Some(stream))
	}
}
