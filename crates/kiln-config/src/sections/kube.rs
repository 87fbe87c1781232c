// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes target configuration section.

use std::path::PathBuf;

use kiln_k8s::KnownKinds;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_namespace() -> String {
	"default".to_string()
}

fn default_name_prefix() -> String {
	"kiln".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KubeConfigLayer {
	pub namespace: Option<String>,
	/// Explicit kubeconfig file. When unset the client discovers one.
	pub kubeconfig: Option<PathBuf>,
	/// Prefix for generated workload names
	pub name_prefix: Option<String>,
	/// Resource kinds the store may handle, as `<apiVersion>/<kind>`
	pub known_kinds: Option<Vec<String>>,
}

impl KubeConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.kubeconfig.is_some() {
			self.kubeconfig = other.kubeconfig;
		}
		if other.name_prefix.is_some() {
			self.name_prefix = other.name_prefix;
		}
		if other.known_kinds.is_some() {
			self.known_kinds = other.known_kinds;
		}
	}

	pub fn resolve(self) -> Result<KubeConfig, ConfigError> {
		let namespace = self.namespace.unwrap_or_else(default_namespace);
		if namespace.trim().is_empty() {
			return Err(ConfigError::Validation(
				"kube.namespace must not be empty".to_string(),
			));
		}

		let known_kinds = match self.known_kinds {
			Some(kinds) => KnownKinds::new(kinds),
			None => KnownKinds::core(),
		};

		Ok(KubeConfig {
			namespace,
			kubeconfig: self.kubeconfig,
			name_prefix: self.name_prefix.unwrap_or_else(default_name_prefix),
			known_kinds,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfig {
	pub namespace: String,
	pub kubeconfig: Option<PathBuf>,
	pub name_prefix: String,
	pub known_kinds: KnownKinds,
}

impl Default for KubeConfig {
	fn default() -> Self {
		Self {
			namespace: default_namespace(),
			kubeconfig: None,
			name_prefix: default_name_prefix(),
			known_kinds: KnownKinds::core(),
		}
	}
}
