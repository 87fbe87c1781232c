// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod kube;
pub mod logging;
pub mod provisioning;

pub use kube::{KubeConfig, KubeConfigLayer};
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingConfigLayer};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigLayer};
