// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload provisioning lifecycle controller for kiln.
//!
//! Submits a workload to an eventually-consistent control plane and waits,
//! within bounded time, for it to become usable.
//!
//! # Architecture
//!
//! The provisioner sits between the caller (CLI or host service) and the
//! workload store (`kiln-k8s`), implementing:
//!
//! - Submit, await-visible and await-ready stages
//! - Classification of observed records into pending/ready/failed
//! - Bounded polling with cancellation and optional watch wake-ups
//! - Observability hooks for per-tick status logging

pub mod classify;
pub mod config;
pub mod error;
pub mod observer;
pub mod poll;
pub mod provisioner;
pub mod types;

pub use classify::{classify, ran_to_completion, Verdict};
pub use config::{ProvisionConfig, Timeouts};
pub use error::{FailureKind, ProvisionError};
pub use observer::{NoopObserver, ProvisionObserver, TracingObserver};
pub use poll::{
	poll_until, PollError, PollResult, PollSettings, PollTick, Poller, WakeStream,
	DEFAULT_POLL_INTERVAL,
};
pub use provisioner::Provisioner;
pub use types::{ProvisionFailure, ProvisioningOutcome, Stage};
