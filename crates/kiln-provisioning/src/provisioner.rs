// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning state machine: submit, await visible, await ready.

use std::sync::Arc;

use futures::StreamExt;
use kiln_k8s::{StoreError, WorkloadId, WorkloadRecord, WorkloadSpec, WorkloadStore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::classify::{classify, Verdict};
use crate::config::{ProvisionConfig, Timeouts};
use crate::error::ProvisionError;
use crate::observer::{ProvisionObserver, TracingObserver};
use crate::poll::{PollError, PollResult, PollSettings, PollTick, Poller, WakeStream};
use crate::types::{ProvisionFailure, ProvisioningOutcome, Stage};

/// Drives one workload at a time from submission to a terminal outcome.
///
/// A single `Provisioner` may run any number of attempts concurrently. The
/// only shared state is the store handle.
pub struct Provisioner {
	store: Arc<dyn WorkloadStore>,
	config: ProvisionConfig,
	observer: Arc<dyn ProvisionObserver>,
}

impl Provisioner {
	pub fn new(store: Arc<dyn WorkloadStore>, config: ProvisionConfig) -> Self {
		Self {
			store,
			config,
			observer: Arc::new(TracingObserver),
		}
	}

	pub fn with_observer(mut self, observer: Arc<dyn ProvisionObserver>) -> Self {
		self.observer = observer;
		self
	}

	pub fn config(&self) -> &ProvisionConfig {
		&self.config
	}

	/// Provision `spec` using the configured default budgets.
	pub async fn provision_with_defaults(
		&self,
		spec: &WorkloadSpec,
		cancel: &CancellationToken,
	) -> ProvisioningOutcome {
		let timeouts = self.config.timeouts;
		self.provision(spec, &timeouts, cancel).await
	}

	/// Submit `spec` and wait until it is ready, has failed, or a budget runs out.
	///
	/// Always returns an outcome. Failures carry the stage they happened in
	/// and the total time since the call started.
	#[instrument(skip(self, spec, timeouts, cancel), fields(workload = %spec.id))]
	pub async fn provision(
		&self,
		spec: &WorkloadSpec,
		timeouts: &Timeouts,
		cancel: &CancellationToken,
	) -> ProvisioningOutcome {
		let start = Instant::now();

		let outcome = match self.run(spec, timeouts, cancel, start).await {
			Ok(id) => ProvisioningOutcome::Success {
				id,
				elapsed: start.elapsed(),
			},
			Err(err) => ProvisioningOutcome::Failure(ProvisionFailure {
				id: err.id().clone(),
				stage: err.stage(),
				kind: err.kind(),
				message: err.to_string(),
				elapsed: start.elapsed(),
			}),
		};

		self.observer.on_outcome(&outcome);
		outcome
	}

	async fn run(
		&self,
		spec: &WorkloadSpec,
		timeouts: &Timeouts,
		cancel: &CancellationToken,
		start: Instant,
	) -> Result<WorkloadId, ProvisionError> {
		let id = self.submit(spec, cancel).await?;
		self.observer.on_submitted(&id, start.elapsed());
		debug!(workload = %id, elapsed_ms = start.elapsed().as_millis() as u64, "Submit complete");

		let stage_start = Instant::now();
		let record = self.await_visible(&id, &timeouts.visibility, cancel).await?;
		debug!(
			workload = %id,
			phase = %record.phase,
			stage_ms = stage_start.elapsed().as_millis() as u64,
			"Workload visible"
		);

		let stage_start = Instant::now();
		self.await_ready(&id, &timeouts.readiness, cancel).await?;
		debug!(
			workload = %id,
			stage_ms = stage_start.elapsed().as_millis() as u64,
			total_ms = start.elapsed().as_millis() as u64,
			"Readiness wait complete"
		);

		Ok(id)
	}

	async fn submit(
		&self,
		spec: &WorkloadSpec,
		cancel: &CancellationToken,
	) -> Result<WorkloadId, ProvisionError> {
		if cancel.is_cancelled() {
			return Err(ProvisionError::Cancelled {
				id: spec.id.clone(),
				stage: Stage::Submit,
			});
		}

		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(ProvisionError::Cancelled {
				id: spec.id.clone(),
				stage: Stage::Submit,
			}),
			created = self.store.create(spec) => created.map_err(|source| ProvisionError::Submit {
				id: spec.id.clone(),
				source,
			}),
		}
	}

	async fn await_visible(
		&self,
		id: &WorkloadId,
		settings: &PollSettings,
		cancel: &CancellationToken,
	) -> Result<WorkloadRecord, ProvisionError> {
		let stage = Stage::AwaitVisible;
		let store = &self.store;
		let observer = &self.observer;

		let poller = self
			.poller::<WorkloadRecord, StoreError>(id, stage, settings, cancel)
			.await
			.on_tick(move |tick, result| trace_tick(id, stage, tick, result));

		let result = poller
			.run(move |tick| async move {
				match store.get(id).await {
					Ok(record) => {
						observer.on_observed(stage, &record, &tick);
						PollResult::Done(record)
					}
					Err(err) if err.is_not_found() => {
						observer.on_not_visible(id, &tick);
						PollResult::Continue
					}
					Err(err) => PollResult::Fail(err),
				}
			})
			.await;

		result.map_err(|err| visibility_error(id, err))
	}

	async fn await_ready(
		&self,
		id: &WorkloadId,
		settings: &PollSettings,
		cancel: &CancellationToken,
	) -> Result<WorkloadRecord, ProvisionError> {
		let stage = Stage::AwaitReady;
		let store = &self.store;
		let observer = &self.observer;

		let poller = self
			.poller::<WorkloadRecord, ReadyFailure>(id, stage, settings, cancel)
			.await
			.on_tick(move |tick, result| trace_tick(id, stage, tick, result));

		let result = poller
			.run(move |tick| async move {
				let record = match store.get(id).await {
					Ok(record) => record,
					Err(err) => return PollResult::Fail(ReadyFailure::Store(err)),
				};
				observer.on_observed(stage, &record, &tick);

				match classify(&record) {
					Verdict::Ready => PollResult::Done(record),
					Verdict::Pending => PollResult::Continue,
					Verdict::Failed { reason, message } => {
						PollResult::Fail(ReadyFailure::Workload { reason, message })
					}
				}
			})
			.await;

		result.map_err(|err| match err {
			PollError::Timeout { elapsed } => ProvisionError::ReadinessTimeout {
				id: id.clone(),
				elapsed,
			},
			PollError::Failed {
				error: ReadyFailure::Workload { reason, message },
				..
			} => ProvisionError::WorkloadFailed {
				id: id.clone(),
				reason,
				message,
			},
			PollError::Failed {
				error: ReadyFailure::Store(source),
				..
			} => ProvisionError::Observe {
				id: id.clone(),
				stage,
				source,
			},
			PollError::Cancelled { .. } => ProvisionError::Cancelled {
				id: id.clone(),
				stage,
			},
		})
	}

	async fn poller<'a, T, E>(
		&self,
		id: &WorkloadId,
		stage: Stage,
		settings: &PollSettings,
		cancel: &'a CancellationToken,
	) -> Poller<'a, T, E> {
		let wake = self.open_wake(id, stage).await;
		let poller = Poller::new(*settings, cancel);
		match wake {
			Some(wake) => poller.with_wake(wake),
			None => poller,
		}
	}

	async fn open_wake(&self, id: &WorkloadId, stage: Stage) -> Option<WakeStream> {
		if !self.config.use_watch {
			return None;
		}

		match self.store.watch(id).await {
			Ok(Some(stream)) => {
				debug!(workload = %id, %stage, "Watching workload for early wake-ups");
				let wake: WakeStream = Box::pin(stream.map(|_| ()));
				Some(wake)
			}
			Ok(None) => {
				debug!(workload = %id, %stage, "Store has no watch support, polling only");
				None
			}
			Err(e) => {
				warn!(workload = %id, %stage, error = %e, "Failed to open watch, polling only");
				None
			}
		}
	}
}

/// Why a readiness poll stopped early.
#[derive(Debug)]
enum ReadyFailure {
	Store(StoreError),
	Workload { reason: String, message: String },
}

fn visibility_error(id: &WorkloadId, err: PollError<StoreError>) -> ProvisionError {
	match err {
		PollError::Cancelled { .. } => ProvisionError::Cancelled {
			id: id.clone(),
			stage: Stage::AwaitVisible,
		},
		PollError::Failed { error, .. } => ProvisionError::Observe {
			id: id.clone(),
			stage: Stage::AwaitVisible,
			source: error,
		},
		PollError::Timeout { elapsed } => ProvisionError::VisibilityTimeout {
			id: id.clone(),
			elapsed,
		},
	}
}

fn trace_tick<T, E>(id: &WorkloadId, stage: Stage, tick: &PollTick, result: &PollResult<T, E>) {
	trace!(
		workload = %id,
		%stage,
		attempt = tick.attempt,
		elapsed_ms = tick.elapsed.as_millis() as u64,
		result = result.label(),
		"Poll tick"
	);
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use kiln_k8s::Phase;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::time::Duration;

	struct FlakyVisibility {
		misses: u32,
		gets: AtomicU32,
	}

	#[async_trait]
	impl WorkloadStore for FlakyVisibility {
		async fn create(&self, spec: &WorkloadSpec) -> Result<WorkloadId, StoreError> {
			Ok(spec.id.clone())
		}

		async fn get(&self, id: &WorkloadId) -> Result<WorkloadRecord, StoreError> {
			let n = self.gets.fetch_add(1, Ordering::SeqCst);
			if n < self.misses {
				Err(StoreError::NotFound { id: id.clone() })
			} else {
				Ok(WorkloadRecord::new(id.clone(), Phase::Pending))
			}
		}
	}

	fn fast() -> PollSettings {
		PollSettings::new(Duration::from_millis(5), Duration::from_millis(500))
	}

	#[tokio::test]
	async fn await_visible_tolerates_not_found() {
		let store = Arc::new(FlakyVisibility {
			misses: 3,
			gets: AtomicU32::new(0),
		});
		let provisioner = Provisioner::new(store.clone(), ProvisionConfig::default());
		let id = WorkloadId::new("default", "web");
		let cancel = CancellationToken::new();

		let record = provisioner
			.await_visible(&id, &fast(), &cancel)
			.await
			.unwrap();

		assert_eq!(record.phase, Phase::Pending);
		assert_eq!(store.gets.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn await_ready_treats_not_found_as_observation_error() {
		let store = Arc::new(FlakyVisibility {
			misses: u32::MAX,
			gets: AtomicU32::new(0),
		});
		let provisioner = Provisioner::new(store, ProvisionConfig::default());
		let id = WorkloadId::new("default", "web");
		let cancel = CancellationToken::new();

		let err = provisioner
			.await_ready(&id, &fast(), &cancel)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ProvisionError::Observe {
				stage: Stage::AwaitReady,
				..
			}
		));
	}

	#[tokio::test]
	async fn cancelled_before_submit_fails_at_submit() {
		let store = Arc::new(FlakyVisibility {
			misses: 0,
			gets: AtomicU32::new(0),
		});
		let provisioner = Provisioner::new(store.clone(), ProvisionConfig::default());
		let spec = WorkloadSpec::new(WorkloadId::new("default", "web"), "busybox:latest");
		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = provisioner.submit(&spec, &cancel).await.unwrap_err();

		assert!(matches!(
			err,
			ProvisionError::Cancelled {
				stage: Stage::Submit,
				..
			}
		));
		assert_eq!(store.gets.load(Ordering::SeqCst), 0);
	}
}
