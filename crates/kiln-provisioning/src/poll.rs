// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded polling with cancellation.
//!
//! A [`Poller`] evaluates an async predicate at a fixed interval until the
//! predicate reports a terminal result, the time budget is spent, or the
//! caller's [`CancellationToken`] fires. An optional wake stream lets an
//! external event (typically a watch update) trigger the next evaluation
//! before the interval elapses.
//!
//! Evaluations never overlap: the next one starts only after the previous
//! predicate future has completed or been dropped.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default interval between predicate evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stream of wake-up signals. Each item triggers an early evaluation.
pub type WakeStream = Pin<Box<dyn Stream<Item = ()> + Send>>;

type TickHook<'a, T, E> = Box<dyn FnMut(&PollTick, &PollResult<T, E>) + Send + 'a>;

/// Interval and time budget for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
	pub interval: Duration,
	pub timeout: Duration,
}

impl PollSettings {
	pub const fn new(interval: Duration, timeout: Duration) -> Self {
		Self { interval, timeout }
	}
}

/// Result of one predicate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T, E> {
	/// Not there yet, evaluate again after the interval.
	Continue,
	/// Terminal success.
	Done(T),
	/// Terminal failure. Stops polling immediately.
	Fail(E),
}

impl<T, E> PollResult<T, E> {
	pub fn label(&self) -> &'static str {
		match self {
			PollResult::Continue => "continue",
			PollResult::Done(_) => "done",
			PollResult::Fail(_) => "fail",
		}
	}
}

/// Position of an evaluation within a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTick {
	/// 1-based evaluation count.
	pub attempt: u32,
	/// Time since the loop started.
	pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
	#[error("timed out after {elapsed:?}")]
	Timeout { elapsed: Duration },

	#[error("cancelled after {elapsed:?}")]
	Cancelled { elapsed: Duration },

	#[error("predicate failed after {elapsed:?}")]
	Failed { error: E, elapsed: Duration },
}

impl<E> PollError<E> {
	pub fn elapsed(&self) -> Duration {
		match self {
			PollError::Timeout { elapsed }
			| PollError::Cancelled { elapsed }
			| PollError::Failed { elapsed, .. } => *elapsed,
		}
	}
}

/// Builder for a single bounded polling loop.
pub struct Poller<'a, T, E> {
	settings: PollSettings,
	cancel: &'a CancellationToken,
	wake: Option<WakeStream>,
	on_tick: Option<TickHook<'a, T, E>>,
}

impl<'a, T, E> Poller<'a, T, E> {
	pub fn new(settings: PollSettings, cancel: &'a CancellationToken) -> Self {
		Self {
			settings,
			cancel,
			wake: None,
			on_tick: None,
		}
	}

	/// Evaluate early whenever `wake` yields. When the stream ends the loop
	/// falls back to interval polling.
	pub fn with_wake(mut self, wake: WakeStream) -> Self {
		self.wake = Some(wake);
		self
	}

	/// Observe every evaluation result before it is acted on.
	pub fn on_tick<F>(mut self, hook: F) -> Self
	where
		F: FnMut(&PollTick, &PollResult<T, E>) + Send + 'a,
	{
		self.on_tick = Some(Box::new(hook));
		self
	}

	/// Run the loop to completion.
	///
	/// Cancellation and the deadline are raced against every evaluation and
	/// every wait. An in-flight predicate future is dropped when either
	/// fires, so a hung read cannot hold the loop past its budget. The
	/// predicate is evaluated at least once unless the token is already
	/// cancelled on entry. No evaluation is started once the budget is spent.
	pub async fn run<F, Fut>(self, mut predicate: F) -> Result<T, PollError<E>>
	where
		F: FnMut(PollTick) -> Fut,
		Fut: Future<Output = PollResult<T, E>>,
	{
		let Poller {
			settings,
			cancel,
			mut wake,
			mut on_tick,
		} = self;
		let start = Instant::now();
		let deadline = start + settings.timeout;
		let mut attempt: u32 = 0;

		loop {
			if cancel.is_cancelled() {
				return Err(PollError::Cancelled {
					elapsed: start.elapsed(),
				});
			}

			attempt = attempt.saturating_add(1);
			let tick = PollTick {
				attempt,
				elapsed: start.elapsed(),
			};
			let result = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					return Err(PollError::Cancelled {
						elapsed: start.elapsed(),
					});
				}
				_ = tokio::time::sleep_until(deadline) => {
					return Err(PollError::Timeout {
						elapsed: start.elapsed(),
					});
				}
				result = predicate(tick) => result,
			};

			if let Some(hook) = on_tick.as_mut() {
				hook(&tick, &result);
			}

			match result {
				PollResult::Done(value) => return Ok(value),
				PollResult::Fail(error) => {
					return Err(PollError::Failed {
						error,
						elapsed: start.elapsed(),
					})
				}
				PollResult::Continue => {}
			}

			let remaining = settings.timeout.saturating_sub(start.elapsed());
			if remaining.is_zero() {
				return Err(PollError::Timeout {
					elapsed: start.elapsed(),
				});
			}

			let wake_exhausted = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					return Err(PollError::Cancelled {
						elapsed: start.elapsed(),
					});
				}
				_ = tokio::time::sleep(settings.interval.min(remaining)) => false,
				woke = next_wake(&mut wake) => woke.is_none(),
			};
			if wake_exhausted {
				wake = None;
			}

			if start.elapsed() >= settings.timeout {
				return Err(PollError::Timeout {
					elapsed: start.elapsed(),
				});
			}
		}
	}
}

async fn next_wake(wake: &mut Option<WakeStream>) -> Option<()> {
	match wake {
		Some(stream) => stream.next().await,
		None => std::future::pending().await,
	}
}

/// Poll `predicate` with no wake stream and no tick hook.
pub async fn poll_until<T, E, F, Fut>(
	settings: PollSettings,
	cancel: &CancellationToken,
	predicate: F,
) -> Result<T, PollError<E>>
where
	F: FnMut(PollTick) -> Fut,
	Fut: Future<Output = PollResult<T, E>>,
{
	Poller::new(settings, cancel).run(predicate).await
}
