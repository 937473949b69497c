//! The async callback facade: the object workers
//! hold a shared reference to, and the main thread drives.
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::channel::{DriveError, RequestChannel};
use crate::error::ErrorKind;
use crate::phase::{ErrorInfo, PhaseCallback, Response};
use crate::registry::StatusRegistry;
use crate::stats::StatDeltas;

/// Owns the registry, the pending counters, and the request rendezvous
/// for one mass-parallel run.  Workers hold a borrowed or `Arc`-shared
/// reference; the caller driving `wait_until_done` must outlive every
/// worker that holds one.
#[derive(Debug, Default)]
pub struct AsyncCallback
{
	stats: StatDeltas,
	registry: StatusRegistry,
	channel: RequestChannel,
	cancel: CancelToken,
}

impl AsyncCallback
{
	/// Build a fresh callback watching `cancel` for cooperative
	/// cancellation.
	pub fn new(cancel: CancelToken) -> Self
	{
		Self { cancel, ..Self::default() }
	}

	/// The cancellation handle this callback checks at every checkpoint.
	pub fn cancel_token(&self) -> &CancelToken { &self.cancel }

	// ---- worker-side ----

	/// Non-blocking, additive, never fails.
	pub fn update_data_processed(&self, items_delta: i64, bytes_delta: i64)
	{
		self.stats.update_data_processed(items_delta, bytes_delta);
	}

	/// Non-blocking, additive, never fails.  Delta may be negative.
	pub fn update_data_total(&self, items_delta: i64, bytes_delta: i64)
	{
		self.stats.update_data_total(items_delta, bytes_delta);
	}

	/// Register the current thread as active work at `priority`.
	pub fn notify_task_begin(&self, priority: usize) -> Result<(), ErrorKind>
	{
		self.registry.notify_task_begin(priority)
	}

	/// Remove the current thread's registry entry.
	pub fn notify_task_end(&self) -> Result<(), ErrorKind>
	{
		self.registry.notify_task_end()
	}

	/// Overwrite the current thread's status text, then check for
	/// cancellation.
	pub fn update_status(&self, msg: impl Into<String>) -> Result<(), ErrorKind>
	{
		self.registry.update_status(msg)?;
		self.cancel.check()
	}

	/// Blocking: wait for the log-info slot to free, then post.
	pub fn log_info(&self, msg: impl Into<String>) -> Result<(), ErrorKind>
	{
		self.channel.log_info(msg, &self.cancel)
	}

	/// `log_info` followed by `update_status` with the same text.
	pub fn report_info(&self, msg: impl Into<String>) -> Result<(), ErrorKind>
	{
		let msg = msg.into();
		self.log_info(msg.clone())?;
		self.update_status(msg)
	}

	/// Post an error and block for the phase callback's retry/ignore
	/// decision.
	pub fn report_error(&self, info: ErrorInfo) -> Result<Response, ErrorKind>
	{
		self.channel.report_error(info, &self.cancel)
	}

	// ---- main-side ----

	/// Drive the rendezvous until every worker pool has signaled done,
	/// forwarding requests and periodic ticks to `external`.
	pub fn wait_until_done<CB>(&self, tick_interval: Duration, external: &CB) -> Result<(), DriveError<CB::Error>>
	where
		CB: PhaseCallback,
	{
		self.channel.wait_until_done(tick_interval, &self.stats, &self.registry, external)
	}

	/// Signal that no more requests will arrive.  Idempotent.
	pub fn notify_all_done(&self) -> Result<(), ErrorKind>
	{
		self.channel.notify_all_done()
	}

	#[cfg(test)]
	pub(crate) fn registry_is_empty(&self) -> bool { self.registry.is_empty() }

	/// Test-only: drain and return the pending processed-items/bytes
	/// delta directly, without a full `PhaseCallback` drive loop.
	#[cfg(test)]
	pub(crate) fn update_data_processed_probe(&self) -> (i64, i64) { self.stats.drain_processed() }

	/// Test-only: drain and return the pending total-items/bytes delta.
	#[cfg(test)]
	pub(crate) fn update_data_total_probe(&self) -> (i64, i64) { self.stats.drain_total() }
}
