//! The main/worker rendezvous: three request slots guarded by one
//! mutex, with three condition variables for "a slot freed up", "a
//! request arrived", and "a response arrived".
//!
//! There's no native "interruptible condvar wait" in `std`, so waits are
//! done in short bounded slices (`CHECKPOINT_INTERVAL`) with a
//! cancellation check between each: the checkpoint helper described in
//! the design notes.
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::ErrorKind;
use crate::phase::{ErrorInfo, PhaseCallback, Response};
use crate::registry::StatusRegistry;
use crate::stats::StatDeltas;

/// How long a worker's interruptible wait sleeps between cancellation
/// checks.  Short enough that cancellation feels immediate, long enough
/// not to spin.
const CHECKPOINT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct PendingRequests
{
	log_info_request: Option<String>,
	error_request: Option<ErrorInfo>,
	error_response: Option<Response>,
	finish_now: bool,
}

/// A failure out of the main-thread drive loop: either the external
/// callback raised, or this crate's own internals hit a defect (lock
/// poisoning).
#[derive(Debug, thiserror::Error)]
pub enum DriveError<E>
where
	E: std::error::Error + Send + Sync + 'static,
{
	#[error(transparent)]
	Callback(#[from] E),

	#[error(transparent)]
	Internal(#[from] ErrorKind),
}

#[derive(Debug, Default)]
pub(crate) struct RequestChannel
{
	state: Mutex<PendingRequests>,
	cv_ready_for_new_request: std::sync::Condvar,
	cv_new_request: std::sync::Condvar,
	cv_have_response: std::sync::Condvar,
}

impl RequestChannel
{
	fn lock(&self) -> Result<MutexGuard<'_, PendingRequests>, ErrorKind>
	{
		self.state.lock().map_err(|_| ErrorKind::LockPoisoned("request"))
	}

	fn checkpointed_wait<'a>(
		&'a self,
		cv: &std::sync::Condvar,
		guard: MutexGuard<'a, PendingRequests>,
		cancel: &CancelToken,
	) -> Result<MutexGuard<'a, PendingRequests>, ErrorKind>
	{
		cancel.check()?;
		let (guard, _timeout) = cv
			.wait_timeout(guard, CHECKPOINT_INTERVAL)
			.map_err(|_| ErrorKind::LockPoisoned("request"))?;
		cancel.check()?;
		Ok(guard)
	}

	// ---- worker-side ----

	/// Wait until the single log-info slot is free, then post `msg`.
	/// Blocking: this is how the system implements "pause": stop
	/// draining and every worker calling `log_info` queues up here.
	pub(crate) fn log_info(&self, msg: impl Into<String>, cancel: &CancelToken) -> Result<(), ErrorKind>
	{
		let msg = msg.into();
		let mut g = self.lock()?;
		while g.log_info_request.is_some()
		{
			g = self.checkpointed_wait(&self.cv_ready_for_new_request, g, cancel)?;
		}
		g.log_info_request = Some(msg);
		self.cv_new_request.notify_all();
		Ok(())
	}

	/// Post an error and block until the main thread has produced a
	/// response.
	pub(crate) fn report_error(&self, info: ErrorInfo, cancel: &CancelToken) -> Result<Response, ErrorKind>
	{
		let mut g = self.lock()?;
		while g.error_request.is_some() || g.error_response.is_some()
		{
			g = self.checkpointed_wait(&self.cv_ready_for_new_request, g, cancel)?;
		}
		g.error_request = Some(info);
		self.cv_new_request.notify_all();

		while g.error_response.is_none()
		{
			g = self.checkpointed_wait(&self.cv_have_response, g, cancel)?;
		}
		let resp = g.error_response.take().expect("checked Some above");
		g.error_request = None;
		drop(g);
		self.cv_ready_for_new_request.notify_all();
		Ok(resp)
	}

	/// Signal that no more requests will come from any worker.
	/// Idempotent: a second call silently no-ops.
	pub(crate) fn notify_all_done(&self) -> Result<(), ErrorKind>
	{
		let mut g = self.lock()?;
		if g.finish_now { return Ok(()); }
		g.finish_now = true;
		self.cv_new_request.notify_all();
		Ok(())
	}

	// ---- main-side ----

	/// Drive the rendezvous until `notify_all_done` fires, waking at
	/// least every `tick_interval` to refresh the UI.
	pub(crate) fn wait_until_done<CB>(
		&self,
		tick_interval: Duration,
		stats: &StatDeltas,
		registry: &StatusRegistry,
		external: &CB,
	) -> Result<(), DriveError<CB::Error>>
	where
		CB: PhaseCallback,
	{
		loop
		{
			let deadline = Instant::now() + tick_interval;
			let mut g = self.lock()?;

			loop
			{
				if g.finish_now
				{
					drop(g);
					Self::report_stats(stats, external)?;
					return Ok(());
				}

				if let Some(info) = g.error_request.clone()
				{
					if g.error_response.is_none()
					{
						let resp = external.report_error(&info)?;
						g.error_response = Some(resp);
						self.cv_have_response.notify_all();
						continue;
					}
				}

				if let Some(msg) = g.log_info_request.take()
				{
					external.log_info(&msg)?;
					self.cv_ready_for_new_request.notify_all();
					continue;
				}

				let now = Instant::now();
				if now >= deadline { break; }
				let (guard, timeout) = self
					.cv_new_request
					.wait_timeout(g, deadline - now)
					.map_err(|_| ErrorKind::LockPoisoned("request"))?;
				g = guard;
				if timeout.timed_out() { break; }
			}

			drop(g);
			let status = registry.get_current_status()?.unwrap_or_default();
			external.update_status(&status)?;
			Self::report_stats(stats, external)?;
		}
	}

	fn report_stats<CB>(stats: &StatDeltas, external: &CB) -> Result<(), DriveError<CB::Error>>
	where
		CB: PhaseCallback,
	{
		let (items, bytes) = stats.drain_processed();
		if items != 0 || bytes != 0 { external.update_data_processed(items, bytes); }

		let (items, bytes) = stats.drain_total();
		if items != 0 || bytes != 0 { external.update_data_total(items, bytes); }

		Ok(())
	}
}
