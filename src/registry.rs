//! Per-thread status registry: priority-ordered buckets of
//! per-worker status text.
//!
//! A hashmap keyed by thread id would be the obvious choice, but it
//! loses the priority ordering `get_current_status` needs to pick a
//! representative message.  Buckets-of-entries plus a linear scan is
//! fine at the thread counts this core actually sees.
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use crate::error::ErrorKind;

#[derive(Debug, Clone)]
struct ThreadStatus
{
	thread_id: ThreadId,
	status_msg: String,
}

#[derive(Debug, Default)]
struct Buckets
{
	buckets: Vec<Vec<ThreadStatus>>,
}

#[derive(Debug, Default)]
pub(crate) struct StatusRegistry
{
	state: Mutex<Buckets>,
}

impl StatusRegistry
{
	fn lock(&self) -> Result<std::sync::MutexGuard<'_, Buckets>, ErrorKind>
	{
		self.state.lock().map_err(|_| ErrorKind::LockPoisoned("status"))
	}

	/// Register the current thread as active at `priority`.
	pub(crate) fn notify_task_begin(&self, priority: usize) -> Result<(), ErrorKind>
	{
		let mut g = self.lock()?;
		if g.buckets.len() <= priority
		{
			g.buckets.resize_with(priority + 1, Vec::new);
		}
		g.buckets[priority].push(ThreadStatus {
			thread_id: thread::current().id(),
			status_msg: String::new(),
		});
		Ok(())
	}

	/// Remove the current thread's entry.  Asserts it was present: a
	/// task-end with no matching task-begin is a defect in the caller.
	pub(crate) fn notify_task_end(&self) -> Result<(), ErrorKind>
	{
		let id = thread::current().id();
		let mut g = self.lock()?;
		for bucket in g.buckets.iter_mut()
		{
			if let Some(pos) = bucket.iter().position(|t| t.thread_id == id)
			{
				bucket.swap_remove(pos);
				return Ok(());
			}
		}
		panic!("notify_task_end: no registered status entry for current thread");
	}

	/// Overwrite the current thread's status message.  If there's no
	/// entry (raced with task-end), silently drop it: a lossy status
	/// string isn't worth a registration dance to avoid.
	pub(crate) fn update_status(&self, msg: impl Into<String>) -> Result<(), ErrorKind>
	{
		let id = thread::current().id();
		let mut g = self.lock()?;
		for bucket in g.buckets.iter_mut()
		{
			if let Some(entry) = bucket.iter_mut().find(|t| t.thread_id == id)
			{
				entry.status_msg = msg.into();
				return Ok(());
			}
		}
		Ok(())
	}

	/// A representative status line for the main thread's UI tick: the
	/// first non-empty status message found scanning buckets in priority
	/// order, prefixed with a thread-count marker if more than one
	/// bucket is active.
	pub(crate) fn get_current_status(&self) -> Result<Option<String>, ErrorKind>
	{
		let g = self.lock()?;
		let parallel_ops = g.buckets.iter().filter(|b| !b.is_empty()).count();
		let Some(first) = g.buckets.iter().flatten().find(|t| !t.status_msg.is_empty()) else { return Ok(None); };

		let msg = if parallel_ops >= 2
		{
			format!("[{parallel_ops} threads] {}", first.status_msg)
		}
		else
		{
			first.status_msg.clone()
		};
		Ok(Some(msg))
	}

	/// True iff every bucket is empty; used to assert task-registration
	/// balance after a run completes.
	#[cfg(test)]
	pub(crate) fn is_empty(&self) -> bool
	{
		self.state.lock().unwrap().buckets.iter().all(|b| b.is_empty())
	}
}


#[cfg(test)]
mod tests
{
	use super::*;
	use std::sync::Arc;

	#[test]
	fn begin_end_balance_leaves_registry_empty()
	{
		let reg = StatusRegistry::default();
		reg.notify_task_begin(0).unwrap();
		reg.update_status("working").unwrap();
		reg.notify_task_end().unwrap();
		assert!(reg.is_empty());
	}

	#[test]
	fn status_missing_after_end_is_silently_dropped()
	{
		let reg = StatusRegistry::default();
		reg.notify_task_begin(0).unwrap();
		reg.notify_task_end().unwrap();
		// No entry for this thread any more; must not panic or error.
		reg.update_status("too late").unwrap();
	}

	#[test]
	fn current_status_prefers_lower_priority_bucket()
	{
		let reg = Arc::new(StatusRegistry::default());
		let reg2 = reg.clone();
		let t = std::thread::spawn(move || {
			reg2.notify_task_begin(1).unwrap();
			reg2.update_status("background").unwrap();
			std::thread::park();
			reg2.notify_task_end().unwrap();
		});

		// Give the spawned thread a moment to register; poll rather
		// than sleep-and-hope.
		while reg.get_current_status().unwrap().is_none()
		{
			std::thread::yield_now();
		}

		reg.notify_task_begin(0).unwrap();
		reg.update_status("foreground").unwrap();

		let status = reg.get_current_status().unwrap().unwrap();
		assert!(status.contains("foreground"), "status was {status:?}");
		assert!(status.starts_with("[2 threads]"), "status was {status:?}");

		reg.notify_task_end().unwrap();
		t.thread().unpark();
		t.join().unwrap();
		assert!(reg.is_empty());
	}
}
