//! Cooperative-unlock helper: a serialization point that lets a
//! worker release its section of a shared critical region for the
//! duration of a slow, uninteresting operation (e.g. waiting on another
//! thread), then reacquires before returning to its own critical work.
use std::mem;
use std::sync::{Mutex, MutexGuard};

/// A point of mutual exclusion that workers can voluntarily drop out of
/// and back into around a specific operation, rather than holding the
/// lock across it.
#[derive(Debug, Default)]
pub struct SerializationPoint
{
	mutex: Mutex<()>,
}

impl SerializationPoint
{
	pub fn new() -> Self { Self::default() }

	/// Acquire the point, same as locking the underlying mutex directly.
	pub fn lock(&self) -> MutexGuard<'_, ()>
	{
		self.mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Run `body` with `guard` released, then reacquire before
	/// returning its result.  If `body` panics, the reacquired guard is
	/// leaked (never dropped) rather than risking a double-unlock or
	/// silently swallowing the unwind: the panic still propagates, and
	/// whatever owns the serialization point is left locked.
	pub fn run_unlocked<'a, T>(&'a self, guard: MutexGuard<'a, ()>, body: impl FnOnce() -> T) -> (MutexGuard<'a, ()>, T)
	{
		drop(guard);

		struct RelockGuard<'a>
		{
			point: &'a SerializationPoint,
			relock_on_drop: bool,
		}

		impl Drop for RelockGuard<'_>
		{
			fn drop(&mut self)
			{
				if self.relock_on_drop
				{
					let guard = self.point.lock();
					mem::forget(guard);
				}
			}
		}

		let relock = RelockGuard { point: self, relock_on_drop: true };
		let result = body();
		let mut relock = relock;
		relock.relock_on_drop = false;
		drop(relock);

		(self.lock(), result)
	}
}
