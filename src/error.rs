//! Error kinds owned by this crate.
//!
//! Everything else (I/O failures, domain failures from a work item) is
//! the caller's own error type, boxed to [`anyhow::Error`] at whatever
//! boundary needs one.

/// Failure modes internal to the reporting core itself.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind
{
	/// Cooperative cancellation: some [`crate::CancelToken`] this
	/// operation was watching got cancelled.  Returned from any
	/// interruptible wait or checkpoint.
	#[error("operation cancelled")]
	StopRequested,

	/// A lock this crate owns was found poisoned (a prior holder
	/// panicked while holding it).  We don't try to paper over this with
	/// `into_inner()`; the request slots or registry buckets may be in
	/// an indeterminate state, so the defect is surfaced instead.
	#[error("internal {0} lock poisoned")]
	LockPoisoned(&'static str),
}
