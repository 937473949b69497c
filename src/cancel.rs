//! Cooperative cancellation handle shared between the enclosing
//! application and every worker thread this core drives.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ErrorKind;

/// A cloneable "please stop" flag.  Checked at every interruption
/// checkpoint (`log_info`, `report_error`, `update_status`, and the
/// waits backing the first two); never checked inside `report_delta` or
/// the `update_data_*` calls, which never suspend.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken
{
	/// A fresh, not-yet-cancelled token.
	pub fn new() -> Self { Self::default() }

	/// Request cancellation.  Idempotent.
	pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

	/// Has cancellation been requested?
	pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }

	/// The checkpoint helper: `Err(StopRequested)` once cancelled,
	/// `Ok(())` otherwise.
	pub fn check(&self) -> Result<(), ErrorKind>
	{
		if self.is_cancelled() { Err(ErrorKind::StopRequested) } else { Ok(()) }
	}
}


#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn starts_uncancelled()
	{
		let tok = CancelToken::new();
		assert!(!tok.is_cancelled());
		assert!(tok.check().is_ok());
	}

	#[test]
	fn cancel_is_observed_through_clones()
	{
		let tok = CancelToken::new();
		let clone = tok.clone();
		clone.cancel();
		assert!(tok.is_cancelled());
		assert!(matches!(tok.check(), Err(ErrorKind::StopRequested)));
	}

	#[test]
	fn cancel_is_idempotent()
	{
		let tok = CancelToken::new();
		tok.cancel();
		tok.cancel();
		assert!(tok.is_cancelled());
	}
}
