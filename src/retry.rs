//! Retry/ignore loop: run a fallible action, and on failure let
//! the phase callback decide whether to retry it or give up on this one
//! item and move on.
use chrono::Local;

use crate::callback::AsyncCallback;
use crate::error::ErrorKind;
use crate::phase::{ErrorInfo, Response};

/// How `try_reporting` finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T>
{
	/// `action` eventually succeeded.
	Succeeded(T),
	/// The phase callback chose to ignore the error; the item should be
	/// treated as skipped, not as succeeded.  Carries the message of the
	/// failure that was ignored, so the caller can log it.
	Ignored(String),
}

/// Run `action` in a loop, reporting each failure through `callback` and
/// obeying the resulting retry/ignore decision.  No implicit retry cap:
/// the phase callback decides every time.
///
/// `Err(_)` means cancellation was observed, either directly from
/// `action` or while posting the error to `callback`; it bypasses
/// `report_error` entirely and propagates unchanged.
pub fn try_reporting<T, E, F>(callback: &AsyncCallback, mut action: F) -> Result<Outcome<T>, ErrorKind>
where
	F: FnMut() -> Result<T, E>,
	E: std::fmt::Display,
{
	let mut retry_number = 0;
	loop
	{
		match action()
		{
			Ok(value) => return Ok(Outcome::Succeeded(value)),
			Err(err) =>
			{
				let message = err.to_string();
				let info = ErrorInfo { message: message.clone(), timestamp: Local::now(), retry_number };
				match callback.report_error(info)?
				{
					Response::Retry => { retry_number += 1; }
					Response::Ignore => return Ok(Outcome::Ignored(message)),
				}
			}
		}
	}
}


#[cfg(test)]
mod tests
{
	use super::*;
	use crate::cancel::CancelToken;
	use crate::phase::PhaseCallback;
	use std::cell::Cell;
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	#[derive(Debug, thiserror::Error)]
	#[error("test callback failure")]
	struct NeverFails;

	struct FixedResponse
	{
		response: Response,
		retry_numbers_seen: Mutex<Vec<u32>>,
	}

	impl PhaseCallback for FixedResponse
	{
		type Error = NeverFails;
		fn update_data_processed(&self, _items: i64, _bytes: i64) {}
		fn update_data_total(&self, _items: i64, _bytes: i64) {}
		fn update_status(&self, _text: &str) -> Result<(), NeverFails> { Ok(()) }
		fn log_info(&self, _text: &str) -> Result<(), NeverFails> { Ok(()) }
		fn report_error(&self, info: &ErrorInfo) -> Result<Response, NeverFails>
		{
			self.retry_numbers_seen.lock().unwrap().push(info.retry_number);
			Ok(self.response)
		}
	}

	fn drive(cb: Arc<AsyncCallback>, external: Arc<FixedResponse>) -> std::thread::JoinHandle<()>
	{
		std::thread::spawn(move || {
			cb.wait_until_done(Duration::from_millis(5), external.as_ref()).unwrap();
		})
	}

	#[test]
	fn s2_retry_eventually_succeeds_after_transient_failures()
	{
		let cb = Arc::new(AsyncCallback::new(CancelToken::new()));
		let external = Arc::new(FixedResponse { response: Response::Retry, retry_numbers_seen: Mutex::new(Vec::new()) });
		let handle = drive(cb.clone(), external.clone());

		let attempts = Cell::new(0);
		let result = try_reporting(&cb, || {
			attempts.set(attempts.get() + 1);
			if attempts.get() < 3 { Err("X") } else { Ok(42) }
		});

		cb.notify_all_done().unwrap();
		handle.join().unwrap();

		assert_eq!(result.unwrap(), Outcome::Succeeded(42));
		assert_eq!(attempts.get(), 3);
		assert_eq!(*external.retry_numbers_seen.lock().unwrap(), vec![0, 1]);
	}

	#[test]
	fn s3_ignore_gives_up_and_returns_the_message_without_reinvoking()
	{
		let cb = Arc::new(AsyncCallback::new(CancelToken::new()));
		let external = Arc::new(FixedResponse { response: Response::Ignore, retry_numbers_seen: Mutex::new(Vec::new()) });
		let handle = drive(cb.clone(), external.clone());

		let attempts = Cell::new(0);
		let result = try_reporting(&cb, || {
			attempts.set(attempts.get() + 1);
			Err::<i32, _>("X")
		});

		cb.notify_all_done().unwrap();
		handle.join().unwrap();

		assert_eq!(result.unwrap(), Outcome::Ignored("X".to_string()));
		assert_eq!(attempts.get(), 1, "work function must not be re-invoked after ignore");
	}
}
