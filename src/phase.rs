//! The external phase callback: the concrete user-facing observer
//! this core reports to.  Owned and implemented outside this crate.
use chrono::{DateTime, Local};

/// One error a work item hit, handed to the phase callback for a
/// retry/ignore decision.
#[derive(Debug, Clone)]
pub struct ErrorInfo
{
	/// Human-readable description of what went wrong.
	pub message: String,

	/// When the error was raised.
	pub timestamp: DateTime<Local>,

	/// How many times this same action has already been retried.
	pub retry_number: u32,
}

/// The phase callback's decision on a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response
{
	/// Log it and move on.
	Ignore,
	/// Run the action again.
	Retry,
}

/// The user-facing observer: UI, logger, whatever the enclosing
/// application wants to do with progress and errors.  Implemented
/// entirely outside this crate; this core only ever calls it from the
/// main thread inside [`crate::AsyncCallback::wait_until_done`].
pub trait PhaseCallback
{
	/// The error type callback methods may fail with, to abort the run.
	type Error: std::error::Error + Send + Sync + 'static;

	/// Purely additive; cannot fail.
	fn update_data_processed(&self, items: i64, bytes: i64);

	/// Purely additive; delta may be negative; cannot fail.
	fn update_data_total(&self, items: i64, bytes: i64);

	/// May fail/raise to abort the run.
	fn update_status(&self, text: &str) -> Result<(), Self::Error>;

	/// May fail/raise to abort the run.
	fn log_info(&self, text: &str) -> Result<(), Self::Error>;

	/// May fail/raise to abort the run; otherwise returns the user's
	/// retry/ignore decision.
	fn report_error(&self, info: &ErrorInfo) -> Result<Response, Self::Error>;
}
