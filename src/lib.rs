//! Concurrent progress-and-error reporting core
//!
//! Sits between parallel I/O worker threads and a single phase-callback
//! observer owned by the caller.  Workers report progress, status, and
//! errors through a shared [`AsyncCallback`]; the caller drives
//! [`AsyncCallback::wait_until_done`] on one thread to forward all of it
//! to its [`PhaseCallback`] impl.

// Cancellation signal shared between the driving thread and every worker.
pub mod cancel;

// Leaf error types.
pub mod error;

// Lock-free delta counters for processed/total items and bytes.
mod stats;

// Priority-ordered per-thread status text registry.
mod registry;

// Mutex+Condvar rendezvous for log-info and error requests.
mod channel;

// The user-implemented observer this core reports to.
pub mod phase;

// The facade workers hold a reference to and the main thread drives.
pub mod callback;

// Per-work-item expected-vs-actual reconciliation scope guard.
pub mod item;

// Hysteretic percent/ETA display built on top of item.
pub mod percent;

// Retry/ignore loop around a fallible action.
pub mod retry;

// Device-bucketed mass-parallel executor.
pub mod executor;

// Reporting and executor tuning knobs.
pub mod config;

// Cooperative-unlock helper for shared critical regions.
pub mod unlock;

pub use callback::AsyncCallback;
pub use cancel::CancelToken;
pub use error::ErrorKind;
pub use channel::DriveError;
pub use executor::{mass_parallel_execute, DeviceKey, ParallelContext, WorkItem};
pub use item::ItemStatReporter;
pub use percent::PercentReporter;
pub use phase::{ErrorInfo, PhaseCallback, Response};
pub use retry::{try_reporting, Outcome};
pub use config::ReporterTuning;
