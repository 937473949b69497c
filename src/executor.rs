//! Mass-parallel execution: bucket a heterogeneous workload by
//! device, run one worker pool per device concurrently, and drive
//! `wait_until_done` on the calling thread until the last device's pool
//! drains.
//!
//! Same crossbeam-unbounded-channel-plus-`thread::scope` technique as
//! the generic `Pool` trait elsewhere in this crate's lineage, just
//! inlined rather than routed through an associated-types trait, since
//! each work item here carries its own heterogeneous closure rather
//! than all items sharing one pool-wide work function.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Local;

use crate::callback::AsyncCallback;
use crate::cancel::CancelToken;
use crate::channel::DriveError;
use crate::config::threads_per_device;
use crate::error::ErrorKind;
use crate::phase::{ErrorInfo, PhaseCallback};

/// Bounds required of a device-bucketing key.  Blanket-implemented for
/// anything that qualifies.
pub trait DeviceKey: Eq + Hash + Clone + Send + Sync + 'static {}
impl<T: Eq + Hash + Clone + Send + Sync + 'static> DeviceKey for T {}

/// A work item's closure, boxed so a single device bucket can hold a
/// heterogeneous mix of them.
pub type WorkFn = Box<dyn FnOnce(ParallelContext<'_>) -> Result<(), anyhow::Error> + Send>;

/// One unit of work, tagged with the device it should run against.
pub struct WorkItem<D>
{
	pub device: D,
	/// Human-readable path/identifier, used only for error messages.
	pub label: String,
	pub work: WorkFn,
}

/// Handed to each work item's closure.
pub struct ParallelContext<'a>
{
	pub callback: &'a AsyncCallback,
	pub status_priority: usize,
	pub label: &'a str,
}

/// Bucket `items` by device (preserving first-seen device order, which
/// becomes each bucket's registry priority), construct a fresh
/// [`AsyncCallback`], run every device's pool concurrently, each with
/// [`crate::config::threads_per_device`] workers pulling from a shared
/// queue, and drive [`AsyncCallback::wait_until_done`] on the calling
/// thread until `notify_all_done` fires after the last device drains.
///
/// An empty workload returns immediately: `notify_all_done` still fires
/// (leaving an `AsyncCallback` that never signals done is a bug, not a
/// valid degenerate case), and no callback methods beyond that are
/// invoked.
///
/// A work item whose closure fails is surfaced to `external` via
/// `report_error` and does not abort its sibling pools; only
/// cancellation (`ErrorKind::StopRequested`) or a hard failure from
/// `external` itself tears down the whole run.
pub fn mass_parallel_execute<D, CB>(
	cancel: CancelToken,
	tick_interval: Duration,
	external: &CB,
	items: Vec<WorkItem<D>>,
) -> Result<(), DriveError<CB::Error>>
where
	D: DeviceKey,
	CB: PhaseCallback,
{
	let callback = AsyncCallback::new(cancel);

	if items.is_empty()
	{
		callback.notify_all_done()?;
		return callback.wait_until_done(tick_interval, external);
	}

	let mut order: Vec<D> = Vec::new();
	let mut buckets: HashMap<D, Vec<(String, WorkFn)>> = HashMap::new();
	for item in items
	{
		buckets.entry(item.device.clone())
			.or_insert_with(|| { order.push(item.device.clone()); Vec::new() })
			.push((item.label, item.work));
	}

	let active_devices = AtomicUsize::new(order.len());
	let callback = &callback;

	let (drive_result, device_results) = std::thread::scope(|s| {
		let mut handles = Vec::new();
		for (priority, device) in order.into_iter().enumerate()
		{
			let device_items = buckets.remove(&device).expect("every ordered device has a bucket");
			let active_devices = &active_devices;
			handles.push(s.spawn(move || -> Result<(), ErrorKind> {
				let result = run_device_pool(callback, priority, device_items);
				if active_devices.fetch_sub(1, Ordering::AcqRel) == 1
				{
					callback.notify_all_done()?;
				}
				result
			}));
		}

		let drive_result = callback.wait_until_done(tick_interval, external);
		if drive_result.is_err()
		{
			// The main thread has stopped draining the rendezvous; a
			// worker blocked in report_error/log_info would otherwise
			// wait forever for a response that will never arrive.
			// Cancel first so joining below actually unwinds them.
			callback.cancel_token().cancel();
		}
		let device_results: Vec<_> = handles.into_iter()
			.map(|h| h.join().expect("device pool thread panicked"))
			.collect();
		(drive_result, device_results)
	});

	if let Err(e) = drive_result { return Err(e); }
	if let Some(e) = device_results.into_iter().find_map(|r| r.err())
	{
		return Err(DriveError::Internal(e));
	}
	Ok(())
}

/// Run one device's worker pool to completion: `threads_per_device()`
/// workers pulling items off a shared unbounded queue, each item
/// registered in the status registry at `priority` only while it runs.
///
/// A per-item closure failure is posted to `callback.report_error` and
/// the pool moves on to the next item; a cancellation observed either
/// from the closure or from `report_error` itself ends this device's
/// pool early (remaining queued items are simply never picked up).
fn run_device_pool(callback: &AsyncCallback, priority: usize, items: Vec<(String, WorkFn)>) -> Result<(), ErrorKind>
{
	let (req_snd, req_rcv) = crossbeam::channel::unbounded::<(String, WorkFn)>();
	let nthreads = threads_per_device().max(1);

	std::thread::scope(|s| -> Result<(), ErrorKind> {
		let mut handles = Vec::new();
		for _ in 0..nthreads
		{
			let reqs = req_rcv.clone();
			handles.push(s.spawn(move || -> Result<(), ErrorKind> {
				worker_loop(callback, priority, &reqs)
			}));
		}
		drop(req_rcv);

		for item in items
		{
			req_snd.send(item).expect("worker channel should still be open");
		}
		drop(req_snd);

		let mut first_err = None;
		for h in handles
		{
			if let Err(e) = h.join().expect("worker thread panicked")
			{
				if first_err.is_none() { first_err = Some(e); }
			}
		}
		match first_err { Some(e) => Err(e), None => Ok(()) }
	})
}

/// Register task-begin for this priority, run the item, always register
/// task-end, per item rather than once for the whole worker lifetime.
fn worker_loop(callback: &AsyncCallback, priority: usize, reqs: &crossbeam::channel::Receiver<(String, WorkFn)>) -> Result<(), ErrorKind>
{
	while let Ok((label, work)) = reqs.recv()
	{
		callback.notify_task_begin(priority)?;
		let ctx = ParallelContext { callback, status_priority: priority, label: &label };
		let outcome = work(ctx);
		callback.notify_task_end()?;

		if let Err(e) = outcome
		{
			match e.downcast::<ErrorKind>()
			{
				Ok(ErrorKind::StopRequested) => break,
				Ok(other) => return Err(other),
				Err(e) =>
				{
					let info = ErrorInfo { message: format!("{label}: {e}"), timestamp: Local::now(), retry_number: 0 };
					match callback.report_error(info)
					{
						Ok(_) => {}
						Err(ErrorKind::StopRequested) => break,
						Err(other) => return Err(other),
					}
				}
			}
		}
	}
	Ok(())
}


#[cfg(test)]
mod tests
{
	use super::*;
	use crate::phase::Response;
	use std::sync::atomic::AtomicI64;
	use std::sync::Mutex;

	#[derive(Debug, thiserror::Error)]
	#[error("test callback failure")]
	struct NeverFails;

	#[derive(Default)]
	struct Recording
	{
		processed_items: AtomicI64,
		errors: Mutex<Vec<String>>,
	}

	impl PhaseCallback for Recording
	{
		type Error = NeverFails;
		fn update_data_processed(&self, items: i64, _bytes: i64) { self.processed_items.fetch_add(items, Ordering::Relaxed); }
		fn update_data_total(&self, _items: i64, _bytes: i64) {}
		fn update_status(&self, _text: &str) -> Result<(), NeverFails> { Ok(()) }
		fn log_info(&self, _text: &str) -> Result<(), NeverFails> { Ok(()) }
		fn report_error(&self, info: &ErrorInfo) -> Result<Response, NeverFails>
		{ self.errors.lock().unwrap().push(info.message.clone()); Ok(Response::Ignore) }
	}

	fn work_item<D>(device: D, label: &str, n: i64) -> WorkItem<D>
	{
		WorkItem {
			device,
			label: label.to_string(),
			work: Box::new(move |ctx| { ctx.callback.update_data_processed(n, 0); Ok(()) }),
		}
	}

	#[test]
	fn empty_workload_notifies_done_immediately()
	{
		let external = Recording::default();
		let items: Vec<WorkItem<i32>> = Vec::new();
		mass_parallel_execute(CancelToken::new(), Duration::from_millis(5), &external, items).unwrap();
		assert_eq!(external.processed_items.load(Ordering::Relaxed), 0);
	}

	#[test]
	fn every_item_runs_across_multiple_device_buckets()
	{
		let external = Recording::default();
		let items = vec![
			work_item("disk0", "a", 1),
			work_item("disk0", "b", 2),
			work_item("disk1", "c", 3),
			work_item("disk1", "d", 4),
			work_item("disk1", "e", 5),
		];

		mass_parallel_execute(CancelToken::new(), Duration::from_millis(5), &external, items).unwrap();

		assert_eq!(external.processed_items.load(Ordering::Relaxed), 1 + 2 + 3 + 4 + 5);
	}

	#[test]
	fn failing_item_is_surfaced_without_aborting_siblings()
	{
		let external = Recording::default();
		let items = vec![
			work_item("a", "ok-1", 1),
			WorkItem {
				device: "a",
				label: "boom".to_string(),
				work: Box::new(|_ctx| anyhow::bail!("domain failure")),
			},
			work_item("b", "ok-2", 2),
		];

		mass_parallel_execute(CancelToken::new(), Duration::from_millis(5), &external, items).unwrap();

		assert_eq!(external.processed_items.load(Ordering::Relaxed), 1 + 2);
		assert_eq!(*external.errors.lock().unwrap(), vec!["boom: domain failure".to_string()]);
	}

	#[derive(Debug, thiserror::Error)]
	#[error("callback blew up")]
	struct Boom;

	#[derive(Default)]
	struct FailsOnError;

	impl PhaseCallback for FailsOnError
	{
		type Error = Boom;
		fn update_data_processed(&self, _items: i64, _bytes: i64) {}
		fn update_data_total(&self, _items: i64, _bytes: i64) {}
		fn update_status(&self, _text: &str) -> Result<(), Boom> { Ok(()) }
		fn log_info(&self, _text: &str) -> Result<(), Boom> { Ok(()) }
		fn report_error(&self, _info: &ErrorInfo) -> Result<Response, Boom> { Err(Boom) }
	}

	#[test]
	fn callback_failure_mid_run_unblocks_waiting_workers_instead_of_hanging()
	{
		// The item's report_error call blocks on a response that the
		// drive loop never produces, since external itself fails while
		// producing it. Without cancelling on that failure this call
		// never returns; it would hang the test instead of completing.
		let external = FailsOnError::default();
		let items = vec![WorkItem {
			device: "a",
			label: "boom".to_string(),
			work: Box::new(|_ctx| anyhow::bail!("domain failure")),
		}];

		let result = mass_parallel_execute(CancelToken::new(), Duration::from_millis(5), &external, items);
		assert!(matches!(result, Err(DriveError::Callback(Boom))));
	}
}
