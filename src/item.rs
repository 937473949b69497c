//! Scoped per-work-item reconciliation.
//!
//! Rather than track an ambient "exception depth" counter, this guard
//! defaults to "abnormal" and has to be explicitly told it succeeded;
//! if it's dropped without that mark, whether from an early `?` return
//! or a panic unwind, the abnormal reconciliation runs.
use crate::callback::AsyncCallback;

/// A scope guard covering one work item's expected-vs-actual workload
/// reconciliation.  Create it with the item's estimated size, report
/// progress against it as work happens, then consume it with
/// [`ItemStatReporter::mark_success`] on the happy path.  Dropping it
/// without that call (including via `?` or a panic) reconciles as a
/// failure instead.
pub struct ItemStatReporter<'a>
{
	callback: &'a AsyncCallback,
	items_expected: i64,
	bytes_expected: i64,
	items_reported: i64,
	bytes_reported: i64,
	success: bool,
}

impl<'a> ItemStatReporter<'a>
{
	/// Start tracking one work item expected to contribute
	/// `items_expected` items and `bytes_expected` bytes to the total.
	pub fn new(callback: &'a AsyncCallback, items_expected: i64, bytes_expected: i64) -> Self
	{
		Self {
			callback,
			items_expected,
			bytes_expected,
			items_reported: 0,
			bytes_reported: 0,
			success: false,
		}
	}

	/// Report `items`/`bytes` worth of progress.  Forwards straight to
	/// `update_data_processed`; any excess over what was expected also
	/// grows the external total (so the UI fraction never exceeds
	/// 100%), and the local accumulator is clamped at the expected
	/// value.
	pub fn report_delta(&mut self, items: i64, bytes: i64)
	{
		self.callback.update_data_processed(items, bytes);

		self.items_reported += items;
		if self.items_reported > self.items_expected
		{
			let excess = self.items_reported - self.items_expected;
			self.callback.update_data_total(excess, 0);
			self.items_reported = self.items_expected;
		}

		self.bytes_reported += bytes;
		if self.bytes_reported > self.bytes_expected
		{
			let excess = self.bytes_reported - self.bytes_expected;
			self.callback.update_data_total(0, excess);
			self.bytes_reported = self.bytes_expected;
		}
	}

	/// Items reported so far (clamped at `items_expected`).
	pub fn items_reported(&self) -> i64 { self.items_reported }

	/// Bytes reported so far (clamped at `bytes_expected`).
	pub fn bytes_reported(&self) -> i64 { self.bytes_reported }

	/// Bytes originally expected for this item.
	pub fn bytes_expected(&self) -> i64 { self.bytes_expected }

	/// Mark the happy path reached: on drop, the total will be corrected
	/// by `reported - expected` (which may shrink it) rather than grown
	/// by the full reported amount.
	pub fn mark_success(mut self)
	{
		self.success = true;
		// Falls through to Drop, which now takes the success branch.
	}
}

impl Drop for ItemStatReporter<'_>
{
	fn drop(&mut self)
	{
		if self.success
		{
			let item_delta = self.items_reported - self.items_expected;
			let byte_delta = self.bytes_reported - self.bytes_expected;
			if item_delta != 0 || byte_delta != 0
			{
				self.callback.update_data_total(item_delta, byte_delta);
			}
		}
		else if self.items_reported != 0 || self.bytes_reported != 0
		{
			self.callback.update_data_total(self.items_reported, self.bytes_reported);
		}
	}
}
