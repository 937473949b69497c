//! Lock-free pending-delta counters.
//!
//! These are deltas not yet handed to the external callback, not
//! totals.  The main thread "drains" them: read the current value, add
//! its negation back, forward the original value on.  That's two
//! atomic steps, not a store of zero, so a worker racing the drain
//! never loses an increment.
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct StatDeltas
{
	items_processed_delta: AtomicI64,
	bytes_processed_delta: AtomicI64,
	items_total_delta: AtomicI64,
	bytes_total_delta: AtomicI64,
}

impl StatDeltas
{
	/// Record that `items_delta`/`bytes_delta` more (or fewer, if
	/// negative) items/bytes have been processed.  Never fails.
	pub(crate) fn update_data_processed(&self, items_delta: i64, bytes_delta: i64)
	{
		self.items_processed_delta.fetch_add(items_delta, Ordering::Relaxed);
		self.bytes_processed_delta.fetch_add(bytes_delta, Ordering::Relaxed);
	}

	/// Record a change (up or down) in the total workload estimate.
	/// Never fails.
	pub(crate) fn update_data_total(&self, items_delta: i64, bytes_delta: i64)
	{
		self.items_total_delta.fetch_add(items_delta, Ordering::Relaxed);
		self.bytes_total_delta.fetch_add(bytes_delta, Ordering::Relaxed);
	}

	/// Drain a single counter: read it, then atomically subtract what we
	/// read back out, and hand back what we saw.  Concurrent adders in
	/// the gap between the read and the subtract just end up reflected
	/// in the *next* drain instead of this one; nothing is lost.
	fn drain_one(counter: &AtomicI64) -> i64
	{
		let seen = counter.load(Ordering::Relaxed);
		counter.fetch_add(-seen, Ordering::Relaxed);
		seen
	}

	/// Drain the processed-items/processed-bytes pair.
	pub(crate) fn drain_processed(&self) -> (i64, i64)
	{
		(Self::drain_one(&self.items_processed_delta), Self::drain_one(&self.bytes_processed_delta))
	}

	/// Drain the total-items/total-bytes pair.
	pub(crate) fn drain_total(&self) -> (i64, i64)
	{
		(Self::drain_one(&self.items_total_delta), Self::drain_one(&self.bytes_total_delta))
	}
}


#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn drain_collapses_multiple_updates_and_resets_to_zero()
	{
		let deltas = StatDeltas::default();
		deltas.update_data_processed(3, 100);
		deltas.update_data_processed(2, 50);

		assert_eq!(deltas.drain_processed(), (5, 150));
		// Second drain sees nothing outstanding.
		assert_eq!(deltas.drain_processed(), (0, 0));
	}

	#[test]
	fn negative_deltas_are_supported()
	{
		let deltas = StatDeltas::default();
		deltas.update_data_total(10, 1000);
		deltas.update_data_total(-3, -200);

		assert_eq!(deltas.drain_total(), (7, 800));
	}

	#[test]
	fn concurrent_increment_during_drain_is_not_lost()
	{
		use std::sync::Arc;

		let deltas = Arc::new(StatDeltas::default());
		deltas.update_data_processed(1, 10);

		// Simulate the "drain reads, then a worker races in" case by
		// hand: the two-step drain means any add between the read and
		// the fetch_add-negate still nets out correctly on the *next*
		// drain.
		let seen = StatDeltas::drain_one(&deltas.items_processed_delta);
		assert_eq!(seen, 1);
		deltas.update_data_processed(4, 0);
		assert_eq!(deltas.drain_processed(), (4, 10));
	}
}
