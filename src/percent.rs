//! Debounced, hysteretic percent/ETA formatter, built on top of
//! the Item Stat Reporter.
//!
//! Deciding *whether* to show a percentage at all is the interesting
//! part here: tiny or unknown-duration transfers never latch it, so the
//! UI doesn't flicker a number that's meaningless for half a second.
use std::collections::VecDeque;
use std::time::Instant;

use crate::callback::AsyncCallback;
use crate::config::ReporterTuning;
use crate::error::ErrorKind;
use crate::item::ItemStatReporter;

/// Wraps a single-item [`ItemStatReporter`] (`items_expected = 1`) with
/// the hysteretic percent/throughput display logic.
pub struct PercentReporter<'a>
{
	item: ItemStatReporter<'a>,
	callback: &'a AsyncCallback,
	tuning: ReporterTuning,
	bytes_copied: i64,
	start_time: Option<Instant>,
	show_percent: bool,
	last_refresh: Instant,
	samples: VecDeque<(Instant, i64)>,
}

impl<'a> PercentReporter<'a>
{
	/// Start tracking a single work item expected to take
	/// `bytes_expected` bytes.
	pub fn new(callback: &'a AsyncCallback, bytes_expected: i64, tuning: ReporterTuning) -> Self
	{
		Self {
			item: ItemStatReporter::new(callback, 1, bytes_expected),
			callback,
			tuning,
			bytes_copied: 0,
			start_time: None,
			show_percent: false,
			last_refresh: Instant::now(),
			samples: VecDeque::new(),
		}
	}

	/// Report `items`/`bytes` of progress.  Forwards to the underlying
	/// item reporter, then, at most every `ui_refresh_interval`, may
	/// latch on percent display or push an updated status string.
	/// Propagates cancellation from the status update, same as
	/// [`AsyncCallback::update_status`].
	pub fn report_delta(&mut self, items: i64, bytes: i64) -> Result<(), ErrorKind>
	{
		self.item.report_delta(items, bytes);
		self.bytes_copied += bytes;

		let now = Instant::now();
		if now.duration_since(self.last_refresh) < self.tuning.ui_refresh_interval()
		{
			return Ok(());
		}
		self.last_refresh = now;

		if !self.show_percent
		{
			self.maybe_latch_percent(now);
			return Ok(());
		}

		self.push_sample(now, self.bytes_copied);
		if let Some(status) = self.format_status()
		{
			self.callback.update_status(status)?;
		}
		Ok(())
	}

	/// Consume the reporter on the happy path; delegates to the
	/// underlying item reporter's normal-exit reconciliation.
	pub fn mark_success(self) { self.item.mark_success(); }

	fn maybe_latch_percent(&mut self, now: Instant)
	{
		if self.start_time.is_none() && self.bytes_copied > 0
		{
			self.start_time = Some(now);
			self.push_sample(now, 0);
		}

		let Some(start) = self.start_time else { return; };
		if now.duration_since(start) < self.tuning.delay { return; }

		self.push_sample(now, self.bytes_copied);
		let Some(remaining) = self.remaining_seconds() else { return; };

		if remaining > self.tuning.min_duration.as_secs_f64()
		{
			self.show_percent = true;
			// Discard warm-up noise from the delay window.
			self.samples.clear();
			self.push_sample(now, self.bytes_copied);
		}
	}

	fn push_sample(&mut self, now: Instant, bytes: i64)
	{
		self.samples.push_back((now, bytes));
		while let Some(&(t, _)) = self.samples.front()
		{
			if now.duration_since(t) > self.tuning.speed_window { self.samples.pop_front(); }
			else { break; }
		}
	}

	/// Bytes/sec estimated over the sliding sample window, or `None` if
	/// there aren't yet two distinct samples to compare.
	fn current_rate(&self) -> Option<f64>
	{
		let (t0, b0) = *self.samples.front()?;
		let (t1, b1) = *self.samples.back()?;
		let dt = t1.duration_since(t0).as_secs_f64();
		if dt <= 0.0 { return None; }
		Some((b1 - b0) as f64 / dt)
	}

	fn remaining_seconds(&self) -> Option<f64>
	{
		let rate = self.current_rate()?;
		if rate <= 0.0 { return None; }
		let remaining_bytes = (self.item.bytes_expected() - self.bytes_copied).max(0) as f64;
		Some(remaining_bytes / rate)
	}

	/// Decimal precision such that, at the current throughput, the
	/// displayed percent would tick over at least `MIN_CHANGES_PER_SEC`
	/// times across the whole transfer.
	fn choose_precision(&self, rate: f64) -> usize
	{
		if rate <= 0.0 { return 0; }
		let total_duration_secs = self.item.bytes_expected() as f64 / rate;
		let total_steps = total_duration_secs * self.tuning.min_changes_per_sec as f64;

		if total_steps <= 100.0 { 0 }
		else if total_steps <= 1_000.0 { 1 }
		else if total_steps <= 10_000.0 { 2 }
		else { 3 }
	}

	fn format_status(&self) -> Option<String>
	{
		let rate = self.current_rate()?;
		let precision = self.choose_precision(rate);
		let expected = self.item.bytes_expected().max(1) as f64;
		let fraction = (self.bytes_copied as f64 / expected).min(1.0);
		let percent = fraction * 100.0;
		Some(format!("{percent:.precision$}%, {}/s", format_bytes(rate)))
	}
}

/// Coarse human-readable byte-rate formatting; not locale-aware (that's
/// the phase callback's job if it wants one).
fn format_bytes(bytes_per_sec: f64) -> String
{
	const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
	let mut value = bytes_per_sec.max(0.0);
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1
	{
		value /= 1024.0;
		unit += 1;
	}
	format!("{value:.1} {}", UNITS[unit])
}
