//! Tuning knobs for the reporting layer and for the mass-parallel
//! executor's per-device concurrency.
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Thresholds governing the percent/ETA reporter's display hysteresis
/// and the UI tick rate.
#[derive(Debug, Clone)]
#[derive(derivative::Derivative)]
#[derivative(Default)]
pub struct ReporterTuning
{
	/// Minimum elapsed time before percent display is even considered.
	#[derivative(Default(value="Duration::from_secs(2)"))]
	pub delay: Duration,

	/// Minimum estimated remaining duration required to latch percent
	/// display; transfers that would finish before this never show one.
	#[derivative(Default(value="Duration::from_secs(3)"))]
	pub min_duration: Duration,

	/// Lower bound on how often the displayed percent should visibly
	/// tick over across the whole transfer, used to pick decimal
	/// precision.
	#[derivative(Default(value="2"))]
	pub min_changes_per_sec: u32,

	/// Width of the sliding window used to estimate current throughput.
	#[derivative(Default(value="Duration::from_secs(10)"))]
	pub speed_window: Duration,

	/// The ambient UI tick interval; status-string refreshes happen at
	/// half this rate (see [`Self::ui_refresh_interval`]).
	#[derivative(Default(value="Duration::from_millis(100)"))]
	pub ui_tick: Duration,
}

impl ReporterTuning
{
	/// Minimum spacing between successive status-string refreshes: half
	/// the ambient UI tick.
	pub fn ui_refresh_interval(&self) -> Duration { self.ui_tick / 2 }
}


// Per-device worker count for the mass-parallel executor.  Like the
// teacher's job-count globals, this is config/CLI-adjacent knowledge
// that's often a long way from where pools get spun up, so it lives
// here as a small atomic rather than threaded through every call site.
// Defaults to 1 to match the one-worker-per-device serialization the
// spec calls for; callers may raise it for a device that tolerates
// concurrent I/O.
static THREADS_PER_DEVICE: AtomicU32 = AtomicU32::new(1);

/// How many worker threads the executor spins up per device bucket.
pub fn threads_per_device() -> u32 { THREADS_PER_DEVICE.load(Ordering::Relaxed) }

/// Change the per-device worker count.  Takes effect for devices whose
/// pool hasn't started yet; expected to be called once up-front.
pub fn set_threads_per_device(n: u32) { THREADS_PER_DEVICE.store(n.max(1), Ordering::Relaxed); }


#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn default_tuning_matches_worked_examples()
	{
		let t = ReporterTuning::default();
		assert_eq!(t.delay, Duration::from_secs(2));
		assert_eq!(t.min_duration, Duration::from_secs(3));
		assert_eq!(t.min_changes_per_sec, 2);
		assert_eq!(t.speed_window, Duration::from_secs(10));
		assert_eq!(t.ui_refresh_interval(), Duration::from_millis(50));
	}

	#[test]
	fn threads_per_device_defaults_to_one_and_floors_at_one()
	{
		assert_eq!(threads_per_device(), 1);
		set_threads_per_device(8);
		assert_eq!(threads_per_device(), 8);
		set_threads_per_device(0);
		assert_eq!(threads_per_device(), 1);
		// restore default for any later test in this process
		set_threads_per_device(1);
	}
}
