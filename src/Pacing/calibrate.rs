// Startup measurement of the host's reliable sleep resolution.

use std::time::Duration;

use crate::error::EngineError;
use crate::Core::time::{Clock, SleepOutcome};

/// The minimum sleep worth attempting, in seconds. Sleeps shorter than
/// this are skipped outright: the host scheduler cannot honor them
/// reliably, and the resulting over/undersleep jitter would defeat the
/// limiter's accuracy.
///
/// Computed once at startup, read-only thereafter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncThreshold(f64);

impl SyncThreshold {
    pub fn seconds(self) -> f64 {
        self.0
    }
}

/// Smallest sleep the interface can express.
const PROBE: Duration = Duration::from_nanos(1);

/// Lower bound keeping the threshold strictly positive on hosts whose
/// clock cannot resolve the probe at all.
const MIN_THRESHOLD_SECS: f64 = 1e-9;

/// Measure the sleep-resolution floor: request the smallest
/// representable sleep twice, timing the actual elapsed interval
/// around each, then take the average of the two samples over three
/// as a safety margin.
///
/// A failing clock read or sleep is fatal. An interrupted probe is
/// re-measured from a fresh clock read so the sample stays honest.
pub fn calibrate<C: Clock>(clock: &C) -> Result<SyncThreshold, EngineError> {
    let first = sample(clock)?;
    let second = sample(clock)?;

    let average = (first + second).as_secs_f64() / 2.0;
    let threshold = average / 3.0;

    Ok(SyncThreshold(threshold.max(MIN_THRESHOLD_SECS)))
}

fn sample<C: Clock>(clock: &C) -> Result<Duration, EngineError> {
    loop {
        let before = clock.now()?;
        if clock.sleep(PROBE)? == SleepOutcome::Interrupted {
            continue;
        }
        let after = clock.now()?;
        return Ok(after.saturating_sub(before));
    }
}
