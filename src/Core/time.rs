// Monotonic clock and interruptible sleep over raw syscalls.
//
// std::thread::sleep transparently retries EINTR, which would swallow
// the interruptions the engine must observe to resync. nanosleep is
// called directly so an interrupted sleep is a reported outcome.

use std::io;
use std::time::Duration;

use crate::error::EngineError;

/// Outcome of a sleep request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed.
    Completed,
    /// A signal arrived before the duration elapsed.
    Interrupted,
}

/// The engine's view of time: a monotonic timestamp and an
/// interruptible sleep. Implemented by [`SystemClock`] in production
/// and by scripted clocks in tests.
pub trait Clock {
    /// Monotonic timestamp since an arbitrary fixed epoch.
    fn now(&self) -> Result<Duration, EngineError>;

    /// Sleep for `dur`. Interruption is reported, never retried here.
    fn sleep(&self, dur: Duration) -> Result<SleepOutcome, EngineError>;
}

/// CLOCK_MONOTONIC + nanosleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<Duration, EngineError> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return Err(EngineError::Clock(io::Error::last_os_error()));
        }
        Ok(timespec_to_duration(ts))
    }

    fn sleep(&self, dur: Duration) -> Result<SleepOutcome, EngineError> {
        let ts = duration_to_timespec(dur);
        let rc = unsafe { libc::nanosleep(&ts, std::ptr::null_mut()) };
        if rc == 0 {
            return Ok(SleepOutcome::Completed);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            Ok(SleepOutcome::Interrupted)
        } else {
            Err(EngineError::Sleep(err))
        }
    }
}

const NANOS_PER_SEC: i64 = 1_000_000_000;

pub fn timespec_to_duration(ts: libc::timespec) -> Duration {
    Duration::new(ts.tv_sec.max(0) as u64, ts.tv_nsec.clamp(0, NANOS_PER_SEC - 1) as u32)
}

pub fn duration_to_timespec(dur: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: dur.as_secs() as libc::time_t,
        tv_nsec: dur.subsec_nanos() as libc::c_long,
    }
}

/// Fractional seconds to a Duration, whole and sub-second parts split
/// explicitly. The nanosecond part is clamped just below one second so
/// float rounding can never produce an invalid timespec.
///
/// Callers guarantee `secs` is non-negative.
pub fn secs_to_duration(secs: f64) -> Duration {
    let whole = secs.trunc();
    let mut nanos = ((secs - whole) * NANOS_PER_SEC as f64) as i64;
    if nanos >= NANOS_PER_SEC {
        nanos = NANOS_PER_SEC - 1;
    }
    Duration::new(whole as u64, nanos.max(0) as u32)
}
