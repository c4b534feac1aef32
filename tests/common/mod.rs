// Scripted clock for driving the engine without real time.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use pacepipe::error::EngineError;
use pacepipe::Core::time::{Clock, SleepOutcome};
use pacepipe::Core::SignalBridge;

/// How a scripted sleep behaves. Unscripted sleeps complete and
/// advance the clock by exactly the requested duration.
pub enum ScriptedSleep {
    Complete,
    /// Report interruption after only part of the request has passed.
    InterruptAfter(Duration),
}

#[derive(Default)]
struct State {
    now: Duration,
    sleeps: Vec<Duration>,
    script: VecDeque<ScriptedSleep>,
}

/// Deterministic clock: `sleep` advances virtual time instead of
/// waiting, and every request is recorded for assertions. Clones share
/// state so a test keeps a handle after the engine takes ownership.
#[derive(Clone, Default)]
pub struct FakeClock {
    state: Rc<RefCell<State>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_secs(&self) -> f64 {
        self.state.borrow().now.as_secs_f64()
    }

    /// Every sleep requested so far, calibration probes included.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }

    pub fn push_script(&self, entry: ScriptedSleep) {
        self.state.borrow_mut().script.push_back(entry);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Result<Duration, EngineError> {
        Ok(self.state.borrow().now)
    }

    fn sleep(&self, dur: Duration) -> Result<SleepOutcome, EngineError> {
        let mut state = self.state.borrow_mut();
        state.sleeps.push(dur);
        match state.script.pop_front() {
            Some(ScriptedSleep::InterruptAfter(partial)) => {
                state.now += partial.min(dur);
                Ok(SleepOutcome::Interrupted)
            }
            _ => {
                state.now += dur;
                Ok(SleepOutcome::Completed)
            }
        }
    }
}

/// Clear any leftover sticky flags from a previous test.
pub fn reset_signal_flags() {
    while SignalBridge::take_stats() {}
    while SignalBridge::take_poll() {}
}
