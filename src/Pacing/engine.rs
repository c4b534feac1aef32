// The pacing loop.
//
// One logical thread runs everything: read a block, decide how far
// ahead of the ideal pace the reader is, sleep that much, write the
// block, account. Asynchronous notifications only flip the two
// SignalBridge flags; the loop consumes them at safe points.

use std::io::{self, Read, Write};

use tracing::warn;

use crate::error::EngineError;
use crate::Control::listener::ControlListener;
use crate::Core::signal::SignalBridge;
use crate::Core::time::{secs_to_duration, Clock, SleepOutcome};
use crate::Pacing::calibrate::SyncThreshold;
use crate::Pacing::stats::{self, StatsSnapshot};
use crate::Pacing::Structs::Engine_Structs::{RateConfig, WindowStats};

/// Largest per-window byte count the pace arithmetic can represent
/// exactly in f64. Crossing it forces an immediate window reset before
/// the budget math degrades.
const WINDOW_BYTES_CEILING: u64 = 1 << 53;

fn budget_overflowed(window_read: u64) -> bool {
    window_read > WINDOW_BYTES_CEILING
}

/// The byte-stream pacer. Owns the live configuration and the block
/// buffer; built through [`EngineBuilder`](crate::Pacing::EngineBuilder).
pub struct PacingEngine<C: Clock> {
    config: RateConfig,
    clock: C,
    threshold: SyncThreshold,
    control: Option<ControlListener>,
    stats: WindowStats,
}

impl<C: Clock> PacingEngine<C> {
    pub(crate) fn new(
        config: RateConfig,
        clock: C,
        threshold: SyncThreshold,
        control: Option<ControlListener>,
    ) -> Self {
        Self {
            config,
            clock,
            threshold,
            control,
            stats: WindowStats::new(),
        }
    }

    /// The calibrated minimum sleep worth attempting.
    pub fn threshold(&self) -> SyncThreshold {
        self.threshold
    }

    /// The live configuration as of the last control-channel drain.
    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    /// Pace `input` into `output` until end-of-stream. Returns the
    /// lifetime total of bytes moved.
    pub fn run<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<u64, EngineError> {
        let mut block = alloc_block(self.config.block_size)?;

        let mut start = self.clock.now()?.as_secs_f64();
        // Seed elapsed at the window length so the first iteration
        // opens a fresh window.
        let mut elapsed = self.config.window as f64;
        // Block resizes are deferred to the iteration after a window
        // reset, never applied mid-window.
        let mut resize_armed = false;

        loop {
            if resize_armed {
                self.apply_pending_resize(&mut block);
                resize_armed = false;
            }

            let (nread, done) = read_block(input, &mut block)?;

            let window_read_next = self.stats.window_read.saturating_add(nread as u64);
            let mut sync;
            if elapsed >= self.config.window as f64 || budget_overflowed(window_read_next) {
                // WindowReset
                let now = self.clock.now()?.as_secs_f64();

                let requested = SignalBridge::take_stats();
                if self.config.verbose || requested {
                    self.report(now - start, block.len());
                }

                self.drain_control();

                start = now;
                elapsed = 0.0;
                self.stats.reset_window(nread as u64);
                sync = self.stats.window_read as f64 / self.config.rate;
                resize_armed = true;
            } else {
                self.stats.window_read = window_read_next;
                sync = self.resync(start, &mut elapsed, block.len())?;
            }

            // MaybeSleep: below the calibrated floor the scheduler
            // cannot honor the request, so skip outright. An
            // interrupted sleep recomputes its target from scratch
            // rather than resuming the stale duration.
            while sync >= self.threshold.seconds() {
                match self.clock.sleep(secs_to_duration(sync))? {
                    SleepOutcome::Completed => break,
                    SleepOutcome::Interrupted => {
                        sync = self.resync(start, &mut elapsed, block.len())?;
                    }
                }
            }

            output
                .write_all(&block[..nread])
                .map_err(EngineError::Write)?;

            self.stats.window_written += nread as u64;
            self.stats.total = self.stats.total.saturating_add(nread as u64);

            if done {
                break;
            }
        }

        Ok(self.stats.total)
    }

    /// The ComputeSync step, also re-entered after an interrupted
    /// sleep: honor a pending poll request first so a fresh rate or
    /// window takes effect in this very computation, then measure how
    /// far ahead of the ideal pace the reader is.
    fn resync(
        &mut self,
        start: f64,
        elapsed: &mut f64,
        active_block: usize,
    ) -> Result<f64, EngineError> {
        if SignalBridge::take_poll() {
            self.drain_control();
        }

        let now = self.clock.now()?.as_secs_f64();
        *elapsed = now - start;

        if SignalBridge::take_stats() {
            self.report(*elapsed, active_block);
        }

        Ok(self.stats.window_read as f64 / self.config.rate - *elapsed)
    }

    fn drain_control(&mut self) {
        if let Some(listener) = self.control.as_mut() {
            listener.drain(&mut self.config);
        }
    }

    fn report(&self, elapsed_secs: f64, active_block: usize) {
        stats::report(&StatsSnapshot {
            total: self.stats.total,
            window_written: self.stats.window_written,
            elapsed_secs,
            block_size: active_block,
            window: self.config.window,
            rate: self.config.rate,
            unit: self.config.unit,
        });
    }

    /// Swap the block buffer to the most recently requested size. On
    /// allocation failure the previous size is kept and the config
    /// field rolled back, so the engine degrades instead of dying.
    fn apply_pending_resize(&mut self, block: &mut Vec<u8>) {
        let wanted = self.config.block_size;
        if wanted == block.len() {
            return;
        }
        match alloc_block(wanted) {
            Ok(fresh) => *block = fresh,
            Err(_) => {
                warn!(
                    "failed to change blocksize from {} to {}, keeping {}",
                    block.len(),
                    wanted,
                    block.len()
                );
                self.config.block_size = block.len();
            }
        }
    }
}

fn alloc_block(size: usize) -> Result<Vec<u8>, EngineError> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(size)
        .map_err(|_| EngineError::Alloc { size })?;
    block.resize(size, 0);
    Ok(block)
}

/// Fill `block` up to its full size or end-of-stream. Short reads are
/// looped; an interrupted read retries the same call; any other
/// failure is fatal. Returns the bytes obtained and whether the source
/// is exhausted.
fn read_block<R: Read>(input: &mut R, block: &mut [u8]) -> Result<(usize, bool), EngineError> {
    let mut filled = 0;
    while filled < block.len() {
        match input.read(&mut block[filled..]) {
            Ok(0) => return Ok((filled, true)),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(EngineError::Read(err)),
        }
    }
    Ok((filled, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_guard_trips_past_the_f64_exact_range() {
        assert!(!budget_overflowed(0));
        assert!(!budget_overflowed(WINDOW_BYTES_CEILING));
        assert!(budget_overflowed(WINDOW_BYTES_CEILING + 1));
        assert!(budget_overflowed(u64::MAX));
    }

    #[test]
    fn read_block_loops_over_short_reads() {
        // A reader that trickles three bytes per call.
        struct Trickle {
            left: usize,
        }
        impl Read for Trickle {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.left == 0 {
                    return Ok(0);
                }
                let n = self.left.min(buf.len()).min(3);
                self.left -= n;
                Ok(n)
            }
        }

        let mut block = vec![0u8; 10];
        let mut source = Trickle { left: 25 };
        assert_eq!(read_block(&mut source, &mut block).unwrap(), (10, false));
        assert_eq!(read_block(&mut source, &mut block).unwrap(), (10, false));
        // Final short block carries the EOF marker.
        assert_eq!(read_block(&mut source, &mut block).unwrap(), (5, true));
    }

    #[test]
    fn read_block_retries_interrupted_calls() {
        struct InterruptOnce {
            fired: bool,
        }
        impl Read for InterruptOnce {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.fired {
                    self.fired = true;
                    return Err(io::Error::from(io::ErrorKind::Interrupted));
                }
                buf.fill(7);
                Ok(buf.len())
            }
        }

        let mut block = vec![0u8; 8];
        let mut source = InterruptOnce { fired: false };
        assert_eq!(read_block(&mut source, &mut block).unwrap(), (8, false));
        assert_eq!(block, vec![7u8; 8]);
    }

    #[test]
    fn alloc_block_is_zeroed_at_the_requested_size() {
        let block = alloc_block(512).unwrap();
        assert_eq!(block.len(), 512);
        assert!(block.iter().all(|&b| b == 0));
    }
}
