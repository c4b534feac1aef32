use tracing::info;

use crate::error::EngineError;
use crate::Control::listener::ControlListener;
use crate::Core::time::{Clock, SystemClock};
use crate::Pacing::calibrate::calibrate;
use crate::Pacing::engine::PacingEngine;
use crate::Pacing::Structs::Engine_Structs::{RateConfig, RateUnit};

/// Construction path for [`PacingEngine`]. Building validates the
/// parameters and runs the one-time timing calibration.
pub struct EngineBuilder {
    config: RateConfig,
    control: Option<ControlListener>,
}

impl EngineBuilder {
    /// `limit` is in bytes per second.
    pub fn new(limit: f64) -> Self {
        Self {
            config: RateConfig::new(limit),
            control: None,
        }
    }

    pub fn with_unit(mut self, unit: RateUnit) -> Self {
        self.config.unit = unit;
        self
    }

    pub fn with_window(mut self, seconds: u64) -> Self {
        self.config.window = seconds;
        self
    }

    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.config.block_size = bytes;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Attach an open control channel for live retuning.
    pub fn with_control(mut self, listener: ControlListener) -> Self {
        self.control = Some(listener);
        self
    }

    pub fn build(self) -> Result<PacingEngine<SystemClock>, EngineError> {
        self.build_with_clock(SystemClock)
    }

    /// Build against a caller-provided clock.
    pub fn build_with_clock<C: Clock>(self, clock: C) -> Result<PacingEngine<C>, EngineError> {
        if !(self.config.rate > 0.0) {
            return Err(EngineError::Config(format!(
                "limit must be positive, got {}",
                self.config.rate
            )));
        }
        if self.config.window == 0 {
            return Err(EngineError::Config("window must be at least 1 second".into()));
        }
        if self.config.block_size == 0 {
            return Err(EngineError::Config("blocksize must be at least 1 byte".into()));
        }

        let threshold = calibrate(&clock)?;
        if self.config.verbose {
            info!("sync threshold = {:.9}s", threshold.seconds());
        }

        Ok(PacingEngine::new(
            self.config,
            clock,
            threshold,
            self.control,
        ))
    }
}
