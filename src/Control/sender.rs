// Sender side of the control channel.

use std::io::Write;

use crate::error::EngineError;
use crate::Control::codec::ControlMessage;
use crate::Pacing::Structs::Engine_Structs::RateUnit;

/// The batch of changes a sender process pushes to a running listener.
/// One slot per tunable; unset slots are not transmitted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChangeSet {
    pub verbose: Option<bool>,
    pub unit: Option<RateUnit>,
    /// Bytes per second.
    pub limit: Option<f64>,
    /// Seconds.
    pub window: Option<u64>,
    /// Bytes.
    pub block_size: Option<u64>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.verbose.is_none()
            && self.unit.is_none()
            && self.limit.is_none()
            && self.window.is_none()
            && self.block_size.is_none()
    }
}

/// Emit the requested changes in the fixed batch order: verbosity
/// first (so later messages in the batch are logged under the new
/// setting), then unit, limit, window, block size.
///
/// The first failed write aborts the rest of the batch; the channel is
/// closed by the caller's handle going out of scope regardless of
/// outcome.
pub fn send_changes<W: Write>(channel: &mut W, changes: &ChangeSet) -> Result<(), EngineError> {
    if let Some(verbose) = changes.verbose {
        write_record(channel, ControlMessage::Verbose(verbose))?;
    }
    if let Some(unit) = changes.unit {
        write_record(channel, ControlMessage::Unit(unit))?;
    }
    if let Some(limit) = changes.limit {
        write_record(channel, ControlMessage::Limit(limit))?;
    }
    if let Some(window) = changes.window {
        write_record(channel, ControlMessage::Window(window))?;
    }
    if let Some(block_size) = changes.block_size {
        write_record(channel, ControlMessage::BlockSize(block_size))?;
    }
    Ok(())
}

fn write_record<W: Write>(channel: &mut W, message: ControlMessage) -> Result<(), EngineError> {
    channel
        .write_all(&message.encode())
        .map_err(EngineError::ControlSend)
}
