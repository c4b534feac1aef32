// Listener side of the control channel.
//
// The channel is advisory and unreliable: malformed records are
// dropped with a diagnostic, read errors end the poll, and nothing
// here can abort the pacing loop.

use std::fs::File;
use std::io::{self, Read};

use tracing::{info, warn};

use crate::Control::codec::{ControlMessage, MESSAGE_SIZE};
use crate::Pacing::Structs::Engine_Structs::RateConfig;

enum RecordRead {
    /// One full record is in the buffer.
    Full,
    /// Fewer bytes than a record; a writer died mid-record.
    Short(usize),
    /// Nothing pending. A normal poll outcome.
    Empty,
}

/// Drains pending change records from the non-blocking fifo and
/// applies them to the live configuration.
#[derive(Debug)]
pub struct ControlListener {
    channel: File,
}

impl ControlListener {
    /// Wrap an already-open bidirectional, non-blocking channel
    /// descriptor (see `Core::fifo::open_listener`).
    pub fn new(channel: File) -> Self {
        Self { channel }
    }

    /// Read and apply every pending record. Returns the number of
    /// records that changed a configuration field. Zero pending
    /// records is a normal outcome and never blocks.
    pub fn drain(&mut self, config: &mut RateConfig) -> usize {
        let mut applied = 0;
        let mut raw = [0u8; MESSAGE_SIZE];

        loop {
            match self.read_record(&mut raw) {
                Ok(RecordRead::Full) => match ControlMessage::decode(&raw) {
                    Ok(message) => {
                        if apply(config, message) {
                            applied += 1;
                        }
                    }
                    Err(reason) => warn!("invalid control record: {reason}"),
                },
                Ok(RecordRead::Short(n)) => {
                    warn!("invalid control record: truncated record of {n} bytes");
                }
                Ok(RecordRead::Empty) => break,
                Err(err) => {
                    warn!("control channel read failed: {err}");
                    break;
                }
            }
        }

        applied
    }

    /// Read exactly one fixed-size record, tolerating interruption.
    fn read_record(&mut self, raw: &mut [u8; MESSAGE_SIZE]) -> io::Result<RecordRead> {
        let mut filled = 0;
        while filled < MESSAGE_SIZE {
            match self.channel.read(&mut raw[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err),
            }
        }
        Ok(match filled {
            0 => RecordRead::Empty,
            MESSAGE_SIZE => RecordRead::Full,
            n => RecordRead::Short(n),
        })
    }
}

/// Apply one accepted message. A field is updated (and logged, under
/// the current verbosity) only when the new value differs from the
/// current one; re-sending an identical value is a silent no-op.
pub fn apply(config: &mut RateConfig, message: ControlMessage) -> bool {
    match message {
        ControlMessage::Unit(unit) => {
            if unit == config.unit {
                return false;
            }
            if config.verbose {
                info!(
                    "unit changed from {}/s to {}/s",
                    config.unit.letter(),
                    unit.letter()
                );
            }
            config.unit = unit;
            true
        }
        ControlMessage::Limit(rate) => {
            if rate == config.rate {
                return false;
            }
            if config.verbose {
                let per_unit = config.unit.multiplier();
                info!(
                    "limit changed from {:.3} {unit}/s to {:.3} {unit}/s",
                    config.rate / per_unit,
                    rate / per_unit,
                    unit = config.unit.letter(),
                );
            }
            config.rate = rate;
            true
        }
        ControlMessage::Window(window) => {
            if window == config.window {
                return false;
            }
            if config.verbose {
                info!("window changed from {} to {}", config.window, window);
            }
            config.window = window;
            true
        }
        ControlMessage::BlockSize(block_size) => {
            let block_size = block_size as usize;
            if block_size == config.block_size {
                return false;
            }
            if config.verbose {
                info!(
                    "blocksize changed from {} to {}",
                    config.block_size, block_size
                );
            }
            config.block_size = block_size;
            true
        }
        ControlMessage::Verbose(verbose) => {
            if verbose == config.verbose {
                return false;
            }
            // Log only when turning verbose on; turning it off is the
            // request to be quiet.
            if verbose {
                info!("verbose changed from {} to {}", config.verbose, verbose);
            }
            config.verbose = verbose;
            true
        }
    }
}
