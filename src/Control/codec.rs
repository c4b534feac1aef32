// Wire codec for control-channel records.
//
// Records are serialized field by field into a fixed 12-byte layout;
// nothing depends on in-memory struct layout or padding. The version
// constant's high and low bytes differ and both ends encode it in
// native byte order, so a record produced on a foreign-endian host
// arrives with the bytes swapped and fails the exact-match check
// instead of being misread.

use thiserror::Error;

use crate::Pacing::Structs::Engine_Structs::RateUnit;

/// Sentinel first byte of every record.
pub const MESSAGE_MAGIC: u8 = b'P';

/// Protocol version. The two bytes must differ; see module docs.
pub const MESSAGE_VERSION: u16 = 0x0102;

/// Exact size of one record on the wire.
pub const MESSAGE_SIZE: usize = 12;

const TAG_LIMIT: u8 = b'<';
const TAG_WINDOW: u8 = b'w';
const TAG_BLOCK_SIZE: u8 = b's';
const TAG_VERBOSE: u8 = b'v';

/// One decoded change request. Instances are transient: built by
/// decode or for encode, applied, and discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// Change the display unit. The wire tag is the unit letter.
    Unit(RateUnit),
    /// Change the limit, payload in bytes per second.
    Limit(f64),
    /// Change the window length, payload in seconds.
    Window(u64),
    /// Change the block size, payload in bytes.
    BlockSize(u64),
    /// Change verbosity.
    Verbose(bool),
}

/// Why a record was rejected. Rejected records are discarded whole and
/// never partially applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated record of {0} bytes")]
    Truncated(usize),
    #[error("bad magic byte 0x{0:02x}")]
    BadMagic(u8),
    #[error("version mismatch 0x{0:04x}")]
    BadVersion(u16),
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),
}

impl ControlMessage {
    pub fn tag(&self) -> u8 {
        match self {
            ControlMessage::Unit(unit) => unit.letter() as u8,
            ControlMessage::Limit(_) => TAG_LIMIT,
            ControlMessage::Window(_) => TAG_WINDOW,
            ControlMessage::BlockSize(_) => TAG_BLOCK_SIZE,
            ControlMessage::Verbose(_) => TAG_VERBOSE,
        }
    }

    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let payload: [u8; 8] = match *self {
            // The multiplier rides along for diagnostics; the receiver
            // maps the letter itself.
            ControlMessage::Unit(unit) => unit.multiplier().to_ne_bytes(),
            ControlMessage::Limit(bps) => bps.to_ne_bytes(),
            ControlMessage::Window(secs) => secs.to_ne_bytes(),
            ControlMessage::BlockSize(bytes) => bytes.to_ne_bytes(),
            ControlMessage::Verbose(on) => (on as u64).to_ne_bytes(),
        };

        let mut raw = [0u8; MESSAGE_SIZE];
        raw[0] = MESSAGE_MAGIC;
        raw[1..3].copy_from_slice(&MESSAGE_VERSION.to_ne_bytes());
        raw[3] = self.tag();
        raw[4..12].copy_from_slice(&payload);
        raw
    }

    pub fn decode(raw: &[u8]) -> Result<ControlMessage, DecodeError> {
        if raw.len() != MESSAGE_SIZE {
            return Err(DecodeError::Truncated(raw.len()));
        }
        if raw[0] != MESSAGE_MAGIC {
            return Err(DecodeError::BadMagic(raw[0]));
        }
        let version = u16::from_ne_bytes([raw[1], raw[2]]);
        if version != MESSAGE_VERSION {
            return Err(DecodeError::BadVersion(version));
        }

        let payload: [u8; 8] = raw[4..12].try_into().expect("fixed slice");
        let tag = raw[3];
        if let Some(unit) = RateUnit::from_letter(tag) {
            return Ok(ControlMessage::Unit(unit));
        }
        match tag {
            TAG_LIMIT => Ok(ControlMessage::Limit(f64::from_ne_bytes(payload))),
            TAG_WINDOW => Ok(ControlMessage::Window(u64::from_ne_bytes(payload))),
            TAG_BLOCK_SIZE => Ok(ControlMessage::BlockSize(u64::from_ne_bytes(payload))),
            TAG_VERBOSE => Ok(ControlMessage::Verbose(u64::from_ne_bytes(payload) != 0)),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}
