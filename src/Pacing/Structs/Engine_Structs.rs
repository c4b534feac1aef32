// Plain data types shared by the engine and the control channel.

/// Display units for limits and statistics. Each unit is a fixed
/// bytes-per-second multiplier plus the letter used on the wire and in
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Bits,
    Kilobits,
    Megabits,
    Bytes,
    Kilobytes,
    Megabytes,
}

impl RateUnit {
    /// Bytes per second represented by one unit.
    pub fn multiplier(self) -> f64 {
        match self {
            RateUnit::Bits => 1.0 / 8.0,
            RateUnit::Kilobits => 1024.0 / 8.0,
            RateUnit::Megabits => (1024.0 * 1024.0) / 8.0,
            RateUnit::Bytes => 1.0,
            RateUnit::Kilobytes => 1024.0,
            RateUnit::Megabytes => 1024.0 * 1024.0,
        }
    }

    /// Wire tag and report letter.
    pub fn letter(self) -> char {
        match self {
            RateUnit::Bits => 'b',
            RateUnit::Kilobits => 'k',
            RateUnit::Megabits => 'm',
            RateUnit::Bytes => 'B',
            RateUnit::Kilobytes => 'K',
            RateUnit::Megabytes => 'M',
        }
    }

    pub fn from_letter(letter: u8) -> Option<RateUnit> {
        match letter {
            b'b' => Some(RateUnit::Bits),
            b'k' => Some(RateUnit::Kilobits),
            b'm' => Some(RateUnit::Megabits),
            b'B' => Some(RateUnit::Bytes),
            b'K' => Some(RateUnit::Kilobytes),
            b'M' => Some(RateUnit::Megabytes),
            _ => None,
        }
    }
}

/// Default block size for input and output, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Default budget window, in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// The engine's live configuration.
///
/// Singly owned by the engine and mutated only by the control-channel
/// apply step on the main loop thread. Every field is valid to act on
/// immediately; updates are atomic per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateConfig {
    /// Limit in bytes per second.
    pub rate: f64,
    /// Display unit for the limit and achieved-rate reports.
    pub unit: RateUnit,
    /// Budget window length in seconds.
    pub window: u64,
    /// I/O block size in bytes. Applied to the live buffer only
    /// between windows.
    pub block_size: usize,
    /// Emit change logs and per-window statistics.
    pub verbose: bool,
}

impl RateConfig {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            unit: RateUnit::Bytes,
            window: DEFAULT_WINDOW_SECS,
            block_size: DEFAULT_BLOCK_SIZE,
            verbose: false,
        }
    }
}

/// Byte counters for the current window plus the process-lifetime
/// total. The window counters reset together; `total` is monotonic and
/// never resets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowStats {
    pub total: u64,
    pub window_read: u64,
    pub window_written: u64,
}

impl WindowStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh window. The bytes just read count toward the new
    /// window; the written counter starts empty.
    pub fn reset_window(&mut self, nread: u64) {
        self.window_read = nread;
        self.window_written = 0;
    }
}
