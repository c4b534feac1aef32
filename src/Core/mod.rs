pub mod fifo;
pub mod signal;
pub mod time;

pub use signal::SignalBridge;
pub use time::{Clock, SleepOutcome, SystemClock};
