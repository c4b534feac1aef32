pub mod codec;
pub mod listener;
pub mod sender;

pub use codec::{ControlMessage, DecodeError, MESSAGE_SIZE};
pub use listener::ControlListener;
pub use sender::{send_changes, ChangeSet};
