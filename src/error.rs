use std::io;

use thiserror::Error;

/// Fatal failures of the pacing loop and its collaborators.
///
/// Interrupted syscalls are not errors; they are retried (or, for
/// sleeps, resynced) where they occur. Everything here terminates the
/// run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("clock read failed: {0}")]
    Clock(#[source] io::Error),

    #[error("sync sleep failed: {0}")]
    Sleep(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("failed to allocate block buffer of {size} bytes")]
    Alloc { size: usize },

    #[error("control channel send failed: {0}")]
    ControlSend(#[source] io::Error),

    #[error("control channel setup failed: {0}")]
    Channel(#[source] io::Error),

    #[error("signal handler installation failed: {0}")]
    Signal(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
