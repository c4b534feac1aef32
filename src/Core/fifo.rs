// Named-pipe lifecycle for the control channel.
//
// The listener end is opened O_RDWR so the open never blocks waiting
// for a peer and the pipe never reports EOF while the listener lives;
// O_NONBLOCK makes an empty poll return WouldBlock instead of parking
// the pacing loop.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::FromRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

fn path_to_cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fifo path contains NUL"))
}

/// Create the fifo filesystem object at `path`.
///
/// Returns a guard that unlinks it when dropped, so every exit path
/// that unwinds past the guard tears the object down.
pub fn create(path: &Path) -> io::Result<FifoGuard> {
    let c_path = path_to_cstring(path)?;
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(FifoGuard {
        path: path.to_path_buf(),
    })
}

/// Open the listener end: bidirectional, non-blocking.
pub fn open_listener(path: &Path) -> io::Result<File> {
    let c_path = path_to_cstring(path)?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Open the sender end: write-only, blocking until a listener exists.
pub fn open_sender(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).open(path)
}

/// Best-effort unlink, shared with the termination handler.
pub fn remove(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Owns the fifo filesystem object; unlinks it on drop.
#[derive(Debug)]
pub struct FifoGuard {
    path: PathBuf,
}

impl FifoGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FifoGuard {
    fn drop(&mut self) {
        remove(&self.path);
    }
}
