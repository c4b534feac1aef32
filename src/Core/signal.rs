// Signal-to-flag bridge.
//
// Handlers do no real work: each one flips a sticky flag that the main
// loop polls and clears at safe points. The handlers are registered
// without SA_RESTART so that blocked read/write/sleep calls return
// EINTR and the engine's retry/resync policy runs.

use std::io;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::CachePadded;

// Padded so the two handler-written flags never share a cache line
// with each other or with neighboring statics.
static STATS_REQUESTED: CachePadded<AtomicBool> = CachePadded::new(AtomicBool::new(false));
static POLL_REQUESTED: CachePadded<AtomicBool> = CachePadded::new(AtomicBool::new(false));

/// The two sticky flags connecting asynchronous notifications to the
/// pacing loop: "show stats now" (SIGUSR1) and "poll the control
/// channel now" (SIGUSR2).
///
/// The set side is only called from a notification context; the take
/// side only from the main loop.
pub struct SignalBridge;

impl SignalBridge {
    /// Arm the "show stats now" flag. Async-signal-safe.
    pub fn request_stats() {
        STATS_REQUESTED.store(true, Ordering::Release);
    }

    /// Arm the "poll control channel now" flag. Async-signal-safe.
    pub fn request_poll() {
        POLL_REQUESTED.store(true, Ordering::Release);
    }

    /// Consume the stats flag. Main loop only.
    pub fn take_stats() -> bool {
        STATS_REQUESTED.swap(false, Ordering::AcqRel)
    }

    /// Consume the poll flag. Main loop only.
    pub fn take_poll() -> bool {
        POLL_REQUESTED.swap(false, Ordering::AcqRel)
    }

    /// Register the SIGUSR1/SIGUSR2 handlers. Both USR signals are
    /// masked while either handler runs; SA_RESTART is deliberately
    /// not set.
    pub fn install() -> io::Result<()> {
        unsafe {
            let mut mask: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut mask);
            libc::sigaddset(&mut mask, libc::SIGUSR1);
            libc::sigaddset(&mut mask, libc::SIGUSR2);

            let mut action: libc::sigaction = mem::zeroed();
            action.sa_mask = mask;
            action.sa_flags = 0;

            action.sa_sigaction = handle_usr1 as usize;
            if libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }

            action.sa_sigaction = handle_usr2 as usize;
            if libc::sigaction(libc::SIGUSR2, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

extern "C" fn handle_usr1(_sig: libc::c_int) {
    SignalBridge::request_stats();
}

extern "C" fn handle_usr2(_sig: libc::c_int) {
    SignalBridge::request_poll();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_sticky_until_taken() {
        SignalBridge::request_stats();
        SignalBridge::request_stats();
        assert!(SignalBridge::take_stats());
        assert!(!SignalBridge::take_stats());

        SignalBridge::request_poll();
        assert!(SignalBridge::take_poll());
        assert!(!SignalBridge::take_poll());
    }
}
