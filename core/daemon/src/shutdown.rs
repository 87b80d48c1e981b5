//! SIGINT/SIGTERM handling.
//!
//! Both signals are blocked in the main thread before any other thread is
//! spawned, so every thread inherits the mask. A dedicated watcher thread
//! receives them synchronously with `sigwait` and runs the shutdown callback
//! outside of signal-handler context.

use std::thread;
use tracing::warn;

fn termination_signals() -> libc::sigset_t {
    // SAFETY: sigemptyset/sigaddset only initialise the zeroed local set.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        libc::sigaddset(&mut set, libc::SIGTERM);
        set
    }
}

/// Must run before any thread is spawned.
pub fn block_termination_signals() -> Result<(), String> {
    let set = termination_signals();
    // SAFETY: `set` is a valid, initialised sigset; the old mask is not requested.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(format!(
            "Failed to block termination signals: {}",
            std::io::Error::from_raw_os_error(rc)
        ));
    }
    Ok(())
}

pub fn spawn_signal_watcher<F>(on_signal: F)
where
    F: FnOnce(&'static str) + Send + 'static,
{
    thread::spawn(move || {
        let set = termination_signals();
        let mut signal: libc::c_int = 0;
        // SAFETY: `set` is initialised and `signal` is a valid out-pointer.
        let rc = unsafe { libc::sigwait(&set, &mut signal) };
        if rc != 0 {
            warn!(
                error = %std::io::Error::from_raw_os_error(rc),
                "sigwait failed; signal-driven shutdown disabled"
            );
            return;
        }
        on_signal(signal_name(signal));
    });
}

fn signal_name(signal: libc::c_int) -> &'static str {
    match signal {
        libc::SIGINT => "SIGINT",
        libc::SIGTERM => "SIGTERM",
        _ => "unknown",
    }
}
