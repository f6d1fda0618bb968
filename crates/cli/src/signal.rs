//! Ctrl-C and SIGTERM handling.
//!
//! The first signal only raises [`INTERRUPTED`]; the explorer notices it at
//! the next iteration boundary and shuts down cleanly. A second signal gets
//! the default disposition and ends the process.

use std::sync::atomic::AtomicBool;

use anyhow::Result;

pub static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signal: std::ffi::c_int) {
    INTERRUPTED.store(true, std::sync::atomic::Ordering::SeqCst);
}

#[cfg(unix)]
pub fn install() -> Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> Result<()> {
    log::warn!("Signal handling unavailable; interrupting will skip the final save");
    Ok(())
}
