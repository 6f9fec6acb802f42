//! # Termination signals for [`Module::run`](crate::Module::run).
//!
//! On Unix any of `SIGINT`, `SIGTERM` or `SIGQUIT` requests a stop; elsewhere only
//! Ctrl-C does.

use crate::error::ModuleError;

/// Completes when the process is asked to terminate.
///
/// Handlers are installed per call; failing to install one is reported as
/// [`ModuleError::Signal`].
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), ModuleError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), ModuleError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
