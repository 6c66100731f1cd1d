//! Ctrl-C handling for `start -wait`.
//!
//! The first interrupt cancels the poll loop so the handle and session are
//! still released. A second interrupt ends the process immediately, which
//! is the only way out of a backend call that never returns.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Exit code used when a second interrupt ends the process.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancel `cancel` on the first interrupt, then wait for another.
///
/// Returns `true` once a second interrupt arrives, and `false` if
/// listening for interrupts fails first.
pub async fn watch<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        tracing::warn!(error = %e, "cannot listen for interrupts");
        return false;
    }
    tracing::info!("interrupt received, finishing current tick");
    cancel.cancel();

    if let Err(e) = next_interrupt().await {
        tracing::warn!(error = %e, "cannot listen for interrupts");
        return false;
    }
    tracing::warn!("second interrupt received, exiting without cleanup");
    true
}
