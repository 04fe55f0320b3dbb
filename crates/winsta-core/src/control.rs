//! Run control: cancellation tokens, Ctrl-C wiring, and the error used when a
//! step is abandoned because its token fired.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::transfer::CopyError;

/// Error returned when a step is stopped by the user (Ctrl-C or caller cancel).
#[derive(Debug)]
pub struct Interrupted;

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interrupted by user")
    }
}

impl std::error::Error for Interrupted {}

/// Cancel `token` on the first Ctrl-C. The task ends after firing or once the
/// token is cancelled some other way.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    tracing::info!("Ctrl-C received, cancelling");
                    token.cancel();
                }
                Err(e) => tracing::warn!("cannot listen for Ctrl-C: {}", e),
            },
        }
    })
}

/// Run `fut` unless `cancel` fires first, in which case it is dropped and
/// [`Interrupted`] is returned.
pub async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted.into()),
        res = fut => res,
    }
}

/// True if `err` (or anything it wraps) means the run was cancelled.
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        e.is::<Interrupted>() || matches!(e.downcast_ref::<CopyError>(), Some(CopyError::Cancelled))
    })
}
