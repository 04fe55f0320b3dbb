//! CLI command handlers. Each command is in its own file.

mod checksum;
mod download;
mod install;

pub use checksum::run_checksum;
pub use download::run_download;
pub use install::run_install;

use tokio_util::sync::CancellationToken;
use winsta_core::control;

/// Token cancelled by Ctrl-C for the lifetime of the guard.
pub(super) struct CtrlCGuard {
    token: CancellationToken,
    listener: tokio::task::JoinHandle<()>,
}

impl CtrlCGuard {
    pub(super) fn install() -> Self {
        let token = CancellationToken::new();
        let listener = control::cancel_on_ctrl_c(token.clone());
        Self { token, listener }
    }

    pub(super) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CtrlCGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
