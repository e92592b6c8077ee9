// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal-driven shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Returns a token cancelled on SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for SIGINT only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        token_clone.cancel();
        debug!("signal handler finished");
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }
}
