//! Shutdown coordination using `CancellationToken`

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Token cancelled on Ctrl+C
pub fn shutdown_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                trigger.cancel();
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_child_tokens_follow_parent() {
        let token = shutdown_signal();
        let server = token.child_token();
        let refresher = token.child_token();
        assert!(!server.is_cancelled());

        token.cancel();
        assert!(server.is_cancelled());
        assert!(refresher.is_cancelled());
    }
}
