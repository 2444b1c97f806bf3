//! SIGINT handling with a triple-press force-terminate escape hatch.
//!
//! The first `Ctrl+C` requests a graceful shutdown (signals the returned
//! receiver, which axum's `with_graceful_shutdown` awaits). A second press
//! warns that the drain is still running; a third terminates the process
//! immediately without waiting for the writer thread to drain.

use tokio::sync::oneshot;

pub fn spawn_handler() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut tx = Some(tx);
        let mut count: u32 = 0;

        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            count += 1;

            match count {
                1 => {
                    tracing::info!("received SIGINT, shutting down gracefully (press Ctrl+C twice more to force)");
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                }
                2 => tracing::warn!("received second SIGINT, press once more to force-terminate"),
                _ => {
                    tracing::warn!("received third SIGINT, force-terminating without draining");
                    std::process::exit(130);
                }
            }
        }
    });

    rx
}
