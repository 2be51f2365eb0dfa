//! bzzup binary.

use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    bzzup_cli_commands::run(cancel).await
}
