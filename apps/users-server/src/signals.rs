use anyhow::Result;
use tokio::signal;

/// Wait for Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<()> {
    let name = tokio::select! {
        result = wait_ctrl_c() => result?,
        result = wait_sigterm() => result?,
    };

    tracing::info!(signal = name, "shutdown signal received");
    Ok(())
}

async fn wait_ctrl_c() -> Result<&'static str> {
    signal::ctrl_c().await?;
    Ok("SIGINT")
}

#[cfg(unix)]
async fn wait_sigterm() -> Result<&'static str> {
    let mut handler = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    handler.recv().await;
    Ok("SIGTERM")
}

#[cfg(not(unix))]
async fn wait_sigterm() -> Result<&'static str> {
    std::future::pending().await
}
