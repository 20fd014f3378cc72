use tokio::sync::watch;

/// Shutdown channel fired by SIGINT/SIGTERM.
///
/// Subscribe to the returned sender for receivers; the node may also fire it
/// through `NodeContext::request_shutdown`.
pub fn setup_shutdown() -> anyhow::Result<watch::Sender<()>> {
    let tx = watch::Sender::new(());
    ctrlc::set_handler({
        let tx = tx.clone();
        move || {
            log::info!("Shutdown signal received");
            tx.send_replace(());
        }
    })?;
    Ok(tx)
}
