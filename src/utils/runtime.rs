use anyhow::Result;

/// The daemon does very little work per tick, so a current-thread runtime is enough. Background
/// classification tasks interleave with the tick loop on the same thread.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
