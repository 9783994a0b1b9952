//! Trace log command handlers

use std::sync::Arc;

use anyhow::{Context, Result};

use bmsync_core::store::{RoutedStore, TraceLogLevel};
use bmsync_core::TraceLogger;

use crate::output::Output;

/// Show all trace log entries
pub async fn show(store: Arc<RoutedStore>, output: &Output) -> Result<()> {
    let items = store.trace_log().await.context("Failed to read trace log")?;
    output.print_log(&items);
    Ok(())
}

/// Append an entry to the trace log
pub async fn add(
    store: Arc<RoutedStore>,
    level: TraceLogLevel,
    message: String,
    output: &Output,
) -> Result<()> {
    let logger = TraceLogger::resume(store)
        .await
        .context("Failed to read trace log")?;
    logger
        .log(level, message)
        .await
        .context("Failed to append to trace log")?;
    output.success("Log entry added");
    Ok(())
}

/// Remove all trace log entries
pub async fn clear(store: Arc<RoutedStore>, output: &Output) -> Result<()> {
    let logger = TraceLogger::new(store);
    logger.clear().await.context("Failed to clear trace log")?;
    output.success("Trace log cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[tokio::test]
    async fn test_add_then_clear() {
        let store = Arc::new(RoutedStore::in_memory());
        let output = Output::new(OutputFormat::Quiet);

        add(Arc::clone(&store), TraceLogLevel::Warn, "first".into(), &output)
            .await
            .unwrap();
        add(Arc::clone(&store), TraceLogLevel::Error, "second".into(), &output)
            .await
            .unwrap();

        let items = store.trace_log().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].message, "second");

        clear(Arc::clone(&store), &output).await.unwrap();
        assert!(store.trace_log().await.unwrap().is_empty());
    }
}
