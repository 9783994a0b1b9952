//! Store command handlers

use anyhow::{bail, Context, Result};

use bmsync_core::store::{Backend, RoutedStore, StoreContent, StoreKey};

use crate::output::Output;

/// Interpret a command-line value
///
/// JSON literals become booleans, integers or documents; anything that does
/// not parse as JSON is stored as text.
pub fn parse_value(raw: &str) -> StoreContent {
    match serde_json::from_str(raw) {
        Ok(value) => StoreContent::from_json(value),
        Err(_) => StoreContent::from(raw),
    }
}

/// Print the values of one or more keys
pub async fn get(store: &RoutedStore, keys: Vec<StoreKey>, output: &Output) -> Result<()> {
    let values = store.read(&keys).await.context("Failed to read from store")?;
    let entries: Vec<_> = keys.into_iter().zip(values).collect();
    output.print_values(&entries);
    Ok(())
}

/// Store a value under a key
pub async fn set(store: &RoutedStore, key: StoreKey, raw: String, output: &Output) -> Result<()> {
    if key.backend() == Backend::Log {
        bail!("'{}' is append-only. Use `bmsync log add` instead.", key);
    }

    let value = parse_value(&raw);
    if key.backend() == Backend::Scalar && !value.is_primitive() {
        bail!("'{}' only holds booleans, integers or text", key);
    }

    store
        .write(key, Some(value))
        .await
        .with_context(|| format!("Failed to write {}", key))?;
    output.success(&format!("Set {} = {}", key, raw));
    Ok(())
}

/// Remove one or more keys
pub async fn remove(store: &RoutedStore, keys: Vec<StoreKey>, output: &Output) -> Result<()> {
    store.remove(&keys).await.context("Failed to remove keys")?;
    output.success(&format!("Removed {} key(s)", keys.len()));
    Ok(())
}

/// List keys that currently exist
pub async fn keys(store: &RoutedStore, output: &Output) -> Result<()> {
    let keys: Vec<_> = store
        .list_all_keys()
        .await
        .context("Failed to list keys")?
        .into_iter()
        .collect();
    output.print_keys(&keys);
    Ok(())
}

/// Clear every backend
pub async fn clear(store: &RoutedStore, output: &Output) -> Result<()> {
    store.clear_all().await.context("Failed to clear store")?;
    output.success("Cleared all stored data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), StoreContent::Bool(true));
        assert_eq!(parse_value("12"), StoreContent::Int(12));
        assert_eq!(parse_value("hello"), StoreContent::from("hello"));
        assert_eq!(parse_value(r#""quoted""#), StoreContent::from("quoted"));
        assert_eq!(
            parse_value(r#"[{"id":1}]"#),
            StoreContent::Document(serde_json::json!([{"id": 1}]))
        );
    }

    #[tokio::test]
    async fn test_set_and_remove_mixed_keys() {
        let store = RoutedStore::in_memory();
        let output = quiet();

        set(&store, StoreKey::TelemetryEnabled, "true".into(), &output)
            .await
            .unwrap();
        set(&store, StoreKey::Bookmarks, r#"[{"id":1}]"#.into(), &output)
            .await
            .unwrap();

        let values = store
            .read(&[StoreKey::TelemetryEnabled, StoreKey::Bookmarks])
            .await
            .unwrap();
        assert_eq!(values[0], Some(StoreContent::Bool(true)));
        assert_eq!(
            values[1],
            Some(StoreContent::Document(serde_json::json!([{"id": 1}])))
        );

        remove(
            &store,
            vec![StoreKey::TelemetryEnabled, StoreKey::Bookmarks],
            &output,
        )
        .await
        .unwrap();
        let values = store
            .read(&[StoreKey::TelemetryEnabled, StoreKey::Bookmarks])
            .await
            .unwrap();
        assert_eq!(values, vec![None, None]);
    }

    #[tokio::test]
    async fn test_set_rejects_log_key() {
        let store = RoutedStore::in_memory();
        let err = set(&store, StoreKey::TraceLog, "x".into(), &quiet())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("append-only"));
    }

    #[tokio::test]
    async fn test_set_rejects_document_for_scalar_key() {
        let store = RoutedStore::in_memory();
        let err = set(&store, StoreKey::TelemetryEnabled, "{}".into(), &quiet())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("only holds"));
    }
}
