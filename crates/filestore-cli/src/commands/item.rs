//! Item command handlers

use anyhow::{bail, Context, Result};

use filestore_core::FileStore;

use crate::output::Output;

/// Store a value
pub async fn set(store: &FileStore, key: String, value: String, output: &Output) -> Result<()> {
    store
        .set_item(&key, &value)
        .await
        .with_context(|| format!("Failed to store '{}'", key))?;
    output.success(&format!("Stored {}", key));
    Ok(())
}

/// Print a stored value
pub async fn get(store: &FileStore, key: String, output: &Output) -> Result<()> {
    match store.try_get_item(&key).await {
        Ok(Some(value)) => {
            output.print_value(&key, &value);
            Ok(())
        }
        Ok(None) => bail!("No value stored for '{}'", key),
        Err(e) => Err(e).with_context(|| format!("Failed to read '{}'", key)),
    }
}

/// Remove a value
pub async fn remove(store: &FileStore, key: String, output: &Output) -> Result<()> {
    store
        .remove_item(&key)
        .await
        .with_context(|| format!("Failed to remove '{}'", key))?;
    output.success(&format!("Removed {}", key));
    Ok(())
}

/// List every key
pub async fn keys(store: &FileStore, output: &Output) -> Result<()> {
    let keys = store.get_all_keys().await.context("Failed to list keys")?;
    output.print_keys(&keys);
    Ok(())
}

/// Remove every key
pub async fn clear(store: &FileStore, output: &Output) -> Result<()> {
    let report = store.clear().await.context("Failed to list keys to clear")?;
    output.print_clear_report(&report);

    if !report.failures.is_empty() {
        bail!(
            "{} of {} key(s) could not be removed",
            report.failures.len(),
            report.keys.len()
        );
    }
    Ok(())
}
