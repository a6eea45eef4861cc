//! Status command handler

use anyhow::Result;

use filestore_core::FileStore;

use crate::output::{Output, OutputFormat};

/// Show where the store lives and what it holds
pub async fn show(store: &FileStore, output: &Output) -> Result<()> {
    // Readiness failures are part of the status, not an error
    let ready = store.ready().await;
    let key_count = if ready.is_ok() {
        store.get_all_keys().await.ok().map(|keys| keys.len())
    } else {
        None
    };
    let config = store.config_snapshot();
    let state = store.root_state();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage_path": config.storage_path,
                    "encoding": config.encoding.as_str(),
                    "root_state": state.name(),
                    "error": ready.as_ref().err().map(|e| e.to_string()),
                    "keys": key_count
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", state.name());
        }
        OutputFormat::Human => {
            println!("filestore Status");
            println!("================");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.storage_path.display());
            println!("  Encoding: {}", config.encoding);
            println!("  Root:     {}", state.name());
            if let Err(ref e) = ready {
                println!("  Error:    {}", e);
                if let Some(hint) = e.recovery_suggestion() {
                    println!("  Hint:     {}", hint);
                }
            }
            println!();
            println!("Contents:");
            match key_count {
                Some(count) => println!("  Keys: {}", count),
                None => println!("  Keys: (unavailable)"),
            }
        }
    }

    Ok(())
}
