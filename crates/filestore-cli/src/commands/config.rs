//! Config command handlers

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use filestore_core::{Config, Encoding};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage_path": config.storage_path,
                    "encoding": config.encoding.as_str(),
                    "timeout_ms": config.timeout_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.storage_path.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  storage_path: {}", config.storage_path.display());
            println!("  encoding:     {}", config.encoding);
            println!(
                "  timeout_ms:   {}",
                config
                    .timeout_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    // Environment overrides are not written back to the file
    let mut config = Config::load_file(&save_path).context("Failed to load configuration")?;

    apply_setting(&mut config, &key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "storage_path" => {
            if value.is_empty() {
                bail!("storage_path cannot be empty");
            }
            config.storage_path = value.into();
        }
        "encoding" => {
            config.encoding = value.parse::<Encoding>().map_err(|e| anyhow!(e))?;
        }
        "timeout_ms" => {
            config.timeout_ms = if value.is_empty() || value == "none" {
                None
            } else {
                Some(
                    value
                        .parse()
                        .context("Invalid value for timeout_ms. Use milliseconds or 'none'.")?,
                )
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: storage_path, encoding, timeout_ms",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_setting() {
        let mut config = Config::with_storage_path("/data/store");

        apply_setting(&mut config, "encoding", "base64").unwrap();
        assert_eq!(config.encoding, Encoding::Base64);

        apply_setting(&mut config, "timeout_ms", "750").unwrap();
        assert_eq!(config.timeout_ms, Some(750));
        apply_setting(&mut config, "timeout_ms", "none").unwrap();
        assert_eq!(config.timeout_ms, None);

        apply_setting(&mut config, "storage_path", "/elsewhere").unwrap();
        assert_eq!(config.storage_path, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn test_apply_setting_rejects_bad_input() {
        let mut config = Config::with_storage_path("/data/store");

        assert!(apply_setting(&mut config, "encoding", "latin1").is_err());
        assert!(apply_setting(&mut config, "timeout_ms", "soon").is_err());
        assert!(apply_setting(&mut config, "storage_path", "").is_err());
        assert!(apply_setting(&mut config, "colour", "blue").is_err());
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set("encoding".into(), "ascii".into(), Some(&path), &output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("encoding = \"ascii\""));
    }

    #[test]
    fn test_set_does_not_persist_env_overrides() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);
        set(
            "storage_path".into(),
            "/kept/store".into(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = std::env::var("FILESTORE_STORAGE_PATH").ok();
        std::env::set_var("FILESTORE_STORAGE_PATH", "/transient/store");
        let result = set("encoding".into(), "base64".into(), Some(&path), &output);
        match saved {
            Some(v) => std::env::set_var("FILESTORE_STORAGE_PATH", v),
            None => std::env::remove_var("FILESTORE_STORAGE_PATH"),
        }
        result.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("/kept/store"));
        assert!(!content.contains("/transient/store"));
        assert!(content.contains("encoding = \"base64\""));
    }
}
