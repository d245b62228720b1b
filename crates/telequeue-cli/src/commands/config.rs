//! Config command handlers

use anyhow::{bail, Context, Result};

use telequeue_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "batch_size": config.batch_size,
                    "database": config.database_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.database_path().display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:   {}", config.data_dir.display());
            println!("  batch_size: {}", config.batch_size);
            println!();
            println!("Database:    {}", config.database_path().display());
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value and save it to the config file
pub fn set(key: &str, value: &str, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply(&mut config, key, value)?;

    config
        .save_to_path(&Config::config_file_path())
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "batch_size" => {
            let size: usize = value
                .parse()
                .context("Invalid value for batch_size. Use a positive integer.")?;
            if size == 0 {
                bail!("batch_size must be at least 1");
            }
            config.batch_size = size;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, batch_size",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "data_dir", "/tmp/q").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/q"));

        apply(&mut config, "batch_size", "10").unwrap();
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply(&mut config, "batch_size", "0").is_err());
        assert!(apply(&mut config, "batch_size", "many").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
    }
}
