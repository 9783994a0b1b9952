//! Config command handlers

use std::path::PathBuf;

use anyhow::Result;

use bmsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database_name": config.database_name,
                    "database_path": config.database_path(),
                    "native_storage_path": config.native_storage_path(),
                    "log_file": config.log_file,
                    "log_level": config.log_level,
                    "mutation_delay_ms": config.mutation_delay_ms,
                    "interface_ready_timeout_ms": config.interface_ready_timeout_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:                   {}", config.data_dir.display());
            println!("  database_name:              {}", config.database_name);
            println!(
                "  log_file:                   {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!("  log_level:                  {}", config.log_level);
            println!("  mutation_delay_ms:          {}", config.mutation_delay_ms);
            println!(
                "  interface_ready_timeout_ms: {}",
                config.interface_ready_timeout_ms
            );
            println!();
            println!("Config file: {}", effective_path.display());
            println!("Database:    {}", config.database_path().display());
        }
    }

    Ok(())
}
