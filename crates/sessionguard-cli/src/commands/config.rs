//! Configuration inspection CLI commands.

use clap::{Args, Subcommand};

use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_store::redis::client::mask_redis_url;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration and print a summary
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.store.redis.url = mask_redis_url(&shown.store.redis.url);
            output::print_item(&shown, format);
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Store", &config.store.provider);
            output::print_kv("Session TTL (s)", &config.session.ttl_seconds.to_string());
            output::print_kv(
                "Multi-device",
                &config.session.multi_device_enabled.to_string(),
            );
            output::print_kv("Admission lock", &config.session.admission.lock.to_string());
            output::print_kv(
                "Eviction scope",
                &config.session.admission.eviction_scope.to_string(),
            );
        }
    }

    Ok(())
}
