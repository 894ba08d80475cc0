//! CLI command definitions and dispatch.

pub mod config;
pub mod session;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use sessionguard_auth::registry::SessionRegistry;
use sessionguard_auth::token::StoreTokenStore;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_store::StoreManager;

use crate::output::OutputFormat;

/// SessionGuard: login session admission and administration
#[derive(Debug, Parser)]
#[command(name = "sessionguard", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded from `config/{env}`
    #[arg(short, long, env = "SESSIONGUARD_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and terminate sessions
    Session(session::SessionArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config, &self.env)?;
        match &self.command {
            Commands::Session(args) => session::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format),
        }
    }
}

/// Helper: load configuration from the base file and environment overlay
pub fn load_config(base: &str, env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(base, env)
}

/// Helper: connect the store and build the registry over it
pub async fn connect_registry(config: &AppConfig) -> Result<SessionRegistry, AppError> {
    let store = StoreManager::new(&config.store).await?.shared();
    let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
    Ok(SessionRegistry::new(store, tokens, &config.session))
}
