use crate::config::HarnessConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "twisp-local")]
#[command(about = "Run the Twisp local container for integration testing")]
pub struct CliArgs {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Start the container, print its GraphQL endpoint and wait for Ctrl-C
    Up {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,

        #[arg(long, help = "Leave the container running on exit")]
        keep_alive: bool,

        #[arg(long, help = "Do not forward container logs")]
        no_logs: bool,
    },

    /// Poll a health endpoint until it answers
    Health {
        #[arg(long, default_value = "http://localhost:8080/healthcheck")]
        url: String,

        #[arg(long, default_value = "120")]
        timeout: u64,
    },
}

impl CliArgs {
    /// 讀取設定檔（若有）並套用環境變數
    pub fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
        let config = match path {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        }
        .with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}
