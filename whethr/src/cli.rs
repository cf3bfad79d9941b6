use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use whethr_core::{Config, HatAdvisor, MemorySessionStore, ServiceId};

use crate::{pages::Pages, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "whethr", version, about = "Should you wear a hat today?")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for an outbound service.
    Configure {
        /// Service short name: "ipstack", "locationiq" or "openweather".
        service: String,
    },

    /// Run the web server.
    Serve {
        /// Address to listen on; overrides `server.bind` from the config.
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let mut config = Config::load_from(&path)?;

        match self.command {
            Command::Configure { service } => {
                let id = ServiceId::try_from(service.as_str())?;

                let api_key = Password::new(&format!("API key for {id} ({}):", id.purpose()))
                    .without_confirmation()
                    .prompt()
                    .context("Failed to read API key")?;

                config.upsert_service_api_key(id, api_key.trim().to_string());
                config.save_to(&path)?;

                println!("Saved {id} credentials to {}", path.display());
                let missing = config.missing_services();
                if !missing.is_empty() {
                    let names: Vec<_> = missing.iter().map(ServiceId::as_str).collect();
                    println!("Still missing: {}", names.join(", "));
                }
            }
            Command::Serve { bind } => {
                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                let addr: SocketAddr =
                    bind.parse().with_context(|| format!("Invalid bind address '{bind}'"))?;

                let state = server::AppState {
                    advisor: Arc::new(HatAdvisor::from_config(&config)?),
                    sessions: Arc::new(MemorySessionStore::new()),
                    pages: Arc::new(Pages::new()?),
                };

                server::serve(addr, state).await?;
            }
        }

        Ok(())
    }
}
