//! tvctl-cli - Command-line interface for tvctl appliances
//!
//! Provides an interactive selector, one-shot commands and a broadcast watcher.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tvctl_client::{Subscriber, TvDescriptor, TvManager};
use tvctl_server::Config;

#[derive(Parser)]
#[command(name = "tvctl-cli")]
#[command(about = "Control tvctl appliances from the command line")]
#[command(version)]
struct Cli {
    /// Path to the appliance configuration file
    #[arg(short, long, env = "TVCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the host every appliance is reached on
    #[arg(long, env = "TVCTL_HOST")]
    host: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive selector
    Repl,

    /// Send one command to an appliance
    Send {
        /// Appliance name
        #[arg(short, long)]
        tv: String,

        /// Command code or name (e.g. 2, TURN_ON, "channel up")
        command: String,
    },

    /// Stream state changes from an appliance until Ctrl+C
    Watch {
        /// Appliance name
        #[arg(short, long)]
        tv: String,

        /// Print notifications as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured appliances
    List,

    /// Print the command table
    Commands,
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_manager(config: &Config, timeout: Duration) -> TvManager {
    let mut manager = TvManager::new().with_timeouts(timeout, timeout * 6);
    for (index, appliance) in config.appliances.iter().enumerate() {
        if let Some(port) = config.command_port(index) {
            manager.add_tv(TvDescriptor::new(
                appliance.name.clone(),
                config.host.clone(),
                port,
            ));
        }
    }
    manager
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(|e| {
        eprintln!("{}: {}", "Configuration error".red(), e);
        e
    })?;
    let timeout = Duration::from_secs(cli.timeout.max(1));
    let manager = build_manager(&config, timeout);

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(&manager).await?;
        }
        Some(Commands::Watch { tv, json }) => {
            let index = config
                .appliances
                .iter()
                .position(|a| a.name == tv)
                .ok_or_else(|| tvctl_client::ClientError::UnknownAppliance(tv.clone()))?;
            let port = config
                .broadcast_port(index)
                .ok_or("broadcast port out of range")?;
            let addr = format!("{}:{}", config.host, port);

            let mut subscriber = Subscriber::connect(&addr, timeout).await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;
            eprintln!("{} {} on {}", "Watching".green(), tv.cyan(), addr);
            eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

            loop {
                tokio::select! {
                    notification = subscriber.next_notification() => {
                        match notification {
                            Ok(Some(n)) => {
                                if json {
                                    println!("{}", serde_json::to_string(&n)?);
                                } else {
                                    println!("{}", n);
                                }
                            }
                            Ok(None) => {
                                eprintln!("{}", "Connection closed".red());
                                break;
                            }
                            Err(e) => {
                                eprintln!("{}: {}", "Error".red(), e);
                                break;
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!("\n{}", "Stopping watch...".dimmed());
                        break;
                    }
                }
            }
        }
        Some(cmd) => match commands::execute(&manager, &config, cmd).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    manager.close_all().await;
    Ok(())
}
