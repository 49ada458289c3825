//! Command execution.

use crate::Commands;
use colored::Colorize;
use tvctl_client::TvManager;
use tvctl_core::UNKNOWN_COMMAND;
use tvctl_protocol::Command;
use tvctl_server::Config;

/// Executes a command and returns the formatted output.
pub async fn execute(
    manager: &TvManager,
    config: &Config,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        // Interactive and streaming commands are handled in main.rs
        Commands::Repl | Commands::Watch { .. } => unreachable!(),

        Commands::Send { tv, command } => {
            let command = parse_command(&command).ok_or_else(|| UNKNOWN_COMMAND.to_string())?;
            let response = manager.send_command(&tv, command).await?;
            Ok(format!("{} {}", format!("[{}]", tv).cyan(), response))
        }

        Commands::List => Ok(format_appliances(config)),

        Commands::Commands => Ok(format_command_table()),
    }
}

/// Parses user input as a command code or name.
pub fn parse_command(input: &str) -> Option<Command> {
    input.parse().ok()
}

/// Formats the configured appliances as a table.
pub fn format_appliances(config: &Config) -> String {
    let mut output = format!(
        "{}\n",
        format!(
            "{:<3} {:<20} {:<22} {}",
            "#", "NAME", "COMMAND", "BROADCAST"
        )
        .bold()
    );
    for (index, appliance) in config.appliances.iter().enumerate() {
        let port = |p: Option<u16>| {
            p.map(|p| format!("{}:{}", config.host, p))
                .unwrap_or_else(|| "-".to_string())
        };
        output.push_str(&format!(
            "{:<3} {:<20} {:<22} {}\n",
            index + 1,
            appliance.name.cyan(),
            port(config.command_port(index)),
            port(config.broadcast_port(index))
        ));
    }
    output
}

/// Formats the command table.
pub fn format_command_table() -> String {
    let mut output = format!("{}\n", format!("{:<5} {}", "CODE", "COMMAND").bold());
    for command in Command::ALL {
        output.push_str(&format!(
            "{:<5} {}\n",
            command.code().to_string().yellow(),
            command.name()
        ));
    }
    output
}
