//! Interactive appliance selector.

use crate::commands::parse_command;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use tvctl_client::TvManager;
use tvctl_core::UNKNOWN_COMMAND;

const HELP_TEXT: &str = r#"
Enter a command code or name to send it to the selected TV, e.g. `2` or `turn on`.
  HELP (1)                      Ask the TV for its command list
  EXIT (0)                      End the session with this TV

Local commands:
  back, b                       Return to the TV list
  quit, q                       Leave the selector
  ?                             Show this help
"#;

/// What the selector should do after a line of input.
enum Step {
    Stay,
    Back,
    Quit,
}

pub async fn run(manager: &TvManager) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "tvctl".bold().cyan());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = home::home_dir()
        .map(|h| h.join(".tvctl_history"))
        .unwrap_or_else(|| ".tvctl_history".into());
    let _ = rl.load_history(&history_path);

    'select: loop {
        let names = manager.names();
        println!("\n{}", "Select a TV:".bold());
        for (i, name) in names.iter().enumerate() {
            println!("  {}. {}", i + 1, name.cyan());
        }
        println!("  0. Quit");

        let name = match rl.readline(&format!("{} ", "tv>".cyan())) {
            Ok(line) => match select(&names, line.trim()) {
                Selection::Quit => break,
                Selection::Tv(name) => name.to_string(),
                Selection::Invalid => {
                    println!("{}", "Invalid selection. Try again.".yellow());
                    continue;
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        };

        println!("Controlling {}. Type '?' for help.", name.cyan());
        loop {
            let prompt = format!("{} ", format!("{}>", name).cyan());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match execute_repl_command(manager, &name, line).await {
                        Step::Stay => {}
                        Step::Back => continue 'select,
                        Step::Quit => break 'select,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue 'select;
                }
                Err(ReadlineError::Eof) => break 'select,
                Err(err) => {
                    println!("{}: {:?}", "Error".red(), err);
                    break 'select;
                }
            }
        }
    }

    let _ = rl.save_history(&history_path);
    manager.close_all().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

enum Selection<'a> {
    Tv(&'a str),
    Quit,
    Invalid,
}

fn select<'a>(names: &[&'a str], input: &str) -> Selection<'a> {
    match input.parse::<usize>() {
        Ok(0) => Selection::Quit,
        Ok(n) => names
            .get(n - 1)
            .copied()
            .map(Selection::Tv)
            .unwrap_or(Selection::Invalid),
        Err(_) => names
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(input))
            .map(Selection::Tv)
            .unwrap_or(Selection::Invalid),
    }
}

async fn execute_repl_command(manager: &TvManager, tv: &str, line: &str) -> Step {
    match line.to_lowercase().as_str() {
        "?" => {
            println!("{}", HELP_TEXT);
            return Step::Stay;
        }
        "back" | "b" => return Step::Back,
        "quit" | "q" => return Step::Quit,
        _ => {}
    }

    let command = match parse_command(line) {
        Some(command) => command,
        None => {
            println!("{}", UNKNOWN_COMMAND.yellow());
            return Step::Stay;
        }
    };

    match manager.send_command(tv, command).await {
        Ok(response) => {
            println!("{}", response);
            if command.is_exit() {
                Step::Back
            } else {
                Step::Stay
            }
        }
        Err(e) => {
            println!("{}: {}", "Error".red(), e);
            Step::Stay
        }
    }
}
