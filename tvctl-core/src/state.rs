//! Power and channel state of one appliance.

use crate::channel::ChannelNumber;
use serde::{Deserialize, Serialize};
use tvctl_protocol::{Command, Notification};

/// Response used by front ends for input that names no command.
pub const UNKNOWN_COMMAND: &str = "Unknown command. Try 'HELP'";

const CANNOT_CHANGE_CHANNEL: &str = "TV is OFF. Cannot change channel.";
const NO_ACTIVE_CHANNEL: &str = "TV is OFF. No active channel.";
const GOODBYE: &str = "Exiting. Goodbye!";

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Response line for the issuing client.
    pub response: String,
    /// Notification to broadcast; present exactly when power or channel changed.
    pub change: Option<Notification>,
    /// Whether the issuing session ends after the response is sent.
    pub terminate: bool,
}

impl Execution {
    fn reply(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            change: None,
            terminate: false,
        }
    }

    fn changed(response: impl Into<String>, change: Notification) -> Self {
        Self {
            response: response.into(),
            change: Some(change),
            terminate: false,
        }
    }

    /// Returns whether the command altered the appliance state.
    pub fn state_changed(&self) -> bool {
        self.change.is_some()
    }
}

/// Appliance state. Starts powered off on channel 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceState {
    power: bool,
    channel: ChannelNumber,
}

impl ApplianceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.power
    }

    pub fn channel(&self) -> ChannelNumber {
        self.channel
    }

    /// Executes a command, mutating the state in place.
    pub fn execute(&mut self, command: Command) -> Execution {
        match command {
            Command::Help => Execution::reply(Command::help_text()),
            Command::TurnOn => {
                if self.power {
                    Execution::reply("TV is already ON")
                } else {
                    self.power = true;
                    Execution::changed("TV turned ON", self.power_notification(true))
                }
            }
            Command::TurnOff => {
                if self.power {
                    self.power = false;
                    Execution::changed("TV turned OFF", self.power_notification(false))
                } else {
                    Execution::reply("TV is already OFF")
                }
            }
            Command::TurnOnOrOff => {
                self.power = !self.power;
                let response = if self.power {
                    "TV turned ON"
                } else {
                    "TV turned OFF"
                };
                Execution::changed(response, self.power_notification(true))
            }
            Command::Status => Execution::reply(self.status_text()),
            Command::GetChannel => {
                if self.power {
                    Execution::reply(format!("Current channel: {}", self.channel))
                } else {
                    Execution::reply(NO_ACTIVE_CHANNEL)
                }
            }
            Command::ChannelUp => self.tune(self.channel.next(), false),
            Command::ChannelDown => self.tune(self.channel.prev(), false),
            Command::Channel1
            | Command::Channel2
            | Command::Channel3
            | Command::Channel4
            | Command::Channel5 => {
                let target = command
                    .direct_channel()
                    .and_then(ChannelNumber::new)
                    .unwrap_or_default();
                self.tune(target, true)
            }
            Command::Exit => Execution {
                response: GOODBYE.to_string(),
                change: None,
                terminate: true,
            },
        }
    }

    fn status_text(&self) -> &'static str {
        if self.power {
            "TV is ON"
        } else {
            "TV is OFF"
        }
    }

    fn power_notification(&self, with_channel: bool) -> Notification {
        Notification::Power {
            on: self.power,
            channel: with_channel.then(|| self.channel.get()),
        }
    }

    fn tune(&mut self, target: ChannelNumber, direct: bool) -> Execution {
        if !self.power {
            return Execution::reply(CANNOT_CHANGE_CHANNEL);
        }

        let response = if direct {
            format!("Switched to channel {}: {}", target, target.label())
        } else {
            format!("Channel changed to {}", target)
        };

        if target == self.channel {
            return Execution::reply(response);
        }

        self.channel = target;
        Execution::changed(
            response,
            Notification::Channel {
                channel: target.get(),
            },
        )
    }
}
