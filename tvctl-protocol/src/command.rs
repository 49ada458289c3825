//! Appliance commands and their wire codes.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Commands understood by an appliance.
///
/// The discriminant is the wire code and is part of the protocol contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Command {
    Exit = 0,
    Help = 1,
    TurnOn = 2,
    TurnOff = 3,
    TurnOnOrOff = 4,
    Status = 5,
    ChannelUp = 6,
    ChannelDown = 7,
    GetChannel = 8,
    #[serde(rename = "CHANNEL_1")]
    Channel1 = 9,
    #[serde(rename = "CHANNEL_2")]
    Channel2 = 10,
    #[serde(rename = "CHANNEL_3")]
    Channel3 = 11,
    #[serde(rename = "CHANNEL_4")]
    Channel4 = 12,
    #[serde(rename = "CHANNEL_5")]
    Channel5 = 13,
}

impl Command {
    /// All commands, ordered by wire code.
    pub const ALL: [Command; 14] = [
        Command::Exit,
        Command::Help,
        Command::TurnOn,
        Command::TurnOff,
        Command::TurnOnOrOff,
        Command::Status,
        Command::ChannelUp,
        Command::ChannelDown,
        Command::GetChannel,
        Command::Channel1,
        Command::Channel2,
        Command::Channel3,
        Command::Channel4,
        Command::Channel5,
    ];

    /// Decodes a wire code.
    pub fn from_code(code: i64) -> Result<Self, ProtocolError> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| i64::from(command.code()) == code)
            .ok_or(ProtocolError::InvalidCommandCode(code))
    }

    /// Returns the wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Command::Exit => "EXIT",
            Command::Help => "HELP",
            Command::TurnOn => "TURN_ON",
            Command::TurnOff => "TURN_OFF",
            Command::TurnOnOrOff => "TURN_ON_OR_OFF",
            Command::Status => "STATUS",
            Command::ChannelUp => "CHANNEL_UP",
            Command::ChannelDown => "CHANNEL_DOWN",
            Command::GetChannel => "GET_CHANNEL",
            Command::Channel1 => "CHANNEL_1",
            Command::Channel2 => "CHANNEL_2",
            Command::Channel3 => "CHANNEL_3",
            Command::Channel4 => "CHANNEL_4",
            Command::Channel5 => "CHANNEL_5",
        }
    }

    /// Looks a command up by name.
    ///
    /// Matching ignores case and treats spaces and dashes as underscores, so
    /// `turn on`, `TURN-ON` and `TURN_ON` are equivalent.
    pub fn from_name(name: &str) -> Result<Self, ProtocolError> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|command| command.name() == normalized)
            .ok_or_else(|| ProtocolError::UnknownCommandName(name.trim().to_string()))
    }

    /// Returns the channel selected by a direct channel command.
    pub fn direct_channel(self) -> Option<u8> {
        match self {
            Command::Channel1 => Some(1),
            Command::Channel2 => Some(2),
            Command::Channel3 => Some(3),
            Command::Channel4 => Some(4),
            Command::Channel5 => Some(5),
            _ => None,
        }
    }

    /// Returns whether this command closes the issuing session.
    pub fn is_exit(self) -> bool {
        self == Command::Exit
    }

    /// Renders the single-line command listing returned by HELP.
    ///
    /// Commands are listed by wire code with EXIT last.
    pub fn help_text() -> String {
        let listing = Self::ALL
            .iter()
            .skip(1)
            .chain(std::iter::once(&Command::Exit))
            .map(|command| format!("{}({})", command.name(), command.code()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Available commands: {}", listing)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

impl TryFrom<i64> for Command {
    type Error = ProtocolError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Command::from_code(code)
    }
}

/// Parses either a decimal wire code or a command name.
impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(code) => Command::from_code(code),
            Err(_) => Command::from_name(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Command::Exit.code(), 0);
        assert_eq!(Command::Help.code(), 1);
        assert_eq!(Command::TurnOnOrOff.code(), 4);
        assert_eq!(Command::GetChannel.code(), 8);
        assert_eq!(Command::Channel1.code(), 9);
        assert_eq!(Command::Channel5.code(), 13);
    }

    #[test]
    fn test_codes_are_unique_and_ordered() {
        for (index, command) in Command::ALL.iter().enumerate() {
            assert_eq!(command.code() as usize, index);
        }
    }

    #[test]
    fn test_decode_zero_is_exit() {
        assert_eq!(Command::from_code(0).unwrap(), Command::Exit);
    }

    #[test]
    fn test_decode_unknown_code() {
        for code in [-1, 14, 100, i64::MAX, i64::MIN] {
            match Command::from_code(code) {
                Err(ProtocolError::InvalidCommandCode(c)) => assert_eq!(c, code),
                other => panic!("expected InvalidCommandCode for {}, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Command::from_name("TURN_ON").unwrap(), Command::TurnOn);
        assert_eq!(Command::from_name("turn on").unwrap(), Command::TurnOn);
        assert_eq!(Command::from_name(" channel-3 ").unwrap(), Command::Channel3);
        assert!(matches!(
            Command::from_name("volume up"),
            Err(ProtocolError::UnknownCommandName(_))
        ));
    }

    #[test]
    fn test_from_str_accepts_code_or_name() {
        assert_eq!("5".parse::<Command>().unwrap(), Command::Status);
        assert_eq!("status".parse::<Command>().unwrap(), Command::Status);
        assert!("42".parse::<Command>().is_err());
    }

    #[test]
    fn test_direct_channel() {
        assert_eq!(Command::Channel3.direct_channel(), Some(3));
        assert_eq!(Command::ChannelUp.direct_channel(), None);
    }

    #[test]
    fn test_help_text_lists_every_command() {
        let help = Command::help_text();
        assert!(help.starts_with("Available commands: HELP(1)"));
        assert!(help.ends_with("EXIT(0)"));
        assert!(!help.contains('\n'));
        for command in Command::ALL {
            assert!(help.contains(&format!("{}({})", command.name(), command.code())));
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Command::TurnOnOrOff).unwrap();
        assert_eq!(json, "\"TURN_ON_OR_OFF\"");

        let parsed: Command = serde_json::from_str("\"CHANNEL_4\"").unwrap();
        assert_eq!(parsed, Command::Channel4);
    }

    proptest! {
        #[test]
        fn prop_code_roundtrip(index in 0usize..Command::ALL.len()) {
            let command = Command::ALL[index];
            prop_assert_eq!(Command::from_code(i64::from(command.code())).unwrap(), command);
        }

        #[test]
        fn prop_unknown_codes_rejected(code in any::<i64>().prop_filter("known", |c| !(0..=13).contains(c))) {
            prop_assert!(Command::from_code(code).is_err());
        }
    }
}
