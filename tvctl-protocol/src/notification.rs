//! State-change notifications pushed to broadcast subscribers.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const POWER_PREFIX: &str = "TV_STATE_CHANGE: ";
const CHANNEL_PREFIX: &str = "CHANNEL_CHANGE: ";
const CHANNEL_SUFFIX: &str = ", Channel: ";

/// A notification line sent on the broadcast port.
///
/// Power notifications carry the channel only when the change came from a
/// command that can switch the appliance on (`TURN_ON`, `TURN_ON_OR_OFF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Power state changed.
    Power {
        on: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<u8>,
    },
    /// Active channel changed while the power stayed on.
    Channel { channel: u8 },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Power { on, channel } => {
                write!(f, "{}{}", POWER_PREFIX, if *on { "ON" } else { "OFF" })?;
                if let Some(channel) = channel {
                    write!(f, "{}{}", CHANNEL_SUFFIX, channel)?;
                }
                Ok(())
            }
            Notification::Channel { channel } => write!(f, "{}{}", CHANNEL_PREFIX, channel),
        }
    }
}

impl FromStr for Notification {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(&['\r', '\n'][..]);
        let malformed = || ProtocolError::MalformedNotification(line.to_string());

        if let Some(rest) = line.strip_prefix(POWER_PREFIX) {
            let (power, channel) = match rest.split_once(CHANNEL_SUFFIX) {
                Some((power, channel)) => {
                    (power, Some(channel.parse::<u8>().map_err(|_| malformed())?))
                }
                None => (rest, None),
            };
            let on = match power {
                "ON" => true,
                "OFF" => false,
                _ => return Err(malformed()),
            };
            Ok(Notification::Power { on, channel })
        } else if let Some(rest) = line.strip_prefix(CHANNEL_PREFIX) {
            let channel = rest.parse::<u8>().map_err(|_| malformed())?;
            Ok(Notification::Channel { channel })
        } else {
            Err(malformed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_format() {
        let n = Notification::Power {
            on: true,
            channel: Some(1),
        };
        assert_eq!(n.to_string(), "TV_STATE_CHANGE: ON, Channel: 1");
    }

    #[test]
    fn test_power_off_format_has_no_channel() {
        let n = Notification::Power {
            on: false,
            channel: None,
        };
        assert_eq!(n.to_string(), "TV_STATE_CHANGE: OFF");
    }

    #[test]
    fn test_channel_format() {
        let n = Notification::Channel { channel: 4 };
        assert_eq!(n.to_string(), "CHANNEL_CHANGE: 4");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "TV_STATE_CHANGE: OFF, Channel: 5\n".parse::<Notification>().unwrap(),
            Notification::Power {
                on: false,
                channel: Some(5)
            }
        );
        assert_eq!(
            "TV_STATE_CHANGE: OFF".parse::<Notification>().unwrap(),
            Notification::Power {
                on: false,
                channel: None
            }
        );
        assert_eq!(
            "CHANNEL_CHANGE: 2".parse::<Notification>().unwrap(),
            Notification::Channel { channel: 2 }
        );
    }

    #[test]
    fn test_parse_malformed() {
        for line in ["", "TV_STATE_CHANGE: MAYBE", "CHANNEL_CHANGE: x", "hello"] {
            assert!(matches!(
                line.parse::<Notification>(),
                Err(ProtocolError::MalformedNotification(_))
            ));
        }
    }

    #[test]
    fn test_serialization() {
        let n = Notification::Channel { channel: 3 };
        let json = serde_json::to_value(n).unwrap();
        assert_eq!(json, serde_json::json!({"type": "channel", "channel": 3}));

        let n = Notification::Power {
            on: false,
            channel: None,
        };
        let json = serde_json::to_value(n).unwrap();
        assert_eq!(json, serde_json::json!({"type": "power", "on": false}));
    }
}
