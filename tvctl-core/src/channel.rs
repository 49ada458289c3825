//! Channel lineup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of channels an appliance can tune to.
pub const CHANNEL_COUNT: u8 = 5;

const LABELS: [&str; CHANNEL_COUNT as usize] = [
    "NRK",
    "National Geographic",
    "Discovery Channel",
    "HBO",
    "TV2",
];

/// A channel number in `1..=CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChannelNumber(u8);

impl ChannelNumber {
    pub const FIRST: ChannelNumber = ChannelNumber(1);
    pub const LAST: ChannelNumber = ChannelNumber(CHANNEL_COUNT);

    /// Returns the channel with the given number, if it exists.
    pub fn new(number: u8) -> Option<Self> {
        (1..=CHANNEL_COUNT)
            .contains(&number)
            .then_some(ChannelNumber(number))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Next channel, wrapping from the last back to the first.
    pub fn next(self) -> Self {
        ChannelNumber(self.0 % CHANNEL_COUNT + 1)
    }

    /// Previous channel, wrapping from the first to the last.
    pub fn prev(self) -> Self {
        if self == Self::FIRST {
            Self::LAST
        } else {
            ChannelNumber(self.0 - 1)
        }
    }

    /// Broadcaster name shown when the channel is selected directly.
    pub fn label(self) -> &'static str {
        LABELS[(self.0 - 1) as usize]
    }
}

impl Default for ChannelNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for ChannelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChannelNumber> for u8 {
    fn from(channel: ChannelNumber) -> Self {
        channel.0
    }
}

impl TryFrom<u8> for ChannelNumber {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        ChannelNumber::new(number)
            .ok_or_else(|| format!("channel {} out of range 1..={}", number, CHANNEL_COUNT))
    }
}
