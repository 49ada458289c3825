//! # tvctl-protocol
//!
//! Wire protocol implementation for tvctl appliances.
//!
//! This crate provides:
//! - The closed set of appliance commands and their stable wire codes
//! - Newline framing for the command port (one request line, one response line)
//! - The notification format pushed on the broadcast port

pub mod codec;
pub mod command;
pub mod error;
pub mod notification;

pub use codec::{Decoder, Encoder};
pub use command::Command;
pub use error::ProtocolError;
pub use notification::Notification;

/// Default command port of the first appliance.
pub const DEFAULT_PORT: u16 = 1238;

/// Distance between an appliance's command port and its broadcast port.
pub const BROADCAST_PORT_OFFSET: u16 = 10000;

/// Maximum accepted line length in bytes, excluding the newline.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Returns the broadcast port paired with `port`, if it fits in a `u16`.
pub fn broadcast_port_for(port: u16, offset: u16) -> Option<u16> {
    port.checked_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_port_offset() {
        assert_eq!(
            broadcast_port_for(DEFAULT_PORT, BROADCAST_PORT_OFFSET),
            Some(11238)
        );
        assert_eq!(broadcast_port_for(60000, BROADCAST_PORT_OFFSET), None);
    }
}
