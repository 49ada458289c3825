//! # tvctl-core
//!
//! Appliance state machine for tvctl.
//!
//! This crate provides:
//! - Power and channel state for a single appliance
//! - Command semantics (response text and state-change detection)
//! - The fixed channel lineup

pub mod channel;
pub mod state;

pub use channel::{ChannelNumber, CHANNEL_COUNT};
pub use state::{ApplianceState, Execution, UNKNOWN_COMMAND};
