//! # tvctl-server
//!
//! Session server for a single tvctl appliance.
//!
//! This crate provides:
//! - Command listener with a bounded pool of session workers
//! - Exclusive execution of commands against the appliance state
//! - Broadcast listener fanning state changes out to passive subscribers
//! - Launcher configuration (YAML file plus environment overrides)

pub mod broadcast;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;

pub use broadcast::Broadcaster;
pub use config::{ApplianceConfig, Config, ConfigError};
pub use error::ServerError;
pub use handler::CommandHandler;
pub use server::{Server, ServerConfig, ServerState, ServerStats};
pub use session::{Session, SessionRegistry};
