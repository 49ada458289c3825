//! # tvctl-client
//!
//! Client library for tvctl appliances.
//!
//! This crate provides:
//! - Async request/response client for the command port
//! - Subscriber for the broadcast port
//! - Manager holding one client per named appliance

pub mod client;
pub mod connection;
pub mod error;
pub mod manager;
pub mod subscriber;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use manager::{TvDescriptor, TvManager};
pub use subscriber::Subscriber;
