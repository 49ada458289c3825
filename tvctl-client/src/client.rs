//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use std::sync::Arc;
use tvctl_protocol::Command;

/// Command-port client for one appliance.
#[derive(Clone)]
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Sends a command and returns the response line.
    ///
    /// After EXIT the server ends the session, so the client is left
    /// disconnected.
    pub async fn send_command(&self, command: Command) -> Result<String, ClientError> {
        let response = self.conn.request(&command.code().to_string()).await?;
        if command.is_exit() {
            self.conn.reset().await;
        }
        Ok(response)
    }

    /// Fetches the command listing.
    pub async fn help(&self) -> Result<String, ClientError> {
        self.send_command(Command::Help).await
    }

    /// Fetches the power status.
    pub async fn status(&self) -> Result<String, ClientError> {
        self.send_command(Command::Status).await
    }

    /// Ends the session with EXIT.
    pub async fn exit(&self) -> Result<String, ClientError> {
        self.send_command(Command::Exit).await
    }
}
