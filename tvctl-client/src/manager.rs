//! Named appliances and their clients.

use crate::client::Client;
use crate::connection::ConnectionConfig;
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tvctl_protocol::{broadcast_port_for, Command};

/// Where to reach one appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl TvDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Returns the command port address.
    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the broadcast port address for the given offset.
    pub fn broadcast_addr(&self, offset: u16) -> Option<String> {
        broadcast_port_for(self.port, offset).map(|port| format!("{}:{}", self.host, port))
    }
}

/// Holds one client per appliance, in insertion order.
pub struct TvManager {
    tvs: Vec<(TvDescriptor, Client)>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl TvManager {
    pub fn new() -> Self {
        Self {
            tvs: Vec::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Adds an appliance. A descriptor with an existing name replaces the old entry.
    pub fn add_tv(&mut self, descriptor: TvDescriptor) {
        let config = ConnectionConfig::new(descriptor.command_addr())
            .with_connect_timeout(self.connect_timeout)
            .with_request_timeout(self.request_timeout);
        let client = Client::new(config);

        match self.tvs.iter_mut().find(|(d, _)| d.name == descriptor.name) {
            Some(entry) => *entry = (descriptor, client),
            None => self.tvs.push((descriptor, client)),
        }
    }

    /// Returns appliance names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.tvs.iter().map(|(d, _)| d.name.as_str()).collect()
    }

    /// Returns the descriptors in insertion order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TvDescriptor> {
        self.tvs.iter().map(|(d, _)| d)
    }

    /// Looks up a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&TvDescriptor> {
        self.tvs.iter().find(|(d, _)| d.name == name).map(|(d, _)| d)
    }

    /// Looks up a client by name.
    pub fn client(&self, name: &str) -> Result<&Client, ClientError> {
        self.tvs
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, c)| c)
            .ok_or_else(|| ClientError::UnknownAppliance(name.to_string()))
    }

    /// Sends a command to the named appliance, connecting first if needed.
    pub async fn send_command(&self, name: &str, command: Command) -> Result<String, ClientError> {
        let client = self.client(name)?;
        if !client.is_connected() {
            client.connect().await?;
        }
        client.send_command(command).await
    }

    /// Closes every open session.
    pub async fn close_all(&self) {
        for (descriptor, client) in &self.tvs {
            if client.is_connected() {
                if let Err(e) = client.close().await {
                    tracing::debug!("Closing {} failed: {}", descriptor.name, e);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tvs.is_empty()
    }
}

impl Default for TvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tvctl_server::{Server, ServerConfig};

    #[test]
    fn test_insertion_order() {
        let mut manager = TvManager::new();
        manager.add_tv(TvDescriptor::new("Master bedroom", "127.0.0.1", 1238));
        manager.add_tv(TvDescriptor::new("Living room", "127.0.0.1", 1239));
        manager.add_tv(TvDescriptor::new("Kitchen", "127.0.0.1", 1240));

        assert_eq!(manager.names(), vec!["Master bedroom", "Living room", "Kitchen"]);
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.descriptor("Kitchen").unwrap().port, 1240);
        assert!(manager.descriptor("Garage").is_none());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut manager = TvManager::new();
        manager.add_tv(TvDescriptor::new("A", "127.0.0.1", 1));
        manager.add_tv(TvDescriptor::new("B", "127.0.0.1", 2));
        manager.add_tv(TvDescriptor::new("A", "127.0.0.1", 3));

        assert_eq!(manager.names(), vec!["A", "B"]);
        assert_eq!(manager.descriptor("A").unwrap().port, 3);
    }

    #[test]
    fn test_descriptor_addresses() {
        let tv = TvDescriptor::new("Kitchen", "localhost", 1240);
        assert_eq!(tv.command_addr(), "localhost:1240");
        assert_eq!(tv.broadcast_addr(10000).unwrap(), "localhost:11240");
        assert!(tv.broadcast_addr(u16::MAX).is_none());
    }

    #[tokio::test]
    async fn test_unknown_appliance() {
        let manager = TvManager::new();
        let err = manager
            .send_command("Garage", Command::Status)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownAppliance(ref name) if name == "Garage"));
    }

    #[tokio::test]
    async fn test_send_to_independent_appliances() {
        let mut servers = Vec::new();
        let mut manager = TvManager::new();
        for name in ["Living room", "Kitchen"] {
            let config = ServerConfig::new("127.0.0.1", 0, 1)
                .with_name(name)
                .with_broadcast_port(0);
            let server = Arc::new(Server::try_bind(config).await.unwrap());
            let runner = server.clone();
            tokio::spawn(async move { runner.run().await });
            manager.add_tv(TvDescriptor::new(name, "127.0.0.1", server.port().unwrap()));
            servers.push(server);
        }

        assert_eq!(
            manager
                .send_command("Living room", Command::TurnOn)
                .await
                .unwrap(),
            "TV turned ON"
        );
        assert_eq!(
            manager.send_command("Kitchen", Command::Status).await.unwrap(),
            "TV is OFF"
        );

        // EXIT ends the session; the next command reconnects.
        manager
            .send_command("Living room", Command::Exit)
            .await
            .unwrap();
        assert!(!manager.client("Living room").unwrap().is_connected());
        assert_eq!(
            manager
                .send_command("Living room", Command::Status)
                .await
                .unwrap(),
            "TV is ON"
        );

        manager.close_all().await;
        for server in servers {
            server.shutdown();
        }
    }
}
