//! Connection management.

use crate::error::ClientError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tvctl_protocol::{Decoder, Encoder};

/// Read buffer size for socket reads.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address (`host:port`).
    pub addr: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

struct LineStream {
    stream: TcpStream,
    decoder: Decoder,
}

impl LineStream {
    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            if let Some(line) = self.decoder.decode_line()? {
                return Ok(line);
            }

            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                tracing::debug!("Connection closed (0 bytes)");
                return Err(ClientError::ConnectionClosed);
            }
            self.decoder.extend(&buf[..n]);
        }
    }
}

/// A line-oriented connection to an appliance port.
///
/// Requests are serialized: each one holds the stream until its reply line
/// has been read.
pub struct Connection {
    config: ConnectionConfig,
    io: Mutex<Option<LineStream>>,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            io: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        *self.io.lock().await = Some(LineStream {
            stream,
            decoder: Decoder::new(),
        });
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Sends one line and waits for the reply line.
    pub async fn request(&self, line: &str) -> Result<String, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let result = tokio::time::timeout(self.config.request_timeout, async {
            io.stream.write_all(&Encoder::encode_line(line)).await?;
            io.read_line().await
        })
        .await
        .unwrap_or_else(|_| {
            tracing::debug!("Request '{}' timed out", line);
            Err(ClientError::Timeout)
        });

        if let Err(ClientError::ConnectionClosed) = result {
            self.connected.store(false, Ordering::SeqCst);
            guard.take();
        }
        result
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut io) = self.io.lock().await.take() {
            tracing::debug!("Closing connection to {}", self.config.addr);
            io.stream.shutdown().await?;
        }
        Ok(())
    }

    /// Drops the stream without a graceful shutdown.
    pub(crate) async fn reset(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.io.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::new("127.0.0.1:1238");
        assert_eq!(config.addr, "127.0.0.1:1238");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_request_before_connect() {
        let conn = Connection::new(ConnectionConfig::new("127.0.0.1:1"));
        assert!(matches!(
            conn.request("5").await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_request_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, "5");
            writer.write_all(b"TV is OFF\r\n").await.unwrap();

            // Hang up without answering the second request.
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, "5");
        });

        let conn = Connection::new(ConnectionConfig::new(addr.to_string()));
        conn.connect().await.unwrap();
        assert_eq!(conn.request("5").await.unwrap(), "TV is OFF");

        assert!(matches!(
            conn.request("5").await,
            Err(ClientError::ConnectionClosed)
        ));
        assert!(!conn.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let conn = Connection::new(
            ConnectionConfig::new(addr.to_string())
                .with_request_timeout(Duration::from_millis(100)),
        );
        conn.connect().await.unwrap();
        assert!(matches!(conn.request("5").await, Err(ClientError::Timeout)));
    }
}
