//! Broadcast port subscriber.

use crate::error::ClientError;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tvctl_protocol::{Decoder, Notification};

/// Passive listener on an appliance's broadcast port.
pub struct Subscriber {
    stream: TcpStream,
    decoder: Decoder,
}

impl Subscriber {
    /// Connects to a broadcast port.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ClientError> {
        tracing::debug!("Subscribing to {}...", addr);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)??;

        Ok(Self {
            stream,
            decoder: Decoder::new(),
        })
    }

    /// Waits for the next notification line.
    ///
    /// Returns `None` once the server closes the broadcast connection.
    pub async fn next_line(&mut self) -> Result<Option<String>, ClientError> {
        let mut buf = [0u8; 512];
        loop {
            if let Some(line) = self.decoder.decode_line()? {
                return Ok(Some(line));
            }

            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                tracing::debug!("Broadcast connection closed");
                return Ok(None);
            }
            self.decoder.extend(&buf[..n]);
        }
    }

    /// Waits for the next notification.
    pub async fn next_notification(&mut self) -> Result<Option<Notification>, ClientError> {
        match self.next_line().await? {
            Some(line) => Ok(Some(line.parse()?)),
            None => Ok(None),
        }
    }
}
