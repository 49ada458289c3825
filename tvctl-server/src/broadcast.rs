//! Notification fan-out to broadcast port subscribers.

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, watch, Notify};
use tvctl_protocol::Encoder;

struct SubscriberInfo {
    remote_addr: SocketAddr,
    cancel: Arc<Notify>,
}

/// Fans notification lines out to every connected subscriber.
///
/// Each subscriber gets its own forwarder task. A subscriber whose socket
/// fails a write, or whose peer hangs up, is pruned by that task.
pub struct Broadcaster {
    sender: broadcast::Sender<String>,
    subscribers: DashMap<String, SubscriberInfo>,
    closed: watch::Sender<bool>,
}

impl Broadcaster {
    /// Creates a broadcaster buffering up to `capacity` lines per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            subscribers: DashMap::new(),
            closed,
        }
    }

    /// Registers a subscriber connection and starts forwarding notifications to it.
    ///
    /// Notifications published after this call returns are delivered to the
    /// new subscriber. Returns the subscription ID.
    pub fn subscribe<S>(self: &Arc<Self>, stream: S, remote_addr: SocketAddr) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let id = format!("sub-{}", uuid::Uuid::new_v4());
        let receiver = self.sender.subscribe();
        let closed = self.closed.subscribe();
        let cancel = Arc::new(Notify::new());

        self.subscribers.insert(
            id.clone(),
            SubscriberInfo {
                remote_addr,
                cancel: cancel.clone(),
            },
        );

        let broadcaster = Arc::clone(self);
        let sub_id = id.clone();
        tokio::spawn(async move {
            broadcaster
                .forward(sub_id, stream, receiver, closed, cancel)
                .await;
        });

        id
    }

    async fn forward<S>(
        &self,
        id: String,
        stream: S,
        mut receiver: broadcast::Receiver<String>,
        mut closed: watch::Receiver<bool>,
        cancel: Arc<Notify>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut scratch = [0u8; 256];

        loop {
            let line = tokio::select! {
                biased;

                message = receiver.recv() => match message {
                    Ok(line) => line,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Subscriber {} lagged {} notifications", id, n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                read = reader.read(&mut scratch) => match read {
                    Ok(0) => {
                        tracing::debug!("Subscriber {} hung up", id);
                        break;
                    }
                    // Subscribers are passive; anything they send is discarded.
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!("Subscriber {} read failed: {}", id, e);
                        break;
                    }
                },
                _ = cancel.notified() => break,
                _ = wait_until_set(&mut closed) => break,
            };

            // Writes to a stalled peer stay cancellable.
            let frame = Encoder::encode_line(&line);
            let written = tokio::select! {
                result = writer.write_all(&frame) => result,
                _ = cancel.notified() => break,
                _ = wait_until_set(&mut closed) => break,
            };
            if let Err(e) = written {
                tracing::debug!("Subscriber {} write failed: {}", id, e);
                break;
            }
        }

        if let Some((_, info)) = self.subscribers.remove(&id) {
            tracing::info!("Subscriber disconnected: {} ({})", info.remote_addr, id);
        }
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("Subscriber {} close failed: {}", id, e);
        }
    }

    /// Publishes a notification line to all current subscribers.
    ///
    /// Never blocks. Returns the number of subscribers the line was queued for.
    pub fn publish(&self, line: impl Into<String>) -> usize {
        self.sender.send(line.into()).unwrap_or(0)
    }

    /// Disconnects a subscriber.
    ///
    /// Returns true if the subscription was found.
    pub fn unsubscribe(&self, id: &str) -> bool {
        match self.subscribers.get(id) {
            Some(info) => {
                info.cancel.notify_one();
                true
            }
            None => false,
        }
    }

    /// Returns the number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Disconnects every subscriber.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Returns whether the broadcaster has been closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Resolves once the flag is set or its sender is gone.
pub(crate) async fn wait_until_set(flag: &mut watch::Receiver<bool>) {
    let _ = flag.wait_for(|set| *set).await;
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BROADCAST_CAPACITY)
    }
}
