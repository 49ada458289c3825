//! Command execution against the appliance state.

use crate::broadcast::Broadcaster;
use crate::server::ServerStats;
use crate::session::Session;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tvctl_core::{ApplianceState, Execution};
use tvctl_protocol::Command;

/// Executes commands for every session of one appliance.
///
/// Commands run one at a time under the state guard. A resulting
/// notification is queued for subscribers before the guard is released, so
/// subscribers observe changes in the order they were applied.
pub struct CommandHandler {
    state: Mutex<ApplianceState>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<ServerStats>,
}

impl CommandHandler {
    /// Creates a handler for an appliance that is off on channel 1.
    pub fn new(broadcaster: Arc<Broadcaster>, stats: Arc<ServerStats>) -> Self {
        Self {
            state: Mutex::new(ApplianceState::new()),
            broadcaster,
            stats,
        }
    }

    /// Handles one command from a session.
    pub fn handle(&self, session: &Session, command: Command) -> Execution {
        session.record_command();
        self.stats.commands_total.fetch_add(1, Ordering::Relaxed);
        tracing::info!("[{}] Command: {}", session.remote_addr, command);

        let mut state = self.state.lock();
        let execution = state.execute(command);
        if let Some(change) = execution.change {
            self.stats.state_changes.fetch_add(1, Ordering::Relaxed);
            let delivered = self.broadcaster.publish(change.to_string());
            tracing::debug!(
                "[{}] Broadcast '{}' to {} subscribers",
                session.remote_addr,
                change,
                delivered
            );
        }
        execution
    }

    /// Returns a copy of the current appliance state.
    pub fn snapshot(&self) -> ApplianceState {
        *self.state.lock()
    }

    /// Returns the broadcaster notifications are published to.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn test_handler() -> (CommandHandler, Session) {
        let broadcaster = Arc::new(Broadcaster::new(16));
        let stats = Arc::new(ServerStats::default());
        let session = Session::new(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            50000,
        ));
        (CommandHandler::new(broadcaster, stats), session)
    }

    #[test]
    fn test_handle_updates_state_and_stats() {
        let (handler, session) = test_handler();

        let result = handler.handle(&session, Command::TurnOn);
        assert_eq!(result.response, "TV turned ON");
        assert!(handler.snapshot().is_on());

        let result = handler.handle(&session, Command::Status);
        assert_eq!(result.response, "TV is ON");

        assert_eq!(session.command_count(), 2);
        assert_eq!(handler.stats.commands_total.load(Ordering::Relaxed), 2);
        assert_eq!(handler.stats.state_changes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_state_shared_between_sessions() {
        let (handler, first) = test_handler();
        let second = Session::new(first.remote_addr);

        handler.handle(&first, Command::TurnOn);
        handler.handle(&second, Command::Channel4);

        let result = handler.handle(&first, Command::GetChannel);
        assert_eq!(result.response, "Current channel: 4");
    }

    #[tokio::test]
    async fn test_only_changes_are_broadcast() {
        let (handler, session) = test_handler();
        let (client, server) = tokio::io::duplex(1024);
        handler
            .broadcaster()
            .subscribe(server, session.remote_addr);

        for command in [
            Command::Status,
            Command::TurnOn,
            Command::TurnOn,
            Command::Help,
            Command::ChannelDown,
            Command::Channel5,
            Command::TurnOff,
        ] {
            handler.handle(&session, command);
        }
        handler.broadcaster().close();

        let mut lines = BufReader::new(client).lines();
        let mut received = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line);
        }
        assert_eq!(
            received,
            vec!["TV_STATE_CHANGE: ON, Channel: 1", "CHANNEL_CHANGE: 5", "TV_STATE_CHANGE: OFF"]
        );
    }

    #[test]
    fn test_concurrent_toggles() {
        let (handler, session) = test_handler();
        let handler = Arc::new(handler);
        let session = Arc::new(session);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                let session = session.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        handler.handle(&session, Command::TurnOnOrOff);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert!(!handler.snapshot().is_on());
        assert_eq!(handler.stats.state_changes.load(Ordering::Relaxed), 200);
        assert_eq!(session.command_count(), 200);
    }
}
