//! TCP server implementation.

use crate::broadcast::{wait_until_set, Broadcaster};
use crate::config::DEFAULT_BROADCAST_CAPACITY;
use crate::error::ServerError;
use crate::handler::CommandHandler;
use crate::session::{Session, SessionGuard, SessionRegistry};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tvctl_core::ApplianceState;
use tvctl_protocol::{broadcast_port_for, Decoder, Encoder, BROADCAST_PORT_OFFSET, DEFAULT_PORT};

/// Pause before accepting again after a failed accept.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Appliance name, used in logs.
    pub name: String,
    /// Host to bind both listeners to.
    pub host: String,
    /// Command port (0 = ephemeral).
    pub port: u16,
    /// Maximum number of concurrent command sessions.
    pub workers: usize,
    /// Explicit broadcast port; overrides `port + broadcast_offset`.
    pub broadcast_port: Option<u16>,
    /// Distance between the bound command port and the broadcast port.
    pub broadcast_offset: u16,
    /// Notifications buffered per subscriber.
    pub broadcast_capacity: usize,
    /// How long shutdown waits for in-flight sessions.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "TV".to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            workers: 4,
            broadcast_port: None,
            broadcast_offset: BROADCAST_PORT_OFFSET,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, workers: usize) -> Self {
        Self {
            host: host.into(),
            port,
            workers,
            ..Default::default()
        }
    }

    /// Sets the appliance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets an explicit broadcast port.
    pub fn with_broadcast_port(mut self, port: u16) -> Self {
        self.broadcast_port = Some(port);
        self
    }

    /// Sets the broadcast port offset.
    pub fn with_broadcast_offset(mut self, offset: u16) -> Self {
        self.broadcast_offset = offset;
        self
    }

    /// Sets the per-subscriber notification buffer.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Returns the command listener address.
    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, but binding failed.
    Created,
    /// Both listeners bound, not yet accepting.
    Bound,
    /// Accepting sessions and subscribers.
    Running,
    /// Shut down.
    Stopped,
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub subscribers_total: AtomicU64,
    pub commands_total: AtomicU64,
    pub state_changes: AtomicU64,
    pub protocol_errors: AtomicU64,
}

struct Listeners {
    command: TcpListener,
    broadcast: TcpListener,
}

/// Session server for one appliance.
pub struct Server {
    config: ServerConfig,
    handler: Arc<CommandHandler>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<ServerStats>,
    sessions: Arc<SessionRegistry>,
    listeners: Mutex<Option<Listeners>>,
    local_addr: Option<SocketAddr>,
    broadcast_addr: Option<SocketAddr>,
    workers: Arc<Semaphore>,
    pool_size: u32,
    shutdown: watch::Sender<bool>,
    state: Mutex<ServerState>,
    running: AtomicBool,
}

impl Server {
    /// Binds both listeners.
    ///
    /// A bind failure is logged and yields a server in the `Created` state,
    /// which refuses to run.
    pub async fn bind(config: ServerConfig) -> Self {
        match Self::try_bind(config.clone()).await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!("[{}] Failed to bind: {}", config.name, e);
                Self::assemble(config, None)
            }
        }
    }

    /// Binds both listeners, returning the bind error.
    pub async fn try_bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.command_addr();
        let command = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_port = command.local_addr()?.port();

        let broadcast_port = match config.broadcast_port {
            Some(port) => port,
            None => broadcast_port_for(local_port, config.broadcast_offset).ok_or(
                ServerError::BroadcastPortOutOfRange {
                    port: local_port,
                    offset: config.broadcast_offset,
                },
            )?,
        };
        let broadcast_addr = format!("{}:{}", config.host, broadcast_port);
        let broadcast = TcpListener::bind(&broadcast_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: broadcast_addr,
                source,
            })?;

        Ok(Self::assemble(config, Some(Listeners { command, broadcast })))
    }

    fn assemble(config: ServerConfig, listeners: Option<Listeners>) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(config.broadcast_capacity));
        let stats = Arc::new(ServerStats::default());
        let handler = Arc::new(CommandHandler::new(broadcaster.clone(), stats.clone()));
        let pool_size = u32::try_from(config.workers.max(1)).unwrap_or(u32::MAX);
        let (shutdown, _) = watch::channel(false);

        let (local_addr, broadcast_addr, state) = match &listeners {
            Some(l) => (
                l.command.local_addr().ok(),
                l.broadcast.local_addr().ok(),
                ServerState::Bound,
            ),
            None => (None, None, ServerState::Created),
        };

        Self {
            config,
            handler,
            broadcaster,
            stats,
            sessions: Arc::new(SessionRegistry::new()),
            listeners: Mutex::new(listeners),
            local_addr,
            broadcast_addr,
            workers: Arc::new(Semaphore::new(pool_size as usize)),
            pool_size,
            shutdown,
            state: Mutex::new(state),
            running: AtomicBool::new(false),
        }
    }

    /// Runs the server until shutdown.
    ///
    /// Returns once both listeners are closed and in-flight sessions have
    /// finished or the grace period has passed.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listeners = match self.listeners.lock().take() {
            Some(listeners) => listeners,
            None => {
                tracing::error!(
                    "[{}] Cannot start: {}",
                    self.config.name,
                    ServerError::NotBound
                );
                return Err(ServerError::NotBound);
            }
        };

        self.running.store(true, Ordering::SeqCst);
        *self.state.lock() = ServerState::Running;
        tracing::info!(
            "[{}] Listening on {} (broadcast on {}, {} workers)",
            self.config.name,
            display_addr(self.local_addr),
            display_addr(self.broadcast_addr),
            self.pool_size
        );

        let broadcast_task = tokio::spawn(Self::accept_subscribers(
            listeners.broadcast,
            self.broadcaster.clone(),
            self.stats.clone(),
            self.shutdown.subscribe(),
            self.config.name.clone(),
        ));

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            // Hold a worker before accepting so excess clients wait in the backlog.
            let permit = tokio::select! {
                permit = self.workers.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = wait_until_set(&mut shutdown_rx) => break,
            };

            tokio::select! {
                result = listeners.command.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let handler = self.handler.clone();
                            let stats = self.stats.clone();
                            let sessions = self.sessions.clone();
                            let conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let _permit = permit;
                                tracing::info!("Client connected: {}", addr);

                                let session = Arc::new(Session::new(addr));
                                let result = Self::handle_connection(
                                    tcp_stream,
                                    session.clone(),
                                    handler,
                                    sessions,
                                    conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    if e.is_protocol_violation() {
                                        tracing::warn!("[{}] Closing session: {}", addr, e);
                                        stats.protocol_errors.fetch_add(1, Ordering::Relaxed);
                                    } else {
                                        tracing::debug!("Connection {} error: {}", addr, e);
                                    }
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!(
                                    "Client disconnected: {} ({} commands)",
                                    addr,
                                    session.command_count()
                                );
                            });
                        }
                        Err(e) => {
                            if !self.is_running() {
                                break;
                            }
                            accept_failed(&self.config.name, "Accept", &e).await;
                        }
                    }
                }
                _ = wait_until_set(&mut shutdown_rx) => break,
            }
        }

        tracing::info!("[{}] Server shutting down", self.config.name);
        self.running.store(false, Ordering::SeqCst);
        drop(listeners.command);
        self.broadcaster.close();
        if let Err(e) = broadcast_task.await {
            tracing::error!("[{}] Broadcast listener failed: {}", self.config.name, e);
        }

        let drained = tokio::time::timeout(
            self.config.shutdown_grace,
            self.workers.acquire_many(self.pool_size),
        )
        .await;
        if drained.is_err() {
            tracing::warn!(
                "[{}] {} sessions still active after {:?}",
                self.config.name,
                self.client_count(),
                self.config.shutdown_grace
            );
        }

        *self.state.lock() = ServerState::Stopped;
        tracing::info!("[{}] Server stopped", self.config.name);
        Ok(())
    }

    async fn accept_subscribers(
        listener: TcpListener,
        broadcaster: Arc<Broadcaster>,
        stats: Arc<ServerStats>,
        mut shutdown: watch::Receiver<bool>,
        name: String,
    ) {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            stats.subscribers_total.fetch_add(1, Ordering::Relaxed);
                            let id = broadcaster.subscribe(tcp_stream, addr);
                            tracing::info!("[{}] Subscriber connected: {} ({})", name, addr, id);
                        }
                        Err(e) => {
                            accept_failed(&name, "Broadcast accept", &e).await;
                        }
                    }
                }
                _ = wait_until_set(&mut shutdown) => break,
            }
        }
    }

    /// Serves one command session until EXIT, EOF, a protocol violation or shutdown.
    async fn handle_connection<S>(
        mut stream: S,
        session: Arc<Session>,
        handler: Arc<CommandHandler>,
        sessions: Arc<SessionRegistry>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let addr = session.remote_addr;
        let guard = SessionGuard::register(sessions, session.clone());

        let result = Self::serve_commands(&mut stream, &session, &handler, &mut shutdown).await;

        drop(guard);
        if let Err(e) = stream.shutdown().await {
            tracing::debug!("[{}] Close error: {}", addr, e);
        }
        result
    }

    async fn serve_commands<S>(
        stream: &mut S,
        session: &Session,
        handler: &CommandHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let addr = session.remote_addr;
        let mut decoder = Decoder::new();
        let mut buf = [0u8; 1024];

        loop {
            while let Some(command) = decoder.decode_command()? {
                let execution = handler.handle(session, command);
                stream
                    .write_all(&Encoder::encode_line(&execution.response))
                    .await?;

                if execution.terminate {
                    tracing::debug!("[{}] Session closing", addr);
                    return Ok(());
                }
            }

            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by client", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] Received {} bytes", addr, n);
                            decoder.extend(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }
                _ = wait_until_set(shutdown) => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Ok(());
                }
            }
        }
    }

    /// Initiates server shutdown.
    ///
    /// A server that never started releases its listeners immediately.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
        if self.listeners.lock().take().is_some() {
            *self.state.lock() = ServerState::Stopped;
        }
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    /// Returns the appliance name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the bound command address.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Returns the bound broadcast address.
    pub fn broadcast_addr(&self) -> Option<SocketAddr> {
        self.broadcast_addr
    }

    /// Returns the bound command port.
    pub fn port(&self) -> Option<u16> {
        self.local_addr.map(|addr| addr.port())
    }

    /// Returns the bound broadcast port.
    pub fn broadcast_port(&self) -> Option<u16> {
        self.broadcast_addr.map(|addr| addr.port())
    }

    /// Returns the number of live command sessions.
    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns the number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Returns a copy of the appliance state.
    pub fn appliance_state(&self) -> ApplianceState {
        self.handler.snapshot()
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

/// Logs a failed accept, then waits before the next attempt.
async fn accept_failed(name: &str, what: &str, e: &std::io::Error) {
    tracing::error!("[{}] {} error: {}", name, what, e);
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

fn display_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|| "<unbound>".to_string())
}
