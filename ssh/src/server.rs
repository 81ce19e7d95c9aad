//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Honeypot server implementation
//!
//! The HoneypotServer owns the configuration and the shutdown signal. `serve` binds the
//! listener and spawns the accept loop, which handles one connection at a time and reports
//! each outcome on one of two channels.

use crate::connection::Materializer;
use crate::handshake::{self, engine_config};
use crate::{
    Connection, CredentialInterceptor, CredentialStore, HoneypotError, HostnameResolver, Result,
    ServerConfig, ServerMetrics, SystemResolver, generate_host_key,
};
use metrics::{counter, histogram};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long `shutdown` waits for the accept loop
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Receivers handed to the operator by [`HoneypotServer::serve`]
pub type EventChannels = (mpsc::Receiver<Connection>, mpsc::Receiver<HoneypotError>);

/// SSH honeypot server
///
/// Masquerades as an open SSH server: every username/password combination is accepted and
/// the login is reported as a [`Connection`] on a channel.
///
/// # Example
///
/// ```no_run
/// use lure_ssh::HoneypotServer;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = HoneypotServer::new("0.0.0.0:2222")?;
///     let (mut connections, mut errors) = server.serve().await?;
///
///     tokio::spawn(async move {
///         while let Some(err) = errors.recv().await {
///             eprintln!("{err}");
///         }
///     });
///
///     while let Some(conn) = connections.recv().await {
///         println!("{} / {}", conn, conn.password());
///     }
///     Ok(())
/// }
/// ```
pub struct HoneypotServer {
    /// Server configuration
    config: ServerConfig,
    /// Reverse hostname lookup
    resolver: Arc<dyn HostnameResolver>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Shutdown signal, cancelled once by `stop`
    shutdown: CancellationToken,
    /// Set while the accept loop runs
    running: Arc<AtomicBool>,
    /// Actual bind address, known once serving
    local_addr: OnceLock<SocketAddr>,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl HoneypotServer {
    /// Create a server for `address` with default settings
    ///
    /// The I/O deadline defaults to 5 seconds. Nothing is bound until `serve` is called, so
    /// this never fails: an unusable address is reported by `serve`. An empty address, or one
    /// with an empty port, listens on a free port.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Self::with_config(ServerConfig::new(address))
    }

    /// Create a server from a full configuration
    pub fn with_config(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: Arc::new(SystemResolver),
            metrics: Arc::new(ServerMetrics::new()),
            shutdown: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            local_addr: OnceLock::new(),
            accept_handle: tokio::sync::Mutex::new(None),
        })
    }

    /// Replace the hostname resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn HostnameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Start serving
    ///
    /// Generates a host key, binds the listener and spawns the accept loop, then returns the
    /// connection and error receivers without waiting for any client. Both receivers yield
    /// `None` once the loop has terminated.
    ///
    /// Fails with [`HoneypotError::HostKey`] or [`HoneypotError::Bind`] when setup fails, with
    /// [`HoneypotError::AlreadyRunning`] while a loop is active and with
    /// [`HoneypotError::Stopped`] once `stop` has been called.
    pub async fn serve(&self) -> Result<EventChannels> {
        if self.shutdown.is_cancelled() {
            return Err(HoneypotError::Stopped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HoneypotError::AlreadyRunning);
        }

        match self.start().await {
            Ok(channels) => Ok(channels),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                tracing::error!("Honeypot failed to start: {}", e);
                Err(e)
            }
        }
    }

    async fn start(&self) -> Result<EventChannels> {
        let host_key = generate_host_key()?;

        let bind_error = |source| HoneypotError::Bind {
            address: self.config.address.clone(),
            source,
        };
        let listener = TcpListener::bind(self.config.bind_address())
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        let _ = self.local_addr.set(local_addr);

        tracing::info!("SSH honeypot listening on {}", local_addr);

        let (connections, connections_rx) = mpsc::channel(self.config.event_buffer);
        let (errors, errors_rx) = mpsc::channel(self.config.event_buffer);

        let accept_loop = AcceptLoop {
            listener,
            engine: Arc::new(engine_config(&self.config, host_key)),
            interceptor: CredentialInterceptor::new(Arc::new(CredentialStore::new())),
            resolver: self.resolver.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            running: self.running.clone(),
            connections,
            errors,
        };

        let handle = tokio::spawn(accept_loop.run());
        *self.accept_handle.lock().await = Some(handle);

        Ok((connections_rx, errors_rx))
    }

    /// Signal the accept loop to stop
    ///
    /// Returns immediately. The loop abandons a pending accept or handshake, closes the
    /// listener and then closes both channels. A stopped server cannot serve again.
    pub fn stop(&self) {
        tracing::info!("Stopping SSH honeypot");
        self.shutdown.cancel();
    }

    /// Stop and wait for the accept loop to finish
    pub async fn shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(HoneypotError::NotRunning);
        }

        self.stop();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("Accept loop task failed: {}", e);
                    return Err(HoneypotError::ShutdownIncomplete(e.to_string()));
                }
                Err(_) => {
                    tracing::warn!(
                        "Accept loop did not finish within {:?}",
                        SHUTDOWN_TIMEOUT
                    );
                    return Err(HoneypotError::ShutdownIncomplete(format!(
                        "accept loop still running after {:?}",
                        SHUTDOWN_TIMEOUT
                    )));
                }
            }
        }

        tracing::info!("SSH honeypot shutdown complete");
        Ok(())
    }

    /// Check if the accept loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the bound address once serving
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for HoneypotServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoneypotServer")
            .field("address", &self.config.address)
            .field("local_addr", &self.local_addr())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for HoneypotServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("HoneypotServer dropped while still running");
            self.shutdown.cancel();
        }
    }
}

/// State owned by one run of the accept loop
struct AcceptLoop {
    listener: TcpListener,
    engine: Arc<russh::server::Config>,
    interceptor: CredentialInterceptor,
    resolver: Arc<dyn HostnameResolver>,
    metrics: Arc<ServerMetrics>,
    config: ServerConfig,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
    connections: mpsc::Sender<Connection>,
    errors: mpsc::Sender<HoneypotError>,
}

impl AcceptLoop {
    async fn run(self) {
        loop {
            // biased: a pending shutdown always wins over a pending connection
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let delivered = match accepted {
                Ok((stream, peer_addr)) => self.handle(stream, peer_addr).await,
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    self.metrics.accept_error();
                    counter!("lure.accept.failures").increment(1);
                    self.deliver(&self.errors, HoneypotError::Accept(e)).await
                        && self.backoff().await
                }
            };

            if !delivered {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Accept loop terminated");
    }

    /// Drive one accepted connection to its single event
    ///
    /// Returns `false` if shutdown was requested meanwhile.
    async fn handle(&self, stream: tokio::net::TcpStream, peer_addr: SocketAddr) -> bool {
        tracing::debug!("Accepted connection from {}", peer_addr);
        self.metrics.connection_accepted();
        counter!("lure.connections.accepted").increment(1);

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            outcome = handshake::perform(
                stream,
                peer_addr,
                self.engine.clone(),
                self.interceptor.clone(),
                self.config.io_timeout,
            ) => outcome,
        };

        match outcome {
            Ok(handshake) => {
                histogram!("lure.handshake.duration").record(started.elapsed().as_secs_f64());
                let materializer = Materializer {
                    store: self.interceptor.store(),
                    resolver: self.resolver.as_ref(),
                    lookup_timeout: self.config.lookup_timeout,
                    metrics: &self.metrics,
                };
                let connection = materializer.materialize(handshake).await;

                tracing::info!("Captured login {}", connection);
                self.metrics.credentials_captured();
                counter!("lure.credentials.captured").increment(1);
                self.deliver(&self.connections, connection).await
            }
            Err(e) => {
                self.record_failure(&e);
                self.deliver(&self.errors, e).await
            }
        }
    }

    fn record_failure(&self, error: &HoneypotError) {
        self.metrics.handshake_error();
        counter!("lure.handshake.failures").increment(1);

        if error.is_credential_encoding() {
            tracing::warn!(
                "Credentials not captured, engine rejected non-UTF-8 offer: {}",
                error
            );
            self.metrics.undecodable_credentials();
            counter!("lure.credentials.undecodable").increment(1);
        } else {
            tracing::warn!("{}", error);
            if error.is_timeout() {
                self.metrics.timeout_error();
            }
        }
    }

    /// Send an event, waiting for channel capacity
    ///
    /// An event whose receiver is gone is dropped. Returns `false` if shutdown was requested
    /// while waiting.
    async fn deliver<T>(&self, channel: &mpsc::Sender<T>, event: T) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = channel.send(event) => {
                if sent.is_err() {
                    tracing::warn!("Event receiver closed, dropping event");
                    self.metrics.event_dropped();
                }
                true
            }
        }
    }

    async fn backoff(&self) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.config.accept_backoff) => true,
        }
    }
}
