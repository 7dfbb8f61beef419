//! Unix socket listener.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::commands::CommandRegistry;
use crate::config::Settings;
use crate::error::DaemonError;
use crate::forwarder::{HciProbe, ServiceController};

use super::handle_connection;

/// Connection metrics for monitoring.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Total requests processed.
    pub requests_total: AtomicU64,
    /// Total failed requests.
    pub requests_failed: AtomicU64,
    /// Currently active connections.
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    /// Create new connection metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment request count.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get total request count.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get failed request count.
    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Get active connection count.
    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Clear the way for binding: remove a stale socket file and make sure
/// the parent directory exists.
///
/// A symlink planted at the socket path is refused, not followed.
fn prepare_socket_path(path: &Path) -> Result<(), DaemonError> {
    if let Ok(metadata) = std::fs::symlink_metadata(path) {
        if metadata.file_type().is_symlink() {
            return Err(DaemonError::Socket {
                message: format!("Socket path {} is a symlink, refusing to remove", path.display()),
            });
        }
        std::fs::remove_file(path).map_err(|e| DaemonError::Socket {
            message: format!("Failed to remove stale socket {}: {}", path.display(), e),
        })?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DaemonError::Socket {
            message: format!("Failed to create socket directory {}: {}", parent.display(), e),
        })?;
    }

    Ok(())
}

/// Apply the configured octal mode to the socket file.
fn apply_socket_permissions(path: &Path, mode_str: &str) -> Result<(), DaemonError> {
    let mode = u32::from_str_radix(mode_str, 8).map_err(|e| DaemonError::Socket {
        message: format!("Invalid socket permissions '{}': {}", mode_str, e),
    })?;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        DaemonError::Socket {
            message: format!("Failed to set permissions on {}: {}", path.display(), e),
        }
    })
}

/// Unix socket server.
pub struct SocketListener {
    listener: UnixListener,
    settings: Arc<Settings>,
    command_registry: Arc<CommandRegistry>,
    metrics: Arc<ConnectionMetrics>,
    /// Semaphore for connection limiting
    connection_semaphore: Arc<Semaphore>,
}

impl SocketListener {
    /// Create and bind a new socket listener.
    pub async fn bind(settings: Arc<Settings>) -> Result<Self, DaemonError> {
        let socket_path = &settings.socket.path;

        prepare_socket_path(socket_path)?;

        let listener = UnixListener::bind(socket_path).map_err(|e| DaemonError::Socket {
            message: format!("Failed to bind to socket {}: {}", socket_path.display(), e),
        })?;

        apply_socket_permissions(socket_path, &settings.socket.permissions)?;

        // One controller and one probe, shared by every command that
        // needs them
        let controller = Arc::new(ServiceController::from_config(&settings.forwarder));
        let probe = Arc::new(HciProbe::from_config(&settings.diagnostics));
        let command_registry = Arc::new(CommandRegistry::new(controller, probe));

        let connection_semaphore =
            Arc::new(Semaphore::new(settings.limits.max_concurrent_requests));

        info!(
            path = %socket_path.display(),
            unit = %settings.forwarder.unit,
            max_connections = settings.limits.max_concurrent_requests,
            "Socket listener bound"
        );

        Ok(Self {
            listener,
            settings,
            command_registry,
            metrics: Arc::new(ConnectionMetrics::new()),
            connection_semaphore,
        })
    }

    /// Hand an accepted connection to its own task.
    ///
    /// Connections beyond the concurrency limit are dropped, which
    /// rejects the client.
    fn spawn_handler(&self, stream: UnixStream) {
        let permit = match self.connection_semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    max = self.settings.limits.max_concurrent_requests,
                    "Connection limit reached, rejecting connection"
                );
                return;
            }
        };

        let settings = Arc::clone(&self.settings);
        let command_registry = Arc::clone(&self.command_registry);
        let metrics = Arc::clone(&self.metrics);

        metrics.active_connections.fetch_add(1, Ordering::Relaxed);
        debug!(active = metrics.active(), "New connection accepted");

        tokio::spawn(async move {
            let _permit = permit; // released when the task completes
            let success = match handle_connection(stream, settings, command_registry).await {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "Connection handler error");
                    false
                }
            };

            metrics.record_request(success);
            metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
            debug!(active = metrics.active(), success = success, "Connection closed");
        });
    }

    /// Run the socket listener, accepting connections.
    ///
    /// The listener stops accepting new connections when `shutdown` is
    /// notified. Active connections continue until they complete.
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), DaemonError> {
        info!("Socket listener running, waiting for connections...");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => self.spawn_handler(stream),
                        Err(e) => warn!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown.notified() => {
                    info!(
                        total = self.metrics.total_requests(),
                        failed = self.metrics.failed_requests(),
                        "Shutdown signal received, stopping listener"
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Wait for all active connections to drain.
    ///
    /// Returns immediately if there are no active connections.
    pub async fn wait_for_drain(&self) {
        let poll_interval = std::time::Duration::from_millis(100);

        while self.metrics.active() > 0 {
            debug!(
                active = self.metrics.active(),
                "Waiting for connections to drain"
            );
            tokio::time::sleep(poll_interval).await;
        }

        info!("All connections drained");
    }
}
