//! Per-connection handler.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{verify_peer, PeerInfo};
use crate::commands::{CommandParams, CommandRegistry, ExecutionContext};
use crate::config::Settings;
use crate::error::{DaemonError, ProtocolErrorKind};
use crate::protocol::{read_message, write_message, Request, Response};

/// Map a daemon error to the code reported to clients.
fn error_code(error: &DaemonError) -> &'static str {
    match error {
        DaemonError::Validation { .. } => "VALIDATION_ERROR",
        DaemonError::Command { .. } => "COMMAND_ERROR",
        DaemonError::Auth { .. } => "AUTH_ERROR",
        DaemonError::Protocol { .. } => "PROTOCOL_ERROR",
        _ => "INTERNAL_ERROR",
    }
}

/// Run a framed read or write under the socket deadline.
async fn with_deadline<F, T>(deadline: Duration, op: F) -> Result<T, DaemonError>
where
    F: std::future::Future<Output = Result<T, DaemonError>>,
{
    timeout(deadline, op).await.map_err(|_| DaemonError::Protocol {
        kind: ProtocolErrorKind::ConnectionTimeout,
    })?
}

/// Handle a single client connection.
pub async fn handle_connection(
    stream: UnixStream,
    settings: Arc<Settings>,
    command_registry: Arc<CommandRegistry>,
) -> Result<(), DaemonError> {
    // Peer credential verification needs the std stream
    let std_stream = stream.into_std().map_err(|e| DaemonError::Socket {
        message: format!("Failed to convert to std stream: {}", e),
    })?;

    let peer = verify_peer(&std_stream, &settings.security.allowed_peer_uids)?;
    debug!(uid = peer.uid, gid = peer.gid, pid = peer.pid, "Peer authenticated");

    std_stream
        .set_nonblocking(true)
        .map_err(|e| DaemonError::Socket {
            message: format!("Failed to set non-blocking: {}", e),
        })?;
    let stream = UnixStream::from_std(std_stream).map_err(|e| DaemonError::Socket {
        message: format!("Failed to convert back to tokio stream: {}", e),
    })?;

    let (mut reader, mut writer) = stream.into_split();

    // Process requests in a loop
    loop {
        let result = process_request(
            &mut reader,
            &mut writer,
            &settings,
            &command_registry,
            &peer,
        )
        .await;

        match result {
            Ok(()) => continue,
            Err(DaemonError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!(uid = peer.uid, "Client disconnected");
                return Ok(());
            }
            Err(DaemonError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            }) => {
                warn!(uid = peer.uid, "Connection timed out");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Process a single request from the client.
async fn process_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    settings: &Settings,
    command_registry: &CommandRegistry,
    peer: &PeerInfo,
) -> Result<(), DaemonError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket_timeout = Duration::from_secs(settings.limits.socket_timeout_seconds);
    let msg = with_deadline(
        socket_timeout,
        read_message(reader, settings.limits.max_message_size),
    )
    .await?;

    let request: Request = serde_json::from_slice(&msg).map_err(|e| DaemonError::Protocol {
        kind: ProtocolErrorKind::InvalidMessageFormat {
            message: format!("Invalid JSON: {}", e),
        },
    })?;

    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    info!(
        request_id = %request_id,
        command = %request.command,
        uid = peer.uid,
        "Received request"
    );

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let ctx = ExecutionContext::new(
        request_id,
        peer.clone(),
        timestamp,
        request.command.clone(),
    );

    let params = CommandParams::new(request.params.clone());

    // Command handlers block on subprocess invocations, so run them off
    // the async runtime
    let registry = command_registry.clone();
    let command_name = request.command.clone();
    let result =
        tokio::task::spawn_blocking(move || registry.dispatch(&ctx, &command_name, params)).await;

    let response = match result {
        Ok(Ok(cmd_result)) => {
            info!(
                request_id = %request_id,
                command = %request.command,
                duration_ms = start_time.elapsed().as_millis() as u64,
                "Command executed"
            );

            Response::success_with_id(
                request_id,
                cmd_result.data.unwrap_or(serde_json::json!({})),
            )
        }
        Ok(Err(e)) => {
            warn!(
                request_id = %request_id,
                command = %request.command,
                error = %e,
                "Command failed"
            );

            Response::error_with_id(request_id, error_code(&e), e.to_string())
        }
        Err(e) => {
            error!(
                request_id = %request_id,
                command = %request.command,
                error = %e,
                "Command task panicked"
            );

            Response::error_with_id(request_id, "INTERNAL_ERROR", "Command execution failed")
        }
    };

    let response_bytes = serde_json::to_vec(&response)?;
    with_deadline(socket_timeout, write_message(writer, &response_bytes)).await?;

    Ok(())
}
