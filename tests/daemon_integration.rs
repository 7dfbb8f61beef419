//! Integration tests for the socks-bridge daemon.
//!
//! These tests start a real daemon instance and communicate with it
//! over the Unix socket. The service-control and diagnostic programs
//! are replaced by stub executables in a temp directory, selected via
//! the configured program paths; the control stub records its argv so
//! tests can assert exactly which invocations were issued.

use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nix::unistd::getuid;
use serde_json::{json, Value};
use tempfile::TempDir;

use socks_bridge::config::{
    DiagnosticsConfig, ForwarderConfig, LimitsConfig, LoggingConfig, SecurityConfig, Settings,
    SocketConfig,
};
use socks_bridge::socket::SocketListener;

/// Fixed output served by the hciconfig stub.
const HCI_OUTPUT: &str =
    "hci0:\tType: Primary  Bus: UART\n\tBD Address: B8:27:EB:45:12:99\n\tUP RUNNING\n";

/// Test daemon instance.
struct TestDaemon {
    socket_path: PathBuf,
    invocation_log: PathBuf,
    _temp_dir: TempDir,
    shutdown: Arc<tokio::sync::Notify>,
}

impl TestDaemon {
    /// Start a daemon with recording stubs for systemctl and hciconfig.
    async fn start() -> Self {
        Self::start_inner(0, true).await
    }

    /// Start a daemon whose control program fails with exit code 1.
    async fn start_with_failing_control() -> Self {
        Self::start_inner(1, true).await
    }

    /// Start a daemon whose diagnostic tool does not exist.
    async fn start_without_hci() -> Self {
        Self::start_inner(0, false).await
    }

    async fn start_inner(control_exit: i32, hci_available: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let socket_path = temp_dir.path().join("daemon.sock");
        let invocation_log = temp_dir.path().join("invocations.log");

        // Stub service-control program: record argv, then exit
        let control_program = temp_dir.path().join("systemctl");
        let control_script = format!(
            "#!/bin/sh\necho \"$@\" >> {}\nexit {}\n",
            invocation_log.display(),
            control_exit
        );
        std::fs::write(&control_program, control_script).expect("Failed to write control stub");
        std::fs::set_permissions(&control_program, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to set control stub permissions");

        // Stub diagnostic tool: print a canned reading
        let hci_program = temp_dir.path().join("hciconfig");
        if hci_available {
            let hci_text = temp_dir.path().join("hci.txt");
            std::fs::write(&hci_text, HCI_OUTPUT).expect("Failed to write hci fixture");
            let hci_script = format!("#!/bin/sh\ncat {}\n", hci_text.display());
            std::fs::write(&hci_program, hci_script).expect("Failed to write hci stub");
            std::fs::set_permissions(&hci_program, std::fs::Permissions::from_mode(0o755))
                .expect("Failed to set hci stub permissions");
        }

        let settings = Settings {
            socket: SocketConfig {
                path: socket_path.clone(),
                permissions: "0600".to_string(),
            },
            security: SecurityConfig {
                // Fail-closed peer check requires explicit UIDs
                allowed_peer_uids: vec![getuid().as_raw()],
            },
            forwarder: ForwarderConfig {
                unit: "socks-forwarder".to_string(),
                program: control_program.to_string_lossy().to_string(),
                timeout_seconds: 10,
            },
            diagnostics: DiagnosticsConfig {
                program: hci_program.to_string_lossy().to_string(),
                timeout_seconds: 5,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: "pretty".to_string(),
            },
            limits: LimitsConfig {
                max_message_size: 65_536,
                socket_timeout_seconds: 30,
                max_concurrent_requests: 16,
            },
        };
        settings.validate().expect("Test settings should be valid");

        let listener = SocketListener::bind(Arc::new(settings))
            .await
            .expect("Failed to bind socket");

        let shutdown = Arc::new(tokio::sync::Notify::new());
        let shutdown_for_run = Arc::clone(&shutdown);

        tokio::spawn(async move {
            if let Err(e) = listener.run(shutdown_for_run).await {
                eprintln!("Listener error: {}", e);
            }
        });

        // Wait for socket to be ready
        tokio::time::sleep(Duration::from_millis(200)).await;

        Self {
            socket_path,
            invocation_log,
            _temp_dir: temp_dir,
            shutdown,
        }
    }

    /// Send a request to the daemon and get the response.
    fn send_request(&self, command: &str, params: Value) -> Result<Value, String> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .map_err(|e| format!("Failed to connect: {}", e))?;

        stream
            .set_read_timeout(Some(Duration::from_secs(30)))
            .map_err(|e| format!("Failed to set read timeout: {}", e))?;
        stream
            .set_write_timeout(Some(Duration::from_secs(30)))
            .map_err(|e| format!("Failed to set write timeout: {}", e))?;

        let request = json!({
            "command": command,
            "params": params,
        });

        let request_bytes =
            serde_json::to_vec(&request).map_err(|e| format!("Failed to serialize: {}", e))?;

        let length = request_bytes.len() as u32;
        stream
            .write_all(&length.to_be_bytes())
            .map_err(|e| format!("Failed to write length: {}", e))?;
        stream
            .write_all(&request_bytes)
            .map_err(|e| format!("Failed to write request: {}", e))?;
        stream
            .flush()
            .map_err(|e| format!("Failed to flush: {}", e))?;

        let mut length_bytes = [0u8; 4];
        stream
            .read_exact(&mut length_bytes)
            .map_err(|e| format!("Failed to read response length: {}", e))?;
        let response_length = u32::from_be_bytes(length_bytes) as usize;

        let mut response_bytes = vec![0u8; response_length];
        stream
            .read_exact(&mut response_bytes)
            .map_err(|e| format!("Failed to read response: {}", e))?;

        serde_json::from_slice(&response_bytes).map_err(|e| format!("Failed to parse: {}", e))
    }

    /// Invocations recorded by the control stub, one argv per line.
    fn invocations(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.invocation_log) {
            Ok(content) => content.lines().map(|l| l.to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Stop the test daemon.
    async fn stop(self) {
        self.shutdown.notify_waiters();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

// ============================================================================
// Socket Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_socket_connection() {
    let daemon = TestDaemon::start().await;
    assert!(daemon.socket_path.exists(), "Socket file should exist");
    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_command() {
    let daemon = TestDaemon::start().await;

    let response = daemon.send_request("system.ping", json!({})).unwrap();
    assert_eq!(response["success"], true, "Response: {:?}", response);
    assert_eq!(response["data"]["pong"], true);
    assert!(response["data"]["timestamp"].is_u64());
    assert!(response["request_id"].is_string());

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_multiple_requests() {
    let daemon = TestDaemon::start().await;

    for i in 0..5 {
        let response = daemon.send_request("system.ping", json!({}));
        assert!(response.is_ok(), "Request {} should succeed", i);
        assert_eq!(response.unwrap()["success"], true, "Request {}", i);
    }

    daemon.stop().await;
}

// ============================================================================
// Control Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_control_stop_scenario() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("forwarder.control", json!({"command": "stop"}))
        .unwrap();

    // No payload, no error
    assert_eq!(response["success"], true, "Response: {:?}", response);
    assert_eq!(response["data"], json!({}));
    assert!(response.get("error").is_none());

    assert_eq!(daemon.invocations(), vec!["stop socks-forwarder"]);

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_control_start_twice_is_idempotent() {
    let daemon = TestDaemon::start().await;

    for _ in 0..2 {
        let response = daemon
            .send_request("forwarder.control", json!({"command": "start"}))
            .unwrap();
        assert_eq!(response["success"], true, "Response: {:?}", response);
    }

    // Both attempts reach the service manager; start twice is not an error
    assert_eq!(
        daemon.invocations(),
        vec!["start socks-forwarder", "start socks-forwarder"]
    );

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_control_restart_invokes_once() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("forwarder.control", json!({"command": "restart"}))
        .unwrap();
    assert_eq!(response["success"], true, "Response: {:?}", response);

    assert_eq!(daemon.invocations(), vec!["restart socks-forwarder"]);

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_command_key() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("forwarder.control", json!({}))
        .unwrap();

    assert_eq!(response["success"], false, "Response: {:?}", response);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("missing 'command'"), "Message: {}", message);

    // Rejected before any external process was invoked
    assert!(daemon.invocations().is_empty());

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unrecognized_command_value() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("forwarder.control", json!({"command": "reboot"}))
        .unwrap();

    assert_eq!(response["success"], false, "Response: {:?}", response);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("\"reboot\""), "Message: {}", message);

    assert!(daemon.invocations().is_empty());

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_control_failure_is_surfaced() {
    let daemon = TestDaemon::start_with_failing_control().await;

    let response = daemon
        .send_request("forwarder.control", json!({"command": "start"}))
        .unwrap();

    // The attempt failed, and the caller can tell
    assert_eq!(response["success"], false, "Response: {:?}", response);
    assert_eq!(response["error"]["code"], "COMMAND_ERROR");

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_command() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("nonexistent.command", json!({}))
        .unwrap();
    assert_eq!(response["success"], false, "Response: {:?}", response);
    assert_eq!(response["error"]["code"], "COMMAND_ERROR");
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("nonexistent.command"), "Message: {}", message);

    daemon.stop().await;
}

// ============================================================================
// Readings Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readings_return_verbatim_output() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .send_request("forwarder.readings", json!({}))
        .unwrap();

    assert_eq!(response["success"], true, "Response: {:?}", response);
    assert_eq!(response["data"]["hciconfig"], HCI_OUTPUT);

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readings_soft_failure_when_tool_missing() {
    let daemon = TestDaemon::start_without_hci().await;

    let response = daemon
        .send_request("forwarder.readings", json!({}))
        .unwrap();

    // Best-effort telemetry: absent reading, not an error
    assert_eq!(response["success"], true, "Response: {:?}", response);
    assert_eq!(response["data"], json!({}));
    assert!(response.get("error").is_none());

    daemon.stop().await;
}
