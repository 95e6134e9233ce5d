//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use smartsafe_gate::account::UserService;
use smartsafe_gate::admission::RequestAdmission;
use smartsafe_gate::auth::{AuthenticationGate, GateConfig, PasswordHasher, MIN_HASH_COST};
use smartsafe_gate::config::{ChannelConfig, ServerConfig};
use smartsafe_gate::directory::SqliteDirectory;
use smartsafe_gate::policy::{AccessPolicy, DEFAULT_PUBLIC_PATHS};
use smartsafe_gate::server::{AppState, Server};

pub const USER_ADDRESS: &str = "testAddress";
pub const USER_PASSWORD: &str = "testPassword";
pub const USER_KEY: &str = "testKey";

/// Create an in-memory directory for testing
pub async fn create_test_directory() -> Arc<SqliteDirectory> {
    Arc::new(
        SqliteDirectory::in_memory()
            .await
            .expect("Failed to create test directory"),
    )
}

/// Gate settings with the cheapest bcrypt cost
pub fn create_test_gate_config() -> GateConfig {
    GateConfig {
        hasher: PasswordHasher::bcrypt(MIN_HASH_COST).expect("Invalid test hash cost"),
        directory_timeout: Duration::from_secs(2),
    }
}

/// Create a test authentication gate
pub fn create_test_gate(directory: Arc<SqliteDirectory>) -> Arc<AuthenticationGate<SqliteDirectory>> {
    Arc::new(
        AuthenticationGate::new(directory, create_test_gate_config())
            .expect("Failed to create test gate"),
    )
}

/// Create a test application state with the given public paths
pub fn create_test_state_with_paths(
    directory: Arc<SqliteDirectory>,
    public_paths: &[&str],
    channel: ChannelConfig,
) -> AppState<SqliteDirectory> {
    let gate = create_test_gate(directory);
    let policy = Arc::new(
        AccessPolicy::with_public_paths(public_paths).expect("Invalid test public paths"),
    );

    AppState::new(
        Arc::new(RequestAdmission::new(Arc::clone(&gate), policy)),
        Arc::new(UserService::new(gate)),
        channel,
        "smartsafe",
    )
}

/// Create a test application state with the default policy
pub async fn create_test_state() -> (AppState<SqliteDirectory>, Arc<SqliteDirectory>) {
    let directory = create_test_directory().await;
    let state = create_test_state_with_paths(
        Arc::clone(&directory),
        DEFAULT_PUBLIC_PATHS,
        ChannelConfig::default(),
    );
    (state, directory)
}

/// Create a test server configuration with a random port
pub fn create_test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign a free port
    }
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDirectory>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let bound = Server::new(create_test_server_config(), state)
        .bind()
        .await
        .expect("Failed to bind test server");
    let addr = bound.local_addr();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        bound
            .serve(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    (addr, shutdown_tx)
}

/// HTTP client that does not follow redirects
pub fn create_test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build test client")
}

/// Authorization header value for Basic credentials
pub fn basic_auth(identifier: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", identifier, secret)))
}
