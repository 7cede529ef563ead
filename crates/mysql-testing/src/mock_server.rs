//! Mock MySQL server for unit testing.
//!
//! This module provides a mock MySQL server that speaks enough of the
//! client/server protocol to drive the driver end to end without a real
//! database instance.
//!
//! ## Features
//!
//! - `HandshakeV10` greeting with `mysql_native_password` verification
//! - Optional auth switch from `caching_sha2_password`
//! - Configurable responses for SQL text, by exact match or prefix
//! - `COM_PING`, `COM_INIT_DB`, `COM_RESET_CONNECTION`, `COM_CHANGE_USER`
//! - `SELECT SLEEP(n)` that can be interrupted with `KILL QUERY <id>`
//! - Query and command recording for assertions
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_testing::mock_server::{MockMySqlServer, MockResponse};
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let server = MockMySqlServer::builder()
//!         .with_response("SELECT 1", MockResponse::scalar_int(1))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // Connect your client to addr...
//! }
//! ```

use bytes::Bytes;
use mysql_auth::scramble::verify_native_password;
use mysql_codec::{CodecError, Connection};
use mysql_protocol::handshake::{PROTOCOL_VERSION, UTF8MB4_GENERAL_CI};
use mysql_protocol::resultset::encode_text_row;
use mysql_protocol::{
    AuthSwitchRequest, CapabilityFlags, ChangeUser, ColumnDefinition, ColumnFlags, ColumnType,
    CommandKind, EofPayload, ErrorPayload, HandshakeResponse, InitialHandshake, OkPayload,
    StatusFlags,
};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify, broadcast};

/// Error code for a rejected login.
pub const ER_ACCESS_DENIED: u16 = 1045;
/// Error code for an interrupted statement.
pub const ER_QUERY_INTERRUPTED: u16 = 1317;
/// Error code for an unknown thread id in `KILL`.
pub const ER_NO_SUCH_THREAD: u16 = 1094;

const NATIVE_PASSWORD: &str = "mysql_native_password";
const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
const NONCE_LEN: usize = 20;

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error on a client connection.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server already stopped.
    #[error("Server already stopped")]
    Stopped,
}

impl From<mysql_protocol::ProtocolError> for MockServerError {
    fn from(e: mysql_protocol::ProtocolError) -> Self {
        Self::Protocol(e.to_string())
    }
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// Return a single row with a single column.
    Scalar(ScalarValue),

    /// Return a result set.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Row data.
        rows: Vec<Vec<ScalarValue>>,
    },

    /// Return an error.
    Error {
        /// Error code.
        code: u16,
        /// SQLSTATE.
        state: String,
        /// Error message.
        message: String,
    },

    /// Return an OK with counters.
    Ok {
        /// Affected row count.
        affected_rows: u64,
        /// Last generated id.
        last_insert_id: u64,
    },

    /// Return several results, flagged with `MORE_RESULTS_EXISTS`.
    Multiple(Vec<MockResponse>),

    /// Compute the response from the statement text.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),

    /// Send these payloads verbatim, for malformed-server tests.
    Raw(Vec<Bytes>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            Self::Error {
                code,
                state,
                message,
            } => f
                .debug_struct("Error")
                .field("code", code)
                .field("state", state)
                .field("message", message)
                .finish(),
            Self::Ok {
                affected_rows,
                last_insert_id,
            } => f
                .debug_struct("Ok")
                .field("affected_rows", affected_rows)
                .field("last_insert_id", last_insert_id)
                .finish(),
            Self::Multiple(responses) => f.debug_tuple("Multiple").field(responses).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Raw(payloads) => f.debug_tuple("Raw").field(&payloads.len()).finish(),
        }
    }
}

impl MockResponse {
    /// Create a scalar integer response.
    pub fn scalar_int(value: i64) -> Self {
        Self::Scalar(ScalarValue::Int(value))
    }

    /// Create a scalar string response.
    pub fn scalar_string(value: impl Into<String>) -> Self {
        Self::Scalar(ScalarValue::String(value.into()))
    }

    /// Create an empty OK response.
    pub fn empty() -> Self {
        Self::affected(0)
    }

    /// Create an OK response with an affected row count.
    pub fn affected(count: u64) -> Self {
        Self::Ok {
            affected_rows: count,
            last_insert_id: 0,
        }
    }

    /// Create an error response with the generic `HY000` state.
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::error_with_state(code, "HY000", message)
    }

    /// Create an error response with an explicit SQLSTATE.
    pub fn error_with_state(
        code: u16,
        state: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            code,
            state: state.into(),
            message: message.into(),
        }
    }

    /// Create a result set response.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<ScalarValue>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Create a multi-result response.
    pub fn multiple(responses: Vec<MockResponse>) -> Self {
        Self::Multiple(responses)
    }

    /// Create a response computed from the statement text.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> MockResponse + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Create a response of raw payloads sent without validation.
    pub fn raw(payloads: Vec<Bytes>) -> Self {
        Self::Raw(payloads)
    }
}

/// A cell value in a mock result set.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// SQL NULL.
    Null,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Double.
    Double(f64),
    /// Text.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl ScalarValue {
    /// Column type used when the value stands alone.
    fn column_type(&self) -> ColumnType {
        match self {
            Self::Null => ColumnType::Null,
            Self::Int(_) | Self::UInt(_) => ColumnType::LongLong,
            Self::Double(_) => ColumnType::Double,
            Self::String(_) => ColumnType::VarString,
            Self::Bytes(_) => ColumnType::Blob,
        }
    }

    /// Text-protocol representation; `None` for NULL.
    fn to_text(&self) -> Option<Vec<u8>> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(v.to_string().into_bytes()),
            Self::UInt(v) => Some(v.to_string().into_bytes()),
            Self::Double(v) => Some(v.to_string().into_bytes()),
            Self::String(s) => Some(s.clone().into_bytes()),
            Self::Bytes(b) => Some(b.clone()),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Column definition for mock results.
#[derive(Debug, Clone)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
    /// Column flags.
    pub flags: ColumnFlags,
}

impl MockColumn {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            flags: ColumnFlags::empty(),
        }
    }

    /// Create an INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Long)
    }

    /// Create a BIGINT column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::LongLong)
    }

    /// Create a VARCHAR column.
    pub fn varchar(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::VarString)
    }

    /// Mark the column unsigned.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.flags |= ColumnFlags::UNSIGNED;
        self
    }

    /// Mark the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.flags |= ColumnFlags::NOT_NULL;
        self
    }

    fn definition(&self) -> ColumnDefinition {
        ColumnDefinition::new(self.name.clone(), self.column_type).with_flags(self.flags)
    }
}

/// A command received by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    /// `COM_QUERY` with its statement text.
    Query(String),
    /// `COM_INIT_DB` with the database name.
    InitDb(String),
    /// `COM_PING`.
    Ping,
    /// `COM_RESET_CONNECTION`.
    ResetConnection,
    /// `COM_CHANGE_USER` with the user name.
    ChangeUser(String),
    /// `COM_QUIT`.
    Quit,
}

/// Mock server configuration.
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Version string sent in the greeting.
    pub server_version: String,
    /// Accepted user name.
    pub username: String,
    /// Accepted password.
    pub password: String,
    /// Whether the server starts with `caching_sha2_password` and switches
    /// the client to `mysql_native_password`.
    pub auth_switch: bool,
    /// Status flags reported in every reply.
    pub status: StatusFlags,
    /// Delay before the greeting is sent.
    pub greeting_delay: Option<Duration>,
    /// Responses by exact statement text.
    pub responses: HashMap<String, MockResponse>,
    /// Responses by statement prefix, checked in order.
    pub prefix_responses: Vec<(String, MockResponse)>,
    /// Default response for unmatched statements.
    pub default_response: Option<MockResponse>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            server_version: "8.0.36-mock".into(),
            username: "root".into(),
            password: "password".into(),
            auth_switch: false,
            status: StatusFlags::AUTOCOMMIT,
            greeting_delay: None,
            responses: HashMap::new(),
            prefix_responses: Vec::new(),
            default_response: None,
        }
    }
}

/// Builder for mock server.
#[derive(Debug, Default)]
pub struct MockServerBuilder {
    config: MockServerConfig,
}

impl MockServerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for a specific statement.
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(sql.into(), response);
        self
    }

    /// Add a response for every statement starting with `prefix`.
    pub fn with_prefix_response(mut self, prefix: impl Into<String>, response: MockResponse) -> Self {
        self.config.prefix_responses.push((prefix.into(), response));
        self
    }

    /// Set the default response for unmatched statements.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.config.default_response = Some(response);
        self
    }

    /// Set the accepted credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Set the version string sent in the greeting.
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.config.server_version = version.into();
        self
    }

    /// Start authentication with `caching_sha2_password` and switch to
    /// `mysql_native_password`.
    pub fn with_auth_switch(mut self) -> Self {
        self.config.auth_switch = true;
        self
    }

    /// Report `NO_BACKSLASH_ESCAPES` in the server status.
    pub fn with_no_backslash_escapes(mut self) -> Self {
        self.config.status |= StatusFlags::NO_BACKSLASH_ESCAPES;
        self
    }

    /// Hold the greeting back for `delay`.
    pub fn with_greeting_delay(mut self, delay: Duration) -> Self {
        self.config.greeting_delay = Some(delay);
        self
    }

    /// Build and start the server.
    pub async fn build(self) -> Result<MockMySqlServer> {
        MockMySqlServer::start(self.config).await
    }
}

/// State shared between the accept loop and connection handlers.
#[derive(Default)]
struct Shared {
    connection_count: Mutex<usize>,
    total_connections: Mutex<usize>,
    commands: Mutex<Vec<RecordedCommand>>,
    running: Mutex<HashMap<u32, Arc<Notify>>>,
}

/// Mock MySQL server.
///
/// This server simulates a MySQL instance for unit testing purposes. It
/// handles the handshake and responds to commands based on pre-configured
/// responses.
pub struct MockMySqlServer {
    /// Server address.
    addr: SocketAddr,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    /// Signal that drops every open client connection.
    kick_tx: broadcast::Sender<()>,
    /// Server configuration.
    config: Arc<MockServerConfig>,
    shared: Arc<Shared>,
}

impl MockMySqlServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start the mock server on an available port.
    pub async fn start(config: MockServerConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let (kick_tx, _) = broadcast::channel(4);
        let config = Arc::new(config);
        let shared = Arc::new(Shared::default());
        let next_connection_id = Arc::new(AtomicU32::new(1));

        let server = Self {
            addr,
            shutdown_tx: shutdown_tx.clone(),
            kick_tx: kick_tx.clone(),
            config: config.clone(),
            shared: shared.clone(),
        };

        // Spawn the accept loop
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _peer_addr)) => {
                                let config = config.clone();
                                let shared = shared.clone();
                                let kick_rx = kick_tx.subscribe();
                                let connection_id = next_connection_id.fetch_add(1, Ordering::Relaxed);
                                tokio::spawn(async move {
                                    *shared.connection_count.lock().await += 1;
                                    *shared.total_connections.lock().await += 1;
                                    let handler = ClientHandler::new(stream, connection_id, config, shared.clone());
                                    if let Err(e) = handler.run(kick_rx).await {
                                        tracing::debug!("Connection error: {}", e);
                                    }
                                    shared.running.lock().await.remove(&connection_id);
                                    let mut c = shared.connection_count.lock().await;
                                    *c = c.saturating_sub(1);
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Ok(server)
    }

    /// Get the server's listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the host string for connection configuration.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get the server configuration.
    pub fn config(&self) -> &MockServerConfig {
        &self.config
    }

    /// Connection string pointing at this server with the accepted
    /// credentials.
    pub fn connection_string(&self) -> String {
        format!(
            "Server={};Port={};User Id={};Password={}",
            self.host(),
            self.port(),
            self.config.username,
            self.config.password
        )
    }

    /// Get the number of open client connections.
    pub async fn connection_count(&self) -> usize {
        *self.shared.connection_count.lock().await
    }

    /// Get the number of connections accepted since start.
    pub async fn total_connections(&self) -> usize {
        *self.shared.total_connections.lock().await
    }

    /// Commands received so far, in arrival order.
    pub async fn commands(&self) -> Vec<RecordedCommand> {
        self.shared.commands.lock().await.clone()
    }

    /// Statement texts received so far, in arrival order.
    pub async fn queries(&self) -> Vec<String> {
        self.shared
            .commands
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Query(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count received commands matching `predicate`.
    pub async fn count_commands(&self, predicate: impl Fn(&RecordedCommand) -> bool) -> usize {
        self.shared
            .commands
            .lock()
            .await
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    /// Drop every open client connection without a goodbye.
    pub fn disconnect_all(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Stop the server.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockMySqlServer {
    fn drop(&mut self) {
        self.stop();
        self.disconnect_all();
    }
}

impl fmt::Debug for MockMySqlServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMySqlServer")
            .field("addr", &self.addr)
            .field("server_version", &self.config.server_version)
            .finish_non_exhaustive()
    }
}

/// Serves one client connection.
struct ClientHandler {
    conn: Connection<TcpStream>,
    connection_id: u32,
    config: Arc<MockServerConfig>,
    shared: Arc<Shared>,
    nonce: Bytes,
}

impl ClientHandler {
    fn new(
        stream: TcpStream,
        connection_id: u32,
        config: Arc<MockServerConfig>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            conn: Connection::new(stream),
            connection_id,
            config,
            shared,
            nonce: generate_nonce(),
        }
    }

    async fn run(mut self, mut kick_rx: broadcast::Receiver<()>) -> Result<()> {
        if let Some(delay) = self.config.greeting_delay {
            tokio::time::sleep(delay).await;
        }

        let connection_id = self.connection_id;
        tokio::select! {
            result = self.serve() => result,
            _ = kick_rx.recv() => {
                tracing::debug!(connection_id, "dropping client connection");
                Ok(())
            }
        }
    }

    async fn serve(&mut self) -> Result<()> {
        if !self.authenticate().await? {
            return Ok(());
        }

        loop {
            self.conn.reset_sequence();
            let payload = match self.conn.read_payload().await {
                Ok(p) => p,
                // Client disconnected
                Err(CodecError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let Some((&command, body)) = payload.split_first() else {
                return Err(MockServerError::Protocol("empty command".into()));
            };

            match CommandKind::from_u8(command)? {
                CommandKind::Quit => {
                    self.record(RecordedCommand::Quit).await;
                    return Ok(());
                }
                CommandKind::Ping => {
                    self.record(RecordedCommand::Ping).await;
                    self.send_ok(0, 0, self.config.status).await?;
                }
                CommandKind::ResetConnection => {
                    self.record(RecordedCommand::ResetConnection).await;
                    self.send_ok(0, 0, self.config.status).await?;
                }
                CommandKind::InitDb => {
                    let database = String::from_utf8_lossy(body).into_owned();
                    self.record(RecordedCommand::InitDb(database)).await;
                    self.send_ok(0, 0, self.config.status).await?;
                }
                CommandKind::ChangeUser => {
                    let request = ChangeUser::decode(payload.clone())?;
                    self.record(RecordedCommand::ChangeUser(request.username.clone()))
                        .await;
                    if self.verify(&request.username, &request.auth_response) {
                        self.send_ok(0, 0, self.config.status).await?;
                    } else {
                        self.send_access_denied(&request.username).await?;
                    }
                }
                CommandKind::Query => {
                    let sql = String::from_utf8_lossy(body).into_owned();
                    self.record(RecordedCommand::Query(sql.clone())).await;
                    self.handle_query(sql.trim()).await?;
                }
            }
        }
    }

    /// Run the handshake. Returns `false` if the login was rejected.
    async fn authenticate(&mut self) -> Result<bool> {
        let plugin = if self.config.auth_switch {
            CACHING_SHA2_PASSWORD
        } else {
            NATIVE_PASSWORD
        };
        let greeting = InitialHandshake {
            protocol_version: PROTOCOL_VERSION,
            server_version: self.config.server_version.clone(),
            connection_id: self.connection_id,
            auth_plugin_data: self.nonce.clone(),
            capabilities: server_capabilities(),
            character_set: UTF8MB4_GENERAL_CI,
            status: self.config.status,
            auth_plugin_name: plugin.into(),
        };
        self.conn.send_payload(greeting.encode()).await?;

        let response = HandshakeResponse::decode(self.conn.read_payload().await?)?;
        let mut auth_response = response.auth_response;

        if self.config.auth_switch {
            self.nonce = generate_nonce();
            let switch = AuthSwitchRequest {
                plugin_name: NATIVE_PASSWORD.into(),
                plugin_data: self.nonce.clone(),
            };
            self.conn.send_payload(switch.encode()).await?;
            auth_response = self.conn.read_payload().await?;
        }

        if !self.verify(&response.username, &auth_response) {
            self.send_access_denied(&response.username).await?;
            return Ok(false);
        }

        tracing::debug!(
            connection_id = self.connection_id,
            username = %response.username,
            database = ?response.database,
            "client authenticated"
        );
        self.send_ok(0, 0, self.config.status).await?;
        Ok(true)
    }

    fn verify(&self, username: &str, auth_response: &[u8]) -> bool {
        username == self.config.username
            && verify_native_password(auth_response, self.config.password.as_bytes(), &self.nonce)
    }

    async fn handle_query(&mut self, sql: &str) -> Result<()> {
        if let Some(target) = parse_kill_query(sql) {
            let notify = self.shared.running.lock().await.get(&target).cloned();
            return match notify {
                Some(notify) => {
                    notify.notify_one();
                    self.send_ok(0, 0, self.config.status).await
                }
                None => {
                    self.send_error(
                        ER_NO_SUCH_THREAD,
                        "HY000",
                        &format!("Unknown thread id: {target}"),
                    )
                    .await
                }
            };
        }

        if let Some(seconds) = parse_sleep(sql) {
            return self.sleep(sql, seconds).await;
        }

        let response = find_response(sql, &self.config);
        self.send_response(sql, response).await
    }

    /// `SELECT SLEEP(n)`: wait, unless another connection kills the query.
    async fn sleep(&mut self, sql: &str, seconds: f64) -> Result<()> {
        let notify = Arc::new(Notify::new());
        self.shared
            .running
            .lock()
            .await
            .insert(self.connection_id, notify.clone());

        let interrupted = tokio::select! {
            () = tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))) => false,
            () = notify.notified() => true,
        };
        self.shared.running.lock().await.remove(&self.connection_id);

        if interrupted {
            tracing::debug!(connection_id = self.connection_id, "query killed");
            self.send_error(
                ER_QUERY_INTERRUPTED,
                "70100",
                "Query execution was interrupted",
            )
            .await
        } else {
            let column = MockColumn::bigint(sql.trim_start_matches("SELECT ").trim());
            self.send_rows(&[column], &[vec![ScalarValue::Int(0)]], self.config.status)
                .await
        }
    }

    async fn send_response(&mut self, sql: &str, response: MockResponse) -> Result<()> {
        let responses = match response {
            MockResponse::Multiple(responses) => responses,
            other => vec![other],
        };

        let count = responses.len();
        for (i, response) in responses.into_iter().enumerate() {
            let mut status = self.config.status;
            if i + 1 < count {
                status |= StatusFlags::MORE_RESULTS_EXISTS;
            }
            self.send_single(sql, response, status).await?;
        }
        Ok(())
    }

    async fn send_single(&mut self, sql: &str, response: MockResponse, status: StatusFlags) -> Result<()> {
        match response {
            MockResponse::Scalar(value) => {
                let column = MockColumn::new("value", value.column_type());
                self.send_rows(&[column], &[vec![value]], status).await
            }
            MockResponse::Rows { columns, rows } => self.send_rows(&columns, &rows, status).await,
            MockResponse::Error {
                code,
                state,
                message,
            } => self.send_error(code, &state, &message).await,
            MockResponse::Ok {
                affected_rows,
                last_insert_id,
            } => self.send_ok(affected_rows, last_insert_id, status).await,
            MockResponse::Custom(f) => match f(sql) {
                MockResponse::Custom(_) | MockResponse::Multiple(_) => Err(MockServerError::Protocol(
                    "custom responses must produce a single result".into(),
                )),
                response => Box::pin(self.send_single(sql, response, status)).await,
            },
            MockResponse::Raw(payloads) => {
                for payload in payloads {
                    self.conn.send_payload(payload).await?;
                }
                Ok(())
            }
            MockResponse::Multiple(_) => Err(MockServerError::Protocol(
                "nested multi-result responses are not supported".into(),
            )),
        }
    }

    async fn send_rows(
        &mut self,
        columns: &[MockColumn],
        rows: &[Vec<ScalarValue>],
        status: StatusFlags,
    ) -> Result<()> {
        let mut header = mysql_protocol::PayloadWriter::with_capacity(9);
        header.write_length_encoded_int(columns.len() as u64);
        self.conn.send_payload(header.freeze()).await?;

        for column in columns {
            self.conn.send_payload(column.definition().encode()).await?;
        }
        self.send_eof(self.config.status).await?;

        for row in rows {
            let cells: Vec<Option<Vec<u8>>> = row.iter().map(ScalarValue::to_text).collect();
            self.conn.send_payload(encode_text_row(&cells)).await?;
        }
        self.send_eof(status).await
    }

    async fn send_ok(&mut self, affected_rows: u64, last_insert_id: u64, status: StatusFlags) -> Result<()> {
        let ok = OkPayload {
            affected_rows,
            last_insert_id,
            status,
            warnings: 0,
            info: String::new(),
        };
        self.conn.send_payload(ok.encode()).await?;
        Ok(())
    }

    async fn send_eof(&mut self, status: StatusFlags) -> Result<()> {
        let eof = EofPayload {
            warnings: 0,
            status,
        };
        self.conn.send_payload(eof.encode()).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, state: &str, message: &str) -> Result<()> {
        let err = ErrorPayload::new(code, state, message);
        self.conn.send_payload(err.encode()).await?;
        Ok(())
    }

    async fn send_access_denied(&mut self, username: &str) -> Result<()> {
        tracing::debug!(connection_id = self.connection_id, username, "login rejected");
        self.send_error(
            ER_ACCESS_DENIED,
            "28000",
            &format!("Access denied for user '{username}'@'localhost' (using password: YES)"),
        )
        .await
    }

    async fn record(&self, command: RecordedCommand) {
        self.shared.commands.lock().await.push(command);
    }
}

fn server_capabilities() -> CapabilityFlags {
    CapabilityFlags::LONG_PASSWORD
        | CapabilityFlags::FOUND_ROWS
        | CapabilityFlags::LONG_FLAG
        | CapabilityFlags::CONNECT_WITH_DB
        | CapabilityFlags::PROTOCOL_41
        | CapabilityFlags::TRANSACTIONS
        | CapabilityFlags::SECURE_CONNECTION
        | CapabilityFlags::MULTI_STATEMENTS
        | CapabilityFlags::MULTI_RESULTS
        | CapabilityFlags::PLUGIN_AUTH
        | CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA
}

/// Nonce bytes are printable and never NUL, as real servers send them.
fn generate_nonce() -> Bytes {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| rng.gen_range(0x21u8..0x7F))
        .collect::<Vec<_>>()
        .into()
}

fn find_response(sql: &str, config: &MockServerConfig) -> MockResponse {
    if let Some(response) = config.responses.get(sql) {
        return response.clone();
    }
    if let Some((_, response)) = config
        .prefix_responses
        .iter()
        .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
    {
        return response.clone();
    }
    config.default_response.clone().unwrap_or_else(MockResponse::empty)
}

fn parse_kill_query(sql: &str) -> Option<u32> {
    let rest = strip_prefix_ignore_case(sql, "KILL QUERY ")?;
    rest.trim().trim_end_matches(';').parse().ok()
}

fn parse_sleep(sql: &str) -> Option<f64> {
    let rest = strip_prefix_ignore_case(sql, "SELECT SLEEP(")?;
    let (arg, _) = rest.split_once(')')?;
    arg.trim().parse().ok()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockMySqlServer::builder()
            .with_server_version("5.7.44-mock")
            .build()
            .await
            .unwrap();

        assert!(server.port() > 0);
        assert_eq!(server.host(), "127.0.0.1");
        assert_eq!(server.config().server_version, "5.7.44-mock");
        assert_eq!(server.connection_count().await, 0);
    }

    #[test]
    fn test_mock_response_scalar() {
        match MockResponse::scalar_int(42) {
            MockResponse::Scalar(ScalarValue::Int(v)) => assert_eq!(v, 42),
            other => panic!("Expected scalar int, got {other:?}"),
        }
    }

    #[test]
    fn test_mock_response_error() {
        match MockResponse::error(1146, "Table 'shop.missing' doesn't exist") {
            MockResponse::Error {
                code,
                state,
                message,
            } => {
                assert_eq!(code, 1146);
                assert_eq!(state, "HY000");
                assert_eq!(message, "Table 'shop.missing' doesn't exist");
            }
            other => panic!("Expected error response, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(ScalarValue::Int(-7).to_text().unwrap(), b"-7");
        assert_eq!(ScalarValue::from("abc").to_text().unwrap(), b"abc");
        assert_eq!(ScalarValue::from(None::<i64>).to_text(), None);
    }

    #[test]
    fn test_mock_column_flags() {
        let col = MockColumn::bigint("id").unsigned().not_null();
        let def = col.definition();
        assert_eq!(def.name, "id");
        assert_eq!(def.column_type, ColumnType::LongLong);
        assert!(def.is_unsigned());
    }

    #[test]
    fn test_find_response_order() {
        let config = MockServerConfig {
            responses: HashMap::from([("SELECT 1".to_string(), MockResponse::scalar_int(1))]),
            prefix_responses: vec![("SELECT".to_string(), MockResponse::scalar_int(2))],
            default_response: Some(MockResponse::affected(3)),
            ..MockServerConfig::default()
        };

        assert!(matches!(
            find_response("SELECT 1", &config),
            MockResponse::Scalar(ScalarValue::Int(1))
        ));
        assert!(matches!(
            find_response("SELECT 2", &config),
            MockResponse::Scalar(ScalarValue::Int(2))
        ));
        assert!(matches!(
            find_response("UPDATE t SET a = 1", &config),
            MockResponse::Ok {
                affected_rows: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_control_statements() {
        assert_eq!(parse_kill_query("KILL QUERY 17"), Some(17));
        assert_eq!(parse_kill_query("kill query 3;"), Some(3));
        assert_eq!(parse_kill_query("KILL 3"), None);
        assert_eq!(parse_sleep("SELECT SLEEP(2)"), Some(2.0));
        assert_eq!(parse_sleep("select sleep(0.5) AS s"), Some(0.5));
        assert_eq!(parse_sleep("SELECT 1"), None);
    }

    #[test]
    fn test_nonce_has_no_nul() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.iter().all(|&b| b != 0));
    }
}
