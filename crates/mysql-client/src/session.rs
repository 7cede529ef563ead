//! A single authenticated connection to a MySQL server.
//!
//! A [`Session`] owns the transport, performs the handshake and
//! authentication, and exchanges command payloads with strict
//! request/response ordering. Pooling, leasing and reuse live one layer up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use mysql_auth::{AuthError, AuthPlugin, Credentials};
use mysql_codec::Connection;
use mysql_protocol::response::{
    AUTH_MORE_DATA_HEADER, EOF_HEADER, ERROR_HEADER, LOCAL_INFILE_HEADER, OK_HEADER, is_eof,
    is_error,
};
use mysql_protocol::resultset::{decode_column_count, decode_text_row};
use mysql_protocol::{
    AuthMoreData, AuthSwitchRequest, CapabilityFlags, ChangeUser, ColumnDefinition, CommandKind,
    EofPayload, ErrorPayload, HandshakeResponse, InitialHandshake, OkPayload, ProtocolError,
    ServerVersion, StatusFlags, encode_command, encode_init_db, encode_query,
};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tokio::net::TcpStream;

use crate::cancel::CancelHandle;
use crate::config::{Config, LoadBalance};
use crate::error::{Error, Result};
use crate::parameter::ParameterCollection;
use crate::preparer::{StatementPreparer, StatementPreparerOptions};
use crate::row::{Column, ResultSet, Row};
use crate::state::{SessionState, SharedState};

/// Time allowed for `COM_QUIT` while disposing a session.
const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn connect_timeout_expired() -> Error {
    Error::Timeout("Connect Timeout expired.".into())
}

/// An authenticated connection to a MySQL server.
pub struct Session {
    id: u64,
    conn: Connection<TcpStream>,
    config: Arc<Config>,
    host: String,
    server_version: ServerVersion,
    connection_id: u32,
    capabilities: CapabilityFlags,
    status: StatusFlags,
    auth_plugin: AuthPlugin,
    nonce: Bytes,
    pool_generation: u64,
    created_at: Instant,
    last_returned_at: Instant,
    database_override: Option<String>,
    state: Arc<Mutex<SharedState>>,
}

impl Session {
    /// Allocate a fresh session id.
    ///
    /// Ids are unique for the life of the process.
    #[must_use]
    pub fn next_id() -> u64 {
        NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Open a session to the first reachable host in `config`.
    ///
    /// Hosts are tried in the order given by
    /// [`LoadBalance`](crate::LoadBalance). The whole attempt, including
    /// authentication, is bounded by the connect timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the connect timeout expires.
    /// - [`Error::Connection`] if no host accepts a TCP connection.
    /// - [`Error::Server`] / [`Error::Auth`] if authentication fails.
    /// - [`Error::Protocol`] if the server's handshake is not understood.
    pub async fn connect(config: Arc<Config>, pool_generation: u64, id: u64) -> Result<Self> {
        config.validate()?;
        let deadline = config
            .connect_timeout_opt()
            .map(|timeout| tokio::time::Instant::now() + timeout);

        let (stream, host) = Self::open_transport(&config, deadline).await?;
        let mut conn = Connection::new(stream);
        conn.set_timeout(deadline.map(|d| d.saturating_duration_since(tokio::time::Instant::now())));

        let handshake = match Self::handshake(&mut conn, &config).await {
            Ok(handshake) => handshake,
            Err(e) if e.is_timeout() => return Err(connect_timeout_expired()),
            Err(e) => return Err(e),
        };
        conn.set_timeout(None);

        let session = Self {
            id,
            conn,
            host,
            server_version: ServerVersion::parse(&handshake.server_version),
            connection_id: handshake.connection_id,
            capabilities: handshake.capabilities,
            status: handshake.status,
            auth_plugin: handshake.plugin,
            nonce: handshake.nonce,
            pool_generation,
            created_at: Instant::now(),
            last_returned_at: Instant::now(),
            database_override: None,
            state: Arc::new(Mutex::new(SharedState::connected())),
            config,
        };

        tracing::info!(
            session_id = session.id,
            host = %session.host,
            server_version = session.server_version.raw(),
            connection_id = session.connection_id,
            "session connected"
        );

        Ok(session)
    }

    /// Connect TCP to the first host that answers.
    async fn open_transport(
        config: &Config,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<(TcpStream, String)> {
        let mut hosts = config.hosts.clone();
        if config.load_balance == LoadBalance::Random {
            hosts.shuffle(&mut rand::thread_rng());
        }

        let mut last_error: Option<std::io::Error> = None;
        for host in hosts {
            tracing::debug!(host = %host, port = config.port, "establishing TCP connection");
            let connect = TcpStream::connect((host.as_str(), config.port));
            let attempt = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, connect)
                    .await
                    .map_err(|_| connect_timeout_expired())?,
                None => connect.await,
            };

            match attempt {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok((stream, host));
                }
                Err(e) => {
                    tracing::debug!(host = %host, error = %e, "host unreachable, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Connection {
            message: "Unable to connect to any of the specified MySQL hosts.".into(),
            source: last_error,
        })
    }

    /// Read the server greeting, send the handshake response, and finish
    /// authentication.
    async fn handshake(conn: &mut Connection<TcpStream>, config: &Config) -> Result<Handshake> {
        let payload = conn.read_payload().await?;
        if is_error(&payload) {
            return Err(ErrorPayload::decode(payload)?.into());
        }
        let initial = InitialHandshake::decode(payload)?;
        tracing::debug!(
            server_version = %initial.server_version,
            auth_plugin = %initial.auth_plugin_name,
            "received initial handshake"
        );

        for (flag, name) in [
            (CapabilityFlags::PROTOCOL_41, "PROTOCOL_41"),
            (CapabilityFlags::SECURE_CONNECTION, "SECURE_CONNECTION"),
        ] {
            if !initial.capabilities.contains(flag) {
                return Err(ProtocolError::MissingCapability(name).into());
            }
        }

        let capabilities = CapabilityFlags::client_default() & initial.capabilities;
        let plugin = plugin_from_name(&initial.auth_plugin_name)?;
        let auth_response = plugin.auth_response(&config.credentials, &initial.auth_plugin_data)?;

        let mut response =
            HandshakeResponse::new(capabilities, config.credentials.username(), auth_response)
                .with_auth_plugin(plugin.name());
        if let Some(database) = &config.database {
            if initial.capabilities.contains(CapabilityFlags::CONNECT_WITH_DB) {
                response = response.with_database(database.as_str());
            }
        }
        let capabilities = response.capabilities;
        conn.send_payload(response.encode()).await?;

        let (plugin, nonce, ok) =
            complete_authentication(conn, &config.credentials, plugin, initial.auth_plugin_data)
                .await?;

        Ok(Handshake {
            server_version: initial.server_version,
            connection_id: initial.connection_id,
            capabilities,
            status: ok.status,
            plugin,
            nonce,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Session id, unique within the process.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Host this session is connected to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server version reported in the handshake.
    #[must_use]
    pub fn server_version(&self) -> &ServerVersion {
        &self.server_version
    }

    /// Server-side connection id, the target of `KILL QUERY`.
    #[must_use]
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Capabilities in effect for this session.
    #[must_use]
    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    /// Server status flags from the last OK or EOF payload.
    #[must_use]
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Pool generation the session was created in.
    #[must_use]
    pub fn pool_generation(&self) -> u64 {
        self.pool_generation
    }

    /// When the session was opened.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the session was last returned to its pool.
    #[must_use]
    pub fn last_returned_at(&self) -> Instant {
        self.last_returned_at
    }

    /// Record that the session has just been returned to its pool.
    pub fn mark_returned(&mut self) {
        self.last_returned_at = Instant::now();
    }

    /// Database selected with [`change_database`](Self::change_database)
    /// since the last reset, if any.
    #[must_use]
    pub fn database_override(&self) -> Option<&str> {
        self.database_override.as_deref()
    }

    /// The session's current default database.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database_override
            .as_deref()
            .or(self.config.database.as_deref())
    }

    /// Configuration the session was opened with.
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.lock().state
    }

    /// Whether the session is idle and can carry further commands.
    ///
    /// A session whose command future was dropped before the reply was read
    /// is still `Querying` and reports `false`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Handle that can cancel this session's in-flight command from another
    /// task.
    ///
    /// The handle is bound to the current lease; after
    /// [`revoke_cancel_handles`](Self::revoke_cancel_handles) it does nothing.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        let lease = self.state.lock().lease;
        CancelHandle::new(
            Arc::clone(&self.state),
            lease,
            Arc::clone(&self.config),
            self.host.clone(),
            self.connection_id,
            self.id,
        )
    }

    /// Make every outstanding [`CancelHandle`] inert.
    ///
    /// Called when the session changes hands so a previous holder cannot
    /// kill the next holder's commands.
    pub fn revoke_cancel_handles(&mut self) {
        self.state.lock().lease += 1;
    }

    /// Options for binding statements on this session.
    #[must_use]
    pub fn preparer_options(&self) -> StatementPreparerOptions {
        let mut options = StatementPreparerOptions::from_config(&self.config);
        options.set(
            StatementPreparerOptions::NO_BACKSLASH_ESCAPES,
            self.status.contains(StatusFlags::NO_BACKSLASH_ESCAPES),
        );
        options
    }

    // =========================================================================
    // Raw exchange
    // =========================================================================

    /// Send a command payload, starting a new packet sequence.
    ///
    /// The session stays `Querying` until [`end_command`](Self::end_command)
    /// is called after the last reply payload has been read. Sending another
    /// command first marks the session broken.
    pub async fn send(&mut self, payload: Bytes) -> Result<()> {
        self.begin_command()?;
        let result = self.conn.send_command(payload).await;
        self.check_io(result)
    }

    /// Read the next reply payload.
    pub async fn receive_reply(&mut self) -> Result<Bytes> {
        let result = self.conn.read_payload().await;
        self.check_io(result)
    }

    /// Mark the in-flight command complete once its reply has been fully
    /// read.
    pub fn end_command(&mut self) {
        let mut shared = self.state.lock();
        if shared.state.is_busy() {
            shared.state = SessionState::Connected;
        }
    }

    /// Send a follow-up payload within the current command's sequence.
    async fn send_continuation(&mut self, payload: Bytes) -> Result<()> {
        let result = self.conn.send_payload(payload).await;
        self.check_io(result)
    }

    fn begin_command(&mut self) -> Result<()> {
        let mut shared = self.state.lock();
        match shared.state {
            SessionState::Connected => {
                shared.state = SessionState::Querying;
                Ok(())
            }
            SessionState::Querying | SessionState::Cancelling => {
                // The previous command's reply was never read.
                tracing::warn!(
                    session_id = self.id,
                    "previous command abandoned; session marked broken"
                );
                shared.state = SessionState::Failed;
                Err(Error::ConnectionClosed)
            }
            SessionState::Created
            | SessionState::Connecting
            | SessionState::Failed
            | SessionState::Closed => Err(Error::ConnectionClosed),
        }
    }

    fn check_io<T>(&mut self, result: std::result::Result<T, mysql_codec::CodecError>) -> Result<T> {
        result.map_err(|e| {
            if e.is_fatal() {
                self.mark_failed();
            }
            e.into()
        })
    }

    fn mark_failed(&self) {
        let mut shared = self.state.lock();
        if shared.state != SessionState::Closed {
            tracing::debug!(session_id = self.id, "session marked broken");
            shared.state = SessionState::Failed;
        }
    }

    /// Settle the state after a command's reply has been consumed.
    ///
    /// Errors that can leave unread bytes on the wire poison the session; a
    /// fully-read server error leaves it usable.
    fn finish_command<T>(&mut self, result: Result<T>) -> Result<T> {
        self.conn.set_timeout(None);
        match &result {
            Err(e) if e.is_connection_error() => self.mark_failed(),
            _ => self.end_command(),
        }
        result
    }

    fn start_timer(&mut self) {
        self.conn.set_timeout(self.config.command_timeout_opt());
    }

    async fn read_ok(&mut self) -> Result<OkPayload> {
        let payload = self.receive_reply().await?;
        match payload.first().copied() {
            Some(OK_HEADER) => {
                let ok = OkPayload::decode(payload)?;
                self.status = ok.status;
                Ok(ok)
            }
            Some(ERROR_HEADER) => Err(ErrorPayload::decode(payload)?.into()),
            Some(header) => Err(ProtocolError::UnexpectedHeader {
                context: "command reply",
                header,
            }
            .into()),
            None => Err(empty_payload()),
        }
    }

    /// Send a command that is answered by a single OK or ERR payload.
    async fn simple_command(&mut self, payload: Bytes) -> Result<OkPayload> {
        self.start_timer();
        let result = self.exchange_ok(payload).await;
        self.finish_command(result)
    }

    async fn exchange_ok(&mut self, payload: Bytes) -> Result<OkPayload> {
        self.send(payload).await?;
        self.read_ok().await
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Reset session state so the session can be handed to a new caller.
    ///
    /// Uses `COM_RESET_CONNECTION` when the server supports it and falls back
    /// to re-authenticating with `COM_CHANGE_USER`. Any database selected
    /// with [`change_database`](Self::change_database) is replaced by the
    /// configured one.
    pub async fn reset_connection(&mut self) -> Result<()> {
        if self.server_version.supports_reset_connection() {
            tracing::debug!(session_id = self.id, "resetting connection");
            self.simple_command(encode_command(CommandKind::ResetConnection))
                .await?;

            if self.database_override.take().is_some() {
                if let Some(database) = self.config.database.clone() {
                    self.simple_command(encode_init_db(&database)).await?;
                }
            }
        } else {
            tracing::debug!(
                session_id = self.id,
                server_version = self.server_version.raw(),
                "server lacks COM_RESET_CONNECTION, re-authenticating"
            );
            self.start_timer();
            let result = self.change_user().await;
            let ok = self.finish_command(result)?;
            self.status = ok.status;
            self.database_override = None;
        }
        Ok(())
    }

    async fn change_user(&mut self) -> Result<OkPayload> {
        let credentials = self.config.credentials.clone();
        let auth_response = self.auth_plugin.auth_response(&credentials, &self.nonce)?;
        let mut request = ChangeUser::new(credentials.username(), auth_response)
            .with_auth_plugin(self.auth_plugin.name());
        if let Some(database) = &self.config.database {
            request = request.with_database(database.as_str());
        }

        self.send(request.encode()).await?;
        let result = complete_authentication(
            &mut self.conn,
            &credentials,
            self.auth_plugin,
            self.nonce.clone(),
        )
        .await;
        if let Err(e) = &result {
            if e.is_connection_error() {
                self.mark_failed();
            }
        }
        let (plugin, nonce, ok) = result?;
        self.auth_plugin = plugin;
        self.nonce = nonce;
        Ok(ok)
    }

    /// Check that the server is alive. Never fails; a dead session is
    /// marked broken and `false` is returned.
    pub async fn try_ping(&mut self) -> bool {
        if !self.is_connected() {
            if self.state().is_busy() {
                self.mark_failed();
            }
            return false;
        }
        match self.simple_command(encode_command(CommandKind::Ping)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(session_id = self.id, error = %e, "ping failed");
                self.mark_failed();
                false
            }
        }
    }

    /// Select a different default database (`COM_INIT_DB`).
    pub async fn change_database(&mut self, database: &str) -> Result<()> {
        self.simple_command(encode_init_db(database)).await?;
        self.database_override = Some(database.to_string());
        Ok(())
    }

    /// Execute statement text, returning the total number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let results = self.run_query(encode_query(sql)).await?;
        Ok(results.iter().map(|r| r.affected_rows).sum())
    }

    /// Execute statement text and return its first row set.
    ///
    /// If no statement produced rows, the last result is returned.
    pub async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        first_row_set(self.run_query(encode_query(sql)).await?)
    }

    /// Execute statement text and return every result it produced.
    pub async fn query_multiple(&mut self, sql: &str) -> Result<Vec<ResultSet>> {
        self.run_query(encode_query(sql)).await
    }

    /// Bind `parameters` into `sql` and execute it.
    pub async fn execute_with(&mut self, sql: &str, parameters: &ParameterCollection) -> Result<u64> {
        let payload = StatementPreparer::new(sql, parameters, self.preparer_options()).parse_and_bind()?;
        let results = self.run_query(payload).await?;
        Ok(results.iter().map(|r| r.affected_rows).sum())
    }

    /// Bind `parameters` into `sql` and return its first row set.
    pub async fn query_with(
        &mut self,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> Result<ResultSet> {
        let payload = StatementPreparer::new(sql, parameters, self.preparer_options()).parse_and_bind()?;
        first_row_set(self.run_query(payload).await?)
    }

    async fn run_query(&mut self, payload: Bytes) -> Result<Vec<ResultSet>> {
        tracing::debug!(session_id = self.id, length = payload.len(), "executing query");
        self.start_timer();
        let result = self.exchange_query(payload).await;
        self.finish_command(result)
    }

    async fn exchange_query(&mut self, payload: Bytes) -> Result<Vec<ResultSet>> {
        self.send(payload).await?;
        self.read_result_sets().await
    }

    async fn read_result_sets(&mut self) -> Result<Vec<ResultSet>> {
        let mut results = Vec::new();
        loop {
            let payload = self.receive_reply().await?;
            let result = match payload.first().copied() {
                Some(OK_HEADER) => {
                    let ok = OkPayload::decode(payload)?;
                    self.status = ok.status;
                    ResultSet {
                        affected_rows: ok.affected_rows,
                        last_insert_id: ok.last_insert_id,
                        warnings: ok.warnings,
                        ..ResultSet::default()
                    }
                }
                Some(ERROR_HEADER) => return Err(ErrorPayload::decode(payload)?.into()),
                Some(LOCAL_INFILE_HEADER) => {
                    // Decline the file request with an empty packet; the
                    // server answers with OK or ERR.
                    tracing::debug!(session_id = self.id, "declining LOCAL INFILE request");
                    self.send_continuation(Bytes::new()).await?;
                    continue;
                }
                Some(_) => self.read_row_set(payload).await?,
                None => return Err(empty_payload()),
            };
            results.push(result);

            if !self.status.contains(StatusFlags::MORE_RESULTS_EXISTS) {
                return Ok(results);
            }
        }
    }

    async fn read_row_set(&mut self, header: Bytes) -> Result<ResultSet> {
        let column_count = decode_column_count(header)?;

        let mut columns = Vec::new();
        for _ in 0..column_count {
            let payload = self.receive_reply().await?;
            columns.push(Column::new(ColumnDefinition::decode(payload)?));
        }
        let terminator = self.receive_reply().await?;
        if !is_eof(&terminator) {
            return Err(ProtocolError::UnexpectedHeader {
                context: "column definitions terminator",
                header: terminator.first().copied().unwrap_or_default(),
            }
            .into());
        }

        // Read every row before decoding so a bad cell cannot strand unread
        // payloads on the wire.
        let mut raw_rows = Vec::new();
        let eof = loop {
            let payload = self.receive_reply().await?;
            if is_eof(&payload) {
                break EofPayload::decode(payload)?;
            }
            if is_error(&payload) {
                return Err(ErrorPayload::decode(payload)?.into());
            }
            raw_rows.push(decode_text_row(payload, column_count)?);
        };
        self.status = eof.status;

        let columns: Arc<[Column]> = columns.into();
        let rows = raw_rows
            .into_iter()
            .map(|raw| Row::decode(Arc::clone(&columns), raw))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ResultSet {
            columns,
            rows,
            warnings: eof.warnings,
            ..ResultSet::default()
        })
    }

    /// Close the session: `COM_QUIT` (best effort), then shut the transport.
    ///
    /// The session is `Closed` afterwards even if an error is returned.
    pub async fn dispose(&mut self) -> Result<()> {
        let was_usable = {
            let mut shared = self.state.lock();
            let usable = shared.state.is_usable();
            shared.state = SessionState::Closed;
            usable
        };

        tracing::debug!(session_id = self.id, "disposing session");
        self.conn.set_timeout(Some(QUIT_TIMEOUT));
        if was_usable {
            if let Err(e) = self
                .conn
                .send_command(encode_command(CommandKind::Quit))
                .await
            {
                tracing::debug!(session_id = self.id, error = %e, "COM_QUIT failed");
            }
        }
        let result = self.conn.close().await;
        self.conn.set_timeout(None);
        result.map_err(Error::from)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("server_version", &self.server_version.raw())
            .field("connection_id", &self.connection_id)
            .field("pool_generation", &self.pool_generation)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Outcome of the connection phase.
struct Handshake {
    server_version: String,
    connection_id: u32,
    capabilities: CapabilityFlags,
    status: StatusFlags,
    plugin: AuthPlugin,
    nonce: Bytes,
}

fn plugin_from_name(name: &str) -> Result<AuthPlugin> {
    AuthPlugin::from_name(name).map_err(|e| match e {
        AuthError::UnsupportedPlugin(name) => ProtocolError::UnsupportedAuthPlugin(name).into(),
        other => other.into(),
    })
}

fn empty_payload() -> Error {
    ProtocolError::UnexpectedEof {
        needed: 1,
        remaining: 0,
    }
    .into()
}

fn first_row_set(results: Vec<ResultSet>) -> Result<ResultSet> {
    let position = results.iter().position(ResultSet::has_rows);
    let mut results = results;
    match position {
        Some(index) => Ok(results.swap_remove(index)),
        None => results.pop().ok_or_else(empty_payload),
    }
}

/// Drive the authentication exchange to completion after a handshake
/// response or `COM_CHANGE_USER` has been sent.
///
/// Returns the plugin and nonce finally used, plus the server's OK.
async fn complete_authentication(
    conn: &mut Connection<TcpStream>,
    credentials: &Credentials,
    mut plugin: AuthPlugin,
    mut nonce: Bytes,
) -> Result<(AuthPlugin, Bytes, OkPayload)> {
    loop {
        let payload = conn.read_payload().await?;
        match payload.first().copied() {
            Some(OK_HEADER) => return Ok((plugin, nonce, OkPayload::decode(payload)?)),
            Some(ERROR_HEADER) => return Err(ErrorPayload::decode(payload)?.into()),
            Some(EOF_HEADER) => {
                let switch = AuthSwitchRequest::decode(payload)?;
                tracing::debug!(plugin = %switch.plugin_name, "server requested auth switch");
                plugin = plugin_from_name(&switch.plugin_name)?;
                nonce = switch.plugin_data;
                let response = plugin.auth_response(credentials, &nonce)?;
                conn.send_payload(response).await?;
            }
            Some(AUTH_MORE_DATA_HEADER) => {
                let more = AuthMoreData::decode(payload)?;
                match more.data.first().copied() {
                    Some(AuthMoreData::FAST_AUTH_SUCCESS) => {
                        tracing::debug!("caching_sha2_password fast authentication succeeded");
                    }
                    Some(AuthMoreData::PERFORM_FULL_AUTHENTICATION) => {
                        return Err(AuthError::SecureTransportRequired(plugin.name().into()).into());
                    }
                    other => {
                        return Err(ProtocolError::UnexpectedHeader {
                            context: "auth more data",
                            header: other.unwrap_or_default(),
                        }
                        .into());
                    }
                }
            }
            Some(header) => {
                return Err(ProtocolError::UnexpectedHeader {
                    context: "authentication",
                    header,
                }
                .into());
            }
            None => return Err(empty_payload()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_monotonic() {
        let a = Session::next_id();
        let b = Session::next_id();
        assert!(b > a);
    }

    #[test]
    fn test_first_row_set_prefers_rows() {
        let with_rows = ResultSet {
            columns: vec![Column::new(ColumnDefinition::new(
                "a",
                mysql_protocol::ColumnType::Long,
            ))]
            .into(),
            ..ResultSet::default()
        };
        let ok = ResultSet {
            affected_rows: 3,
            ..ResultSet::default()
        };

        let picked = first_row_set(vec![ok.clone(), with_rows]).unwrap();
        assert!(picked.has_rows());

        let picked = first_row_set(vec![ok]).unwrap();
        assert_eq!(picked.affected_rows, 3);

        assert!(first_row_set(Vec::new()).is_err());
    }

    #[test]
    fn test_unknown_plugin_is_protocol_error() {
        let err = plugin_from_name("sha256_password").unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnsupportedAuthPlugin(ref name)) if name == "sha256_password"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::new()
            .host("127.0.0.1")
            .port(port)
            .connect_timeout(Duration::from_secs(5));
        let err = Session::connect(Arc::new(config), 0, Session::next_id())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Connection { source: Some(_), .. }),
            "got {err:?}"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _accept = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let config = Config::new()
            .host("127.0.0.1")
            .port(port)
            .connect_timeout(Duration::from_millis(200));
        let err = Session::connect(Arc::new(config), 0, Session::next_id())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Connect Timeout expired.");
    }
}
