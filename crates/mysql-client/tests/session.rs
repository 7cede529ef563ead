//! Session tests against the mock MySQL server.
//!
//! These tests need no database; they run against
//! `mysql_testing::MockMySqlServer`.
//!
//! ```bash
//! cargo test -p mysql-client --test session
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mysql_client::{
    CachedProcedure, Config, Error, NormalizedSchema, ParameterCollection, ParameterDirection,
    Session, SessionState, SqlType,
};
use mysql_protocol::ProtocolError;
use mysql_testing::fixtures::ROUTINE_PARAMETERS_PREFIX;
use mysql_testing::{
    MockMySqlServer, MockResponse, RecordedCommand, RoutineParameter, routine_parameters,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn config_for(server: &MockMySqlServer) -> Config {
    Config::from_connection_string(&server.connection_string()).unwrap()
}

async fn connect_with(config: Config) -> Session {
    init_tracing();
    Session::connect(Arc::new(config), 0, Session::next_id())
        .await
        .expect("session should connect")
}

// =============================================================================
// Connection Tests
// =============================================================================

#[tokio::test]
async fn test_connect_with_database() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let session = connect_with(config_for(&server).database("shop")).await;

    assert_eq!(session.database(), Some("shop"));
    assert_eq!(session.database_override(), None);
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.host(), "127.0.0.1");
}

#[tokio::test]
async fn test_failover_skips_unreachable_host() {
    let server = MockMySqlServer::builder().build().await.unwrap();

    // Nothing listens on 127.0.0.2 at the server's port.
    let config = config_for(&server)
        .hosts(["127.0.0.2".to_string(), server.host()])
        .connect_timeout(Duration::from_secs(2));

    let session = connect_with(config).await;
    assert_eq!(session.host(), "127.0.0.1");
}

#[tokio::test]
async fn test_greeting_timeout() {
    let server = MockMySqlServer::builder()
        .with_greeting_delay(Duration::from_secs(5))
        .build()
        .await
        .unwrap();
    let config = config_for(&server).connect_timeout(Duration::from_secs(1));

    let err = Session::connect(Arc::new(config), 0, 1).await.unwrap_err();
    assert_eq!(err.to_string(), "Connect Timeout expired.");
}

// =============================================================================
// Query Tests
// =============================================================================

#[tokio::test]
async fn test_query_with_parameters() {
    let server = MockMySqlServer::builder()
        .with_response(
            "SELECT name FROM users WHERE id = 7 AND tag = 'o\\'k'",
            MockResponse::scalar_string("Alice"),
        )
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    let params = ParameterCollection::new()
        .with("@id", 7)
        .with("@tag", "o'k");
    let result = session
        .query_with("SELECT name FROM users WHERE id = @id AND tag = @tag", &params)
        .await
        .unwrap();
    assert_eq!(result.rows[0].get::<String>(0).unwrap(), "Alice");
}

#[tokio::test]
async fn test_no_backslash_escapes_follows_server_status() {
    let server = MockMySqlServer::builder()
        .with_no_backslash_escapes()
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    let params = ParameterCollection::new().with("@s", "it's");
    session
        .execute_with("INSERT INTO notes VALUES (@s)", &params)
        .await
        .unwrap();

    assert_eq!(
        server.queries().await,
        vec!["INSERT INTO notes VALUES ('it''s')".to_string()]
    );
}

#[tokio::test]
async fn test_execute_sums_affected_rows() {
    let server = MockMySqlServer::builder()
        .with_default_response(MockResponse::multiple(vec![
            MockResponse::affected(2),
            MockResponse::affected(5),
        ]))
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    let affected = session.execute("UPDATE a SET x = 1; UPDATE b SET y = 2").await.unwrap();
    assert_eq!(affected, 7);
}

#[tokio::test]
async fn test_command_timeout_breaks_session() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let mut session =
        connect_with(config_for(&server).command_timeout(Duration::from_millis(300))).await;

    let err = session.query("SELECT SLEEP(5)").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!session.try_ping().await);
}

#[tokio::test]
async fn test_abandoned_command_breaks_session() {
    let server = MockMySqlServer::builder()
        .with_response("SELECT 1", MockResponse::scalar_int(1))
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    let pending =
        tokio::time::timeout(Duration::from_millis(100), session.execute("SELECT SLEEP(1)")).await;
    assert!(pending.is_err(), "statement should still be running");
    assert_eq!(session.state(), SessionState::Querying);
    assert!(!session.is_connected());

    // The next command would read the abandoned statement's reply.
    let err = tokio_test::assert_err!(session.query("SELECT 1").await);
    assert!(matches!(err, Error::ConnectionClosed), "got {err:?}");
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!session.try_ping().await);
}

#[tokio::test]
async fn test_oversized_column_count_is_protocol_error() {
    // Length-encoded column count of 2^48.
    let header = Bytes::from_static(&[0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]);
    let server = MockMySqlServer::builder()
        .with_response("SELECT 1", MockResponse::raw(vec![header]))
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    let err = tokio_test::assert_err!(session.query("SELECT 1").await);
    assert!(
        matches!(err, Error::Protocol(ProtocolError::TooManyColumns { .. })),
        "got {err:?}"
    );
    assert_eq!(session.state(), SessionState::Failed);
}

// =============================================================================
// Reset Tests
// =============================================================================

#[tokio::test]
async fn test_reset_uses_reset_connection() {
    let server = MockMySqlServer::builder()
        .with_server_version("8.0.36")
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server).database("shop")).await;

    session.change_database("archive").await.unwrap();
    assert_eq!(session.database(), Some("archive"));

    session.reset_connection().await.unwrap();
    assert_eq!(session.database_override(), None);
    assert_eq!(session.database(), Some("shop"));

    assert_eq!(
        server.commands().await,
        vec![
            RecordedCommand::InitDb("archive".into()),
            RecordedCommand::ResetConnection,
            RecordedCommand::InitDb("shop".into()),
        ]
    );
}

#[tokio::test]
async fn test_reset_falls_back_to_change_user() {
    let server = MockMySqlServer::builder()
        .with_server_version("5.6.51-log")
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server)).await;

    tokio_test::assert_ok!(session.reset_connection().await);
    assert!(session.try_ping().await);

    let commands = server.commands().await;
    assert_eq!(commands[0], RecordedCommand::ChangeUser("root".into()));
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[tokio::test]
async fn test_cancel_running_query() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let mut session = connect_with(config_for(&server)).await;
    let handle = session.cancel_handle();

    let query = tokio::spawn(async move {
        let result = session.query("SELECT SLEEP(10)").await;
        (session, result)
    });

    // Wait for the statement to be running server-side.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.cancel().await);

    let (session, result) = tokio::time::timeout(Duration::from_secs(5), query)
        .await
        .expect("query should end after KILL QUERY")
        .unwrap();
    match result.unwrap_err() {
        Error::Server { code, .. } => assert_eq!(code, 1317),
        other => panic!("expected interrupted query, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Connected);

    let kill = format!("KILL QUERY {}", handle.connection_id());
    assert!(server.queries().await.contains(&kill));
}

#[tokio::test]
async fn test_revoked_cancel_handle_is_inert() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let mut session = connect_with(config_for(&server)).await;
    let stale = session.cancel_handle();
    session.revoke_cancel_handles();
    let current = session.cancel_handle();

    let query = tokio::spawn(async move {
        let result = session.query("SELECT SLEEP(1)").await;
        (session, result)
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!stale.cancel().await);
    let (session, result) = query.await.unwrap();
    tokio_test::assert_ok!(result);
    assert_eq!(session.state(), SessionState::Connected);
    assert!(!current.cancel().await, "nothing left to cancel");
    assert_eq!(server.total_connections().await, 1);
}

#[tokio::test]
async fn test_cancel_idle_session_does_nothing() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let session = connect_with(config_for(&server)).await;

    assert!(!session.cancel_handle().cancel().await);
    assert_eq!(server.total_connections().await, 1);
}

// =============================================================================
// Stored Procedure Metadata
// =============================================================================

#[tokio::test]
async fn test_fill_procedure_metadata() {
    let server = MockMySqlServer::builder()
        .with_prefix_response(
            ROUTINE_PARAMETERS_PREFIX,
            routine_parameters(&[
                RoutineParameter::new(2, "OUT", "total", "decimal"),
                RoutineParameter::new(1, "IN", "customer_id", "int")
                    .with_dtd_identifier("int unsigned"),
            ]),
        )
        .build()
        .await
        .unwrap();
    let mut session = connect_with(config_for(&server).database("shop")).await;

    let name = NormalizedSchema::normalize("order_total", session.database()).unwrap();
    let procedure = CachedProcedure::fill(&mut session, &name.schema, &name.component)
        .await
        .unwrap();

    assert_eq!(procedure.fully_qualified(), "`shop`.`order_total`");
    let params = procedure.parameters();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name.as_deref(), Some("customer_id"));
    assert!(params[0].is_unsigned);
    assert_eq!(params[1].direction, ParameterDirection::Output);
    assert_eq!(params[1].sql_type, Some(SqlType::Decimal));

    let sent = server.queries().await;
    assert!(sent[0].contains("SPECIFIC_SCHEMA = 'shop' AND SPECIFIC_NAME = 'order_total'"));
}
