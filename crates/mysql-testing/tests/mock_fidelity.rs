//! Mock MySQL Server Fidelity Tests
//!
//! These tests drive the mock server with the real client session to make
//! sure the mock speaks the protocol the driver expects.
//!
//! ```bash
//! cargo test -p mysql-testing --test mock_fidelity
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use mysql_client::{Config, Error, Session};
use mysql_testing::mock_server::{
    MockColumn, MockMySqlServer, MockResponse, RecordedCommand, ScalarValue,
};

async fn connect(server: &MockMySqlServer) -> Session {
    let config = Config::from_connection_string(&server.connection_string()).unwrap();
    Session::connect(Arc::new(config), 0, Session::next_id())
        .await
        .expect("session should connect")
}

// =============================================================================
// Server Structure
// =============================================================================

#[tokio::test]
async fn test_mock_server_starts_and_listens() {
    let server = MockMySqlServer::builder()
        .with_server_version("8.0.36-fidelity")
        .build()
        .await
        .expect("Server should start");

    assert!(server.port() > 0, "Should have valid port");
    assert_eq!(server.host(), "127.0.0.1", "Should listen on localhost");
    assert_eq!(server.connection_count().await, 0, "Should start with no connections");

    server.stop();
}

#[tokio::test]
async fn test_concurrent_servers_use_distinct_ports() {
    let a = MockMySqlServer::builder().build().await.unwrap();
    let b = MockMySqlServer::builder().build().await.unwrap();
    assert_ne!(a.port(), b.port());
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn test_handshake_reports_server_details() {
    let server = MockMySqlServer::builder()
        .with_server_version("5.7.44-mock")
        .build()
        .await
        .unwrap();

    let session = connect(&server).await;
    assert_eq!(session.server_version().raw(), "5.7.44-mock");
    assert!(session.server_version().is_at_least(5, 7, 0));
    assert!(session.connection_id() > 0);
    assert!(session.is_connected());
    assert_eq!(server.total_connections().await, 1);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let server = MockMySqlServer::builder()
        .with_credentials("app", "right")
        .build()
        .await
        .unwrap();

    let conn_str = format!(
        "Server={};Port={};User Id=app;Password=wrong",
        server.host(),
        server.port()
    );
    let config = Config::from_connection_string(&conn_str).unwrap();
    let err = Session::connect(Arc::new(config), 0, Session::next_id())
        .await
        .unwrap_err();

    match err {
        Error::Server { code, state, .. } => {
            assert_eq!(code, 1045);
            assert_eq!(state, "28000");
        }
        other => panic!("expected access denied, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auth_switch_to_native_password() {
    let server = MockMySqlServer::builder()
        .with_auth_switch()
        .build()
        .await
        .unwrap();

    let mut session = connect(&server).await;
    assert!(session.try_ping().await);
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn test_scalar_and_rows() {
    let server = MockMySqlServer::builder()
        .with_response("SELECT 1", MockResponse::scalar_int(1))
        .with_response(
            "SELECT id, name FROM users",
            MockResponse::rows(
                vec![MockColumn::int("id"), MockColumn::varchar("name")],
                vec![
                    vec![ScalarValue::Int(1), "Alice".into()],
                    vec![ScalarValue::Int(2), ScalarValue::Null],
                ],
            ),
        )
        .build()
        .await
        .unwrap();

    let mut session = connect(&server).await;

    let one = session.query("SELECT 1").await.unwrap();
    assert_eq!(one.rows[0].get::<i64>(0).unwrap(), 1);

    let users = session.query("SELECT id, name FROM users").await.unwrap();
    assert_eq!(users.columns.len(), 2);
    assert_eq!(users.rows.len(), 2);
    assert_eq!(users.rows[0].get_by_name::<String>("name").unwrap(), "Alice");
    assert!(users.rows[1].is_null(1));
}

#[tokio::test]
async fn test_error_leaves_session_usable() {
    let server = MockMySqlServer::builder()
        .with_response(
            "SELECT * FROM missing",
            MockResponse::error_with_state(1146, "42S02", "Table 'test.missing' doesn't exist"),
        )
        .build()
        .await
        .unwrap();

    let mut session = connect(&server).await;
    let err = session.query("SELECT * FROM missing").await.unwrap_err();
    assert!(matches!(err, Error::Server { code: 1146, .. }));
    assert!(session.is_connected());
    assert!(session.try_ping().await);
}

#[tokio::test]
async fn test_multiple_results() {
    let server = MockMySqlServer::builder()
        .with_response(
            "UPDATE a SET x = 1; SELECT 2",
            MockResponse::multiple(vec![MockResponse::affected(3), MockResponse::scalar_int(2)]),
        )
        .build()
        .await
        .unwrap();

    let mut session = connect(&server).await;
    let results = session
        .query_multiple("UPDATE a SET x = 1; SELECT 2")
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].affected_rows, 3);
    assert_eq!(results[1].rows[0].get::<i64>(0).unwrap(), 2);
}

#[tokio::test]
async fn test_commands_are_recorded() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let mut session = connect(&server).await;

    session.change_database("shop").await.unwrap();
    assert!(session.try_ping().await);
    session.execute("DELETE FROM carts").await.unwrap();
    session.dispose().await.unwrap();

    // Give the handler a moment to record the QUIT.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(
        server.commands().await,
        vec![
            RecordedCommand::InitDb("shop".into()),
            RecordedCommand::Ping,
            RecordedCommand::Query("DELETE FROM carts".into()),
            RecordedCommand::Quit,
        ]
    );
}

#[tokio::test]
async fn test_disconnect_all_breaks_sessions() {
    let server = MockMySqlServer::builder().build().await.unwrap();
    let mut session = connect(&server).await;

    server.disconnect_all();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(!session.try_ping().await);
    assert!(!session.is_connected());
}
