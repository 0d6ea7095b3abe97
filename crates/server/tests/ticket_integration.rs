use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::sleep;

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a config with database path
fn config_with_db(port: u16, db_path: &str) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        port, db_path
    )
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_ticketd"))
        .env("TICKETD_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Helper to start a server for testing
async fn start_test_server() -> (u16, tokio::process::Child, TempDir) {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let server = spawn_server(temp_file.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    (port, server, temp_dir)
}

/// Create a ticket and return its JSON
async fn create_ticket(client: &Client, port: u16, title: &str, status: &str) -> Value {
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets", port))
        .json(&json!({
            "title": title,
            "text": "body",
            "status": status,
            "creator": "a@x.com",
            "assignee": "b@x.com"
        }))
        .send()
        .await
        .expect("Failed to create ticket");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse JSON")
}

#[tokio::test]
async fn test_create_ticket() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let json = create_ticket(&client, port, "T1", "backlog").await;

    assert!(json["id"].is_string());
    assert_eq!(json["title"], "T1");
    assert_eq!(json["status"], "backlog");
    assert_eq!(json["text"], "body");
    assert_eq!(json["creator"], "a@x.com");
    assert_eq!(json["assignee"], "b@x.com");
    assert!(json["create_time"].is_string());
    assert!(json["close_time"].is_null());
    assert!(json["delete_time"].is_null());
    assert_eq!(json["comments"].as_array().unwrap().len(), 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_create_with_closed_status_leaves_close_time_null() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let json = create_ticket(&client, port, "closed from birth", "closed").await;

    assert_eq!(json["status"], "closed");
    assert!(json["close_time"].is_null());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_create_blank_title_is_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets", port))
        .json(&json!({
            "title": "   ",
            "text": "body",
            "status": "backlog",
            "creator": "a@x.com",
            "assignee": "b@x.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let json: Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("blank"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_create_invalid_status_is_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets", port))
        .json(&json!({
            "title": "T1",
            "text": "body",
            "status": "done",
            "creator": "a@x.com",
            "assignee": "b@x.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_create_missing_field_is_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets", port))
        .json(&json!({
            "title": "T1",
            "status": "backlog"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let json: Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("required"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_get_ticket_round_trip() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let created = create_ticket(&client, port, "round trip", "review").await;
    let ticket_id = created["id"].as_str().unwrap();

    let response = client
        .get(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched, created);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_get_nonexistent_ticket() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets/nonexistent-id", port))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);

    let json: Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("not found"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_update_nonexistent_ticket() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/nonexistent-id", port))
        .json(&json!({ "assignee": "c@x.com" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_update_status_drives_close_time() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let created = create_ticket(&client, port, "closeable", "progress").await;
    let ticket_id = created["id"].as_str().unwrap();

    // Close the ticket: close_time gets stamped
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "status": "closed" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "closed");
    assert!(json["close_time"].is_string());

    // Reopen: close_time cleared
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "status": "backlog" }))
        .send()
        .await
        .unwrap();

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "backlog");
    assert!(json["close_time"].is_null());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_update_assignee() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let created = create_ticket(&client, port, "reassign me", "backlog").await;
    let ticket_id = created["id"].as_str().unwrap();

    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "assignee": "  c@x.com  " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["assignee"], "c@x.com");
    // Untouched fields survive
    assert_eq!(json["status"], "backlog");
    assert_eq!(json["title"], "reassign me");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_comment_append_requires_both_fields() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let created = create_ticket(&client, port, "commented", "backlog").await;
    let ticket_id = created["id"].as_str().unwrap();

    // Only commenter: comments unchanged
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "commenter": "c@x.com" }))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["comments"].as_array().unwrap().len(), 0);

    // Both fields: exactly one comment appended, trimmed
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "commenter": "c@x.com", "comment": "  first  " }))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let comments = json["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["commenter"], "c@x.com");
    assert_eq!(comments[0]["text"], "first");

    // A second comment preserves order
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "commenter": "d@x.com", "comment": "second" }))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let comments = json["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["text"], "first");
    assert_eq!(comments[1]["text"], "second");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_list_tickets_status_filter() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    create_ticket(&client, port, "b1", "backlog").await;
    create_ticket(&client, port, "b2", "backlog").await;
    create_ticket(&client, port, "r1", "review").await;

    // No filter returns everything
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets", port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);

    // Single status: exactly the matching set
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets?status=backlog", port))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let tickets = json.as_array().unwrap();
    assert_eq!(tickets.len(), 2);
    assert!(tickets.iter().all(|t| t["status"] == "backlog"));

    // Repeated status params: union of matches
    let response = client
        .get(format!(
            "http://127.0.0.1:{}/tickets?status=backlog&status=review",
            port
        ))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_list_tickets_invalid_status_is_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets?status=bogus", port))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_list_tickets_unparseable_date_means_absent() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    create_ticket(&client, port, "t", "backlog").await;

    // An unparseable bound behaves like no bound at all
    let response = client
        .get(format!(
            "http://127.0.0.1:{}/tickets?create_lb=not-a-date",
            port
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_create_close_filter_scenario() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();

    // Create in backlog
    let created = create_ticket(&client, port, "T1", "backlog").await;
    let ticket_id = created["id"].as_str().unwrap();
    assert_eq!(created["status"], "backlog");
    assert!(created["close_time"].is_null());

    // Close it
    let response = client
        .post(format!("http://127.0.0.1:{}/tickets/{}", port, ticket_id))
        .json(&json!({ "status": "closed" }))
        .send()
        .await
        .unwrap();
    let closed: Value = response.json().await.unwrap();
    assert!(closed["close_time"].is_string());

    // Filtering by closed finds exactly this ticket
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets?status=closed", port))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let tickets = json.as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["id"], ticket_id);

    // Filtering by backlog finds nothing
    let response = client
        .get(format!("http://127.0.0.1:{}/tickets?status=backlog", port))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json.as_array().unwrap().len(), 0);

    server.kill().await.ok();
}
