//! Tool server and custom tool tests.
//!
//! These run against the library directly: a server is spawned on a free
//! port with a custom Rust tool registered alongside the built-ins.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use seev::config::Config;
use seev::conversations::{add_message, create_conversation, Role};
use seev::journal::read_date_entry;
use seev::migrate;
use seev::server::run_server_with_extensions;
use seev::traits::{Tool, ToolContext, ToolRegistry};

// ─── Test Tool ──────────────────────────────────────────────────────

/// Reports how many Goals bullets an entry has, via the configured journal.
struct GoalCountTool;

#[async_trait]
impl Tool for GoalCountTool {
    fn name(&self) -> &str {
        "goal_count"
    }

    fn description(&self) -> &str {
        "Count Goals bullets for a date"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string" }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let date = params["date"].as_str().unwrap_or("");
        let snapshot = read_date_entry(&ctx.markdown_path(None), date)?;
        Ok(json!({ "date": date, "goals": snapshot.sections.goals.len() }))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config_with_port(tmp: &TempDir, port: u16) -> Config {
    let root = tmp.path();
    let config_content = format!(
        r#"
markdown_path = "{}"
db_path = "{}"

[server]
bind = "127.0.0.1:{}"
"#,
        root.join("WORKLOG.md").display(),
        root.join("db.sqlite3").display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn spawn_server(cfg: &Config, tools: ToolRegistry) -> tokio::task::JoinHandle<()> {
    let cfg = cfg.clone();
    let tools = Arc::new(tools);
    tokio::spawn(async move {
        run_server_with_extensions(&cfg, tools).await.ok();
    })
}

async fn call(client: &reqwest::Client, port: u16, tool: &str, params: Value) -> (u16, Value) {
    let resp = client
        .post(format!("http://127.0.0.1:{}/tools/{}", port, tool))
        .json(&params)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_tool_list() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(GoalCountTool));
    let server_handle = spawn_server(&cfg, tools);
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let health: Value = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let body: Value = client
        .get(format!("http://127.0.0.1:{}/tools/list", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tools = body["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for builtin in [
        "read_date_entry",
        "write_date_entry",
        "append_to_markdown",
        "generate_worklog",
        "query_conversations",
    ] {
        assert!(names.contains(&builtin), "Missing built-in: {}", builtin);
    }
    let custom = tools.iter().find(|t| t["name"] == "goal_count").unwrap();
    assert_eq!(custom["builtin"], false);

    server_handle.abort();
}

#[tokio::test]
async fn test_write_is_idempotent_over_http() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    let server_handle = spawn_server(&cfg, {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(GoalCountTool));
        tools
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let content = "### 🎯 Goals & Context\n- Refactor auth module\n\n### 💻 Technical Work\n- Fix login redirect (`abc123f`, +12/-3, 2 files)\n";

    let (status, first) = call(
        &client,
        port,
        "write_date_entry",
        json!({ "date": "2025-10-22", "content": content }),
    )
    .await;
    assert_eq!(status, 200, "{}", first);
    assert_eq!(first["result"]["heading_added"], true);
    assert_eq!(first["result"]["new_bullets_added"], 2);
    let journal = tmp.path().join("WORKLOG.md");
    let once = std::fs::read_to_string(&journal).unwrap();

    let (status, second) = call(
        &client,
        port,
        "write_date_entry",
        json!({ "date": "2025-10-22", "content": content }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(second["result"]["new_bullets_added"], 0);
    assert_eq!(second["result"]["deduplicated_count"], 2);
    assert_eq!(std::fs::read_to_string(&journal).unwrap(), once);

    let (status, read) = call(&client, port, "read_date_entry", json!({ "date": "2025-10-22" })).await;
    assert_eq!(status, 200);
    assert_eq!(read["result"]["sections"]["metrics"]["commits"], 1);

    let (status, custom) = call(&client, port, "goal_count", json!({ "date": "2025-10-22" })).await;
    assert_eq!(status, 200);
    assert_eq!(custom["result"]["goals"], 1);

    server_handle.abort();
}

#[tokio::test]
async fn test_error_statuses() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    let server_handle = spawn_server(&cfg, ToolRegistry::new());
    wait_for_server(port).await;

    let client = reqwest::Client::new();

    let (status, body) = call(&client, port, "nonexistent", json!({})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = call(&client, port, "write_date_entry", json!({ "date": "2025-10-22" })).await;
    assert_eq!(status, 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("missing required parameter: content"));

    let (status, body) = call(
        &client,
        port,
        "write_date_entry",
        json!({ "date": "2025-13-40", "content": "- a" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(!tmp.path().join("WORKLOG.md").exists());

    let (status, _) = call(
        &client,
        port,
        "write_date_entry",
        json!({ "date": "2025-10-22", "content": "   " }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, body) = call(
        &client,
        port,
        "write_date_entry",
        json!({ "date": "2025-10-22", "content": "### Goals\n- a\n\n## 2025-10-23\n- b" }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"]["message"].as_str().unwrap().contains("2025-10-23"));
    assert!(!tmp.path().join("WORKLOG.md").exists());

    let (status, _) = call(&client, port, "query_conversations", json!({ "order": "sideways" })).await;
    assert_eq!(status, 400);

    server_handle.abort();
}

#[tokio::test]
async fn test_query_conversations_tool() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    migrate::run_migrations(&cfg).await.unwrap();

    let id = create_conversation(&cfg, Some("Auth refactor")).await.unwrap();
    add_message(&cfg, id, Role::User, "Help with the login loop").await.unwrap();
    create_conversation(&cfg, Some("Release notes")).await.unwrap();

    let server_handle = spawn_server(&cfg, ToolRegistry::new());
    wait_for_server(port).await;
    let client = reqwest::Client::new();

    let (status, body) = call(
        &client,
        port,
        "query_conversations",
        json!({ "title_contains": "auth" }),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    let found = body["result"]["conversations"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], id);

    let (_, body) = call(&client, port, "query_conversations", json!({ "limit": 1 })).await;
    assert_eq!(body["result"]["conversations"].as_array().unwrap().len(), 1);

    server_handle.abort();
}

#[tokio::test]
async fn test_append_tool_defaults() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, 0);
    let ctx = ToolContext::new(Arc::new(cfg));
    let registry = ToolRegistry::with_builtins();
    let tool = registry.find("append_to_markdown").unwrap();

    let params = seev::traits::validate_params(
        &tool.parameters_schema(),
        &json!({ "content": "first\nsecond", "date": "2025-10-22" }),
    )
    .unwrap();
    let result = tool.execute(params, &ctx).await.unwrap();
    assert_eq!(result["heading_added"], true);

    let text = std::fs::read_to_string(tmp.path().join("WORKLOG.md")).unwrap();
    assert_eq!(text, "## 2025-10-22\n\n- first\n- second\n");
}
