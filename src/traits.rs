//! Tool extension trait and the built-in journal tools.
//!
//! Every operation the server exposes is a [`Tool`]: the built-ins below
//! plus any custom Rust tools passed to
//! [`run_server_with_extensions`](crate::server::run_server_with_extensions).
//! All of them go through the same `POST /tools/{name}` dispatch, with
//! parameters checked by [`validate_params`] against the tool's JSON schema.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ToolRegistry                 │
//! │  ┌──────────────────────┐  ┌──────────────┐  │
//! │  │ Built-in             │  │ Custom       │  │
//! │  │ read/write/append    │  │ (Rust)       │  │
//! │  │ generate/query       │  │              │  │
//! │  └──────────────────────┘  └──────────────┘  │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!                 run_server() → HTTP API
//! ```
//!
//! # Usage
//!
//! ```rust
//! use seev::traits::ToolRegistry;
//!
//! let mut tools = ToolRegistry::with_builtins();
//! // tools.register(Box::new(MyTool::new()));
//! assert!(tools.find("write_date_entry").is_some());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seev_core::EntryDate;

use crate::config::Config;
use crate::conversations::{query_conversations, ConversationQuery};
use crate::generate::{generate_worklog, write_generated};
use crate::journal::{append_to_markdown, read_date_entry, write_date_entry};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// Tools are registered at server startup and exposed via
/// `GET /tools/list` for discovery and `POST /tools/{name}` for
/// invocation.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use seev::traits::{Tool, ToolContext};
///
/// pub struct JournalPathTool;
///
/// #[async_trait]
/// impl Tool for JournalPathTool {
///     fn name(&self) -> &str { "journal_path" }
///     fn description(&self) -> &str { "Show which journal file is in use" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "path": ctx.markdown_path(None) }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`). Lowercase with underscores.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Marked `"builtin": true` in `GET /tools/list`. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema for the parameters object (`type: "object"`,
    /// `properties`, optional `required`).
    fn parameters_schema(&self) -> Value;

    /// Execute with validated parameters. The returned value is wrapped in
    /// `{ "result": ... }` by the server.
    ///
    /// Errors whose message contains `not found` map to 404, and ones
    /// containing `invalid` or `must not be empty` map to 400.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Per-invocation access to configuration.
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The journal file: `explicit` if given, else the configured path.
    pub fn markdown_path(&self, explicit: Option<&str>) -> PathBuf {
        self.config.markdown_path(explicit.map(Path::new))
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params[key].as_str()
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    match str_param(params, key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} must not be empty", key),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Parsed view of one date's entry.
pub struct ReadDateEntryTool;

#[async_trait]
impl Tool for ReadDateEntryTool {
    fn name(&self) -> &str {
        "read_date_entry"
    }

    fn description(&self) -> &str {
        "Read the journal entry for a date as structured sections"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "description": "Entry date, YYYY-MM-DD" },
                "markdown_path": { "type": "string", "description": "Journal file (defaults to configured path)" }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let date = required_str(&params, "date")?;
        let path = ctx.markdown_path(str_param(&params, "markdown_path"));
        let snapshot = read_date_entry(&path, date)?;
        Ok(serde_json::to_value(&snapshot)?)
    }
}

/// Section-aware idempotent write.
pub struct WriteDateEntryTool;

#[async_trait]
impl Tool for WriteDateEntryTool {
    fn name(&self) -> &str {
        "write_date_entry"
    }

    fn description(&self) -> &str {
        "Merge Markdown into a date's entry without duplicating existing bullets"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "description": "Entry date, YYYY-MM-DD" },
                "content": { "type": "string", "description": "Markdown with ### section headings" },
                "markdown_path": { "type": "string", "description": "Journal file (defaults to configured path)" }
            },
            "required": ["date", "content"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let date = required_str(&params, "date")?;
        let content = required_str(&params, "content")?;
        let path = ctx.markdown_path(str_param(&params, "markdown_path"));
        let report = write_date_entry(&path, date, content)?;
        Ok(serde_json::to_value(&report)?)
    }
}

/// Plain line append, no merging.
pub struct AppendToMarkdownTool;

#[async_trait]
impl Tool for AppendToMarkdownTool {
    fn name(&self) -> &str {
        "append_to_markdown"
    }

    fn description(&self) -> &str {
        "Append lines as bullets under a date heading (today by default)"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Text to append, one bullet per line" },
                "date": { "type": "string", "description": "Entry date, YYYY-MM-DD (defaults to today)" },
                "preserve_lines": { "type": "boolean", "default": false, "description": "Write lines as-is instead of as bullets" },
                "markdown_path": { "type": "string", "description": "Journal file (defaults to configured path)" }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let content = required_str(&params, "content")?;
        let preserve_lines = params["preserve_lines"].as_bool().unwrap_or(false);
        let path = ctx.markdown_path(str_param(&params, "markdown_path"));
        let result = append_to_markdown(&path, str_param(&params, "date"), content, preserve_lines)?;
        Ok(serde_json::to_value(&result)?)
    }
}

/// Draft (and optionally merge) a day's worklog from git and conversations.
pub struct GenerateWorklogTool;

#[derive(Serialize)]
struct GenerateResponse {
    #[serde(flatten)]
    generated: crate::generate::GeneratedWorklog,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<crate::journal::WriteReport>,
}

#[async_trait]
impl Tool for GenerateWorklogTool {
    fn name(&self) -> &str {
        "generate_worklog"
    }

    fn description(&self) -> &str {
        "Generate a worklog entry from the day's commits and conversations"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "description": "Entry date, YYYY-MM-DD" },
                "repo": { "type": "string", "description": "Git working directory (defaults to the server's)" },
                "write": { "type": "boolean", "default": false, "description": "Merge the result into the journal" },
                "markdown_path": { "type": "string", "description": "Journal file (defaults to configured path)" }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let date = EntryDate::parse(required_str(&params, "date")?)?;
        let repo = str_param(&params, "repo").map(Path::new);
        let generated = generate_worklog(ctx.config(), &date, repo).await?;

        let written = if params["write"].as_bool().unwrap_or(false) {
            let path = ctx.markdown_path(str_param(&params, "markdown_path"));
            Some(write_generated(&path, &generated)?)
        } else {
            None
        };
        Ok(serde_json::to_value(GenerateResponse { generated, written })?)
    }
}

/// Filtered listing of recorded conversations.
pub struct QueryConversationsTool;

#[async_trait]
impl Tool for QueryConversationsTool {
    fn name(&self) -> &str {
        "query_conversations"
    }

    fn description(&self) -> &str {
        "List recorded assistant conversations with optional filters"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": { "type": "array", "description": "Conversation ids" },
                "title_contains": { "type": "string" },
                "created_from": { "type": "string", "description": "YYYY-MM-DD HH:MM:SS" },
                "created_until": { "type": "string", "description": "YYYY-MM-DD HH:MM:SS" },
                "updated_from": { "type": "string", "description": "YYYY-MM-DD HH:MM:SS" },
                "updated_until": { "type": "string", "description": "YYYY-MM-DD HH:MM:SS" },
                "order_by": { "type": "string", "enum": ["created_at", "updated_at", "id"], "default": "updated_at" },
                "order": { "type": "string", "enum": ["asc", "desc"], "default": "desc" },
                "limit": { "type": "integer" },
                "offset": { "type": "integer" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query: ConversationQuery = serde_json::from_value(params)
            .map_err(|e| anyhow::anyhow!("invalid query: {}", e))?;

        if !ctx.config().db_path().exists() {
            return Ok(json!({ "conversations": [] }));
        }
        let conversations = query_conversations(ctx.config(), &query).await?;
        Ok(json!({ "conversations": conversations }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    /// JSON Schema for the parameters object.
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

/// Check `params` against a tool schema and fill in defaults.
///
/// Verifies required fields are present, that provided values have the
/// declared `type` and are in `enum` when one is given. Absent optional
/// fields with a `default` get it injected.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    for req_field in &required {
        if !params_obj.contains_key(req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    let mut result = params_obj.clone();
    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for tools (built-in and custom Rust).
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry pre-loaded with the journal and conversation tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ReadDateEntryTool));
        registry.register(Box::new(WriteDateEntryTool));
        registry.register(Box::new(AppendToMarkdownTool));
        registry.register(Box::new(GenerateWorklogTool));
        registry.register(Box::new(QueryConversationsTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
