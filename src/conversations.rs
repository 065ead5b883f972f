//! Conversation store.
//!
//! AI-assistant conversations and their messages, kept in SQLite so the
//! worklog generator can quote what a day's work was about. Timestamps are
//! SQLite `datetime('now')` strings (`YYYY-MM-DD HH:MM:SS`, UTC), which
//! compare correctly as text.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::db;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => bail!("invalid role '{}': must be user, assistant, or system", other),
        }
    }
}

/// Filters for [`query_conversations`]. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConversationQuery {
    pub ids: Vec<i64>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    pub created_from: Option<String>,
    pub created_until: Option<String>,
    pub updated_from: Option<String>,
    pub updated_until: Option<String>,
    /// `created_at`, `updated_at` (default) or `id`.
    pub order_by: Option<String>,
    /// `asc` or `desc` (default).
    pub order: Option<String>,
    pub limit: Option<i64>,
    /// Only applied together with `limit`.
    pub offset: Option<i64>,
}

impl ConversationQuery {
    /// Conversations created on `date` (a `YYYY-MM-DD` string), most
    /// recently updated first.
    pub fn created_on(date: &str) -> Self {
        Self {
            created_from: Some(format!("{date} 00:00:00")),
            created_until: Some(format!("{date} 23:59:59")),
            ..Self::default()
        }
    }

    fn order_column(&self) -> &'static str {
        match self.order_by.as_deref() {
            Some("created_at") => "created_at",
            Some("id") => "id",
            _ => "updated_at",
        }
    }

    fn order_direction(&self) -> &'static str {
        match self.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        }
    }
}

fn conversation_from_row(row: &SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn create_conversation(config: &Config, title: Option<&str>) -> Result<i64> {
    let pool = db::connect(config).await?;
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let result = sqlx::query("INSERT INTO conversations (title) VALUES (?)")
        .bind(title)
        .execute(&pool)
        .await?;
    pool.close().await;
    Ok(result.last_insert_rowid())
}

/// Append a message and touch the conversation's `updated_at`.
pub async fn add_message(
    config: &Config,
    conversation_id: i64,
    role: Role,
    content: &str,
) -> Result<i64> {
    if content.trim().is_empty() {
        bail!("message content must not be empty");
    }
    let pool = db::connect(config).await?;
    if fetch_conversation(&pool, conversation_id).await?.is_none() {
        pool.close().await;
        bail!("conversation not found: {}", conversation_id);
    }

    let mut tx = pool.begin().await?;
    let result =
        sqlx::query("INSERT INTO messages (conversation_id, role, content) VALUES (?, ?, ?)")
            .bind(conversation_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&mut *tx)
            .await?;
    sqlx::query("UPDATE conversations SET updated_at = datetime('now') WHERE id = ?")
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    pool.close().await;
    Ok(result.last_insert_rowid())
}

pub async fn list_messages(config: &Config, conversation_id: i64) -> Result<Vec<Message>> {
    let pool = db::connect(config).await?;
    let rows = sqlx::query(
        "SELECT id, conversation_id, role, content, created_at FROM messages \
         WHERE conversation_id = ? ORDER BY id ASC",
    )
    .bind(conversation_id)
    .fetch_all(&pool)
    .await?;
    pool.close().await;

    rows.iter()
        .map(|row| -> Result<Message> {
            let role: String = row.get("role");
            Ok(Message {
                id: row.get("id"),
                conversation_id: row.get("conversation_id"),
                role: role.parse()?,
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

async fn fetch_conversation(pool: &SqlitePool, id: i64) -> Result<Option<Conversation>> {
    let row = sqlx::query("SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(conversation_from_row))
}

pub async fn get_conversation(config: &Config, id: i64) -> Result<Option<Conversation>> {
    let pool = db::connect(config).await?;
    let conversation = fetch_conversation(&pool, id).await?;
    pool.close().await;
    Ok(conversation)
}

pub async fn query_conversations(
    config: &Config,
    query: &ConversationQuery,
) -> Result<Vec<Conversation>> {
    let mut sql: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, title, created_at, updated_at FROM conversations WHERE 1=1",
    );

    if !query.ids.is_empty() {
        sql.push(" AND id IN (");
        let mut ids = sql.separated(", ");
        for id in &query.ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
    }
    if let Some(title) = query.title_contains.as_deref().filter(|t| !t.is_empty()) {
        sql.push(" AND title LIKE ").push_bind(format!("%{title}%"));
    }
    let ranges = [
        (" AND created_at >= ", &query.created_from),
        (" AND created_at <= ", &query.created_until),
        (" AND updated_at >= ", &query.updated_from),
        (" AND updated_at <= ", &query.updated_until),
    ];
    for (clause, value) in ranges {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            sql.push(clause).push_bind(value.to_string());
        }
    }

    let direction = query.order_direction();
    sql.push(format!(
        " ORDER BY {} {}, id {}",
        query.order_column(),
        direction,
        direction
    ));
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        sql.push(" LIMIT ").push_bind(limit);
        if let Some(offset) = query.offset.filter(|o| *o > 0) {
            sql.push(" OFFSET ").push_bind(offset);
        }
    }

    let pool = db::connect(config).await?;
    let rows = sql.build().fetch_all(&pool).await?;
    pool.close().await;

    Ok(rows.iter().map(conversation_from_row).collect())
}

/// First non-empty user message, trimmed, whitespace collapsed and cut to
/// `limit` characters (with a trailing `...` when cut).
pub fn first_user_excerpt(messages: &[Message], limit: usize) -> Option<String> {
    let text = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())?;

    if text.chars().count() <= limit {
        return Some(text);
    }
    let cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    Some(format!("{}...", cut.trim_end()))
}
