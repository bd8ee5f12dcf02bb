//! SQLite-backed message store.
//!
//! Messages are append-only as far as this subsystem is concerned; edits
//! and deletions belong to the moderation tooling, which goes straight at
//! the database. Embeds and attachments are stored as JSON text columns so
//! the wire shape in `ember-common` stays the single source of truth.

use anyhow::{Context, Result};
use chrono::Utc;
use ember_common::{Attachment, ChatMessage, Embed};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Everything the relay needs to persist one message; the store assigns
/// the id and timestamp.
#[derive(Debug, Default)]
pub struct NewMessage {
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<Attachment>,
    /// Set for bridged messages; website sends have none.
    pub upstream_id: Option<String>,
}

pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to open chat database at {:?}", db_path))?;

        let store = Self { pool };
        store.init_db().await?;

        info!("[Store] Initialized at {:?}", db_path);
        Ok(store)
    }

    /// The users/sessions tables are owned by the platform's auth service;
    /// they are created here as well so the relay runs standalone in
    /// development and tests.
    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                upstream_id TEXT,
                author_name TEXT NOT NULL,
                author_avatar TEXT,
                content TEXT,
                embeds TEXT NOT NULL DEFAULT '[]',
                attachments TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                avatar TEXT,
                is_active INTEGER DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // No foreign key on user_id: the auth service deletes accounts
        // without touching their sessions, and a live session pointing at a
        // missing account is a state the relay must be able to represent.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a message, assigning id and timestamp. Returns the stored
    /// message exactly as it will appear on the wire.
    pub async fn append(&self, draft: NewMessage) -> Result<ChatMessage> {
        let mut message = ChatMessage::new(draft.author_name);
        message.author_avatar = draft.author_avatar;
        message.content = draft.content;
        message.embeds = draft.embeds;
        message.attachments = draft.attachments;
        message.upstream_id = draft.upstream_id;

        let embeds_json = serde_json::to_string(&message.embeds)?;
        let attachments_json = serde_json::to_string(&message.attachments)?;

        sqlx::query(
            r#"
            INSERT INTO messages
                (id, upstream_id, author_name, author_avatar, content, embeds, attachments, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.upstream_id)
        .bind(&message.author_name)
        .bind(&message.author_avatar)
        .bind(&message.content)
        .bind(&embeds_json)
        .bind(&attachments_json)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// Most recent `limit` messages, newest-last.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        type Row = (
            String,
            Option<String>,
            String,
            Option<String>,
            Option<String>,
            String,
            String,
            String,
        );
        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT id, upstream_id, author_name, author_avatar, content, embeds, attachments, created_at
            FROM messages
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<ChatMessage> = rows
            .into_iter()
            .map(
                |(id, upstream_id, author_name, author_avatar, content, embeds, attachments, created_at)| {
                    ChatMessage {
                        id,
                        upstream_id,
                        author_name,
                        author_avatar,
                        content,
                        embeds: serde_json::from_str(&embeds).unwrap_or_default(),
                        attachments: serde_json::from_str(&attachments).unwrap_or_default(),
                        timestamp: created_at.parse().unwrap_or_else(|_| Utc::now()),
                    }
                },
            )
            .collect();
        messages.reverse();
        Ok(messages)
    }
}
