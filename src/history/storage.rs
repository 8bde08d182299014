use super::{ChatMessage, MessageType, Role};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use libsql::{Builder, Connection, Database, Value};
use tracing::{debug, error, info};

/// Append-only chat history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persists a message, stamping `id` and `created_at`; returns the stored record.
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage>;

    /// All messages in ascending creation order.
    async fn list(&self) -> Result<Vec<ChatMessage>>;

    /// Removes every message; returns how many were deleted.
    async fn clear(&self) -> Result<u64>;
}

struct Store {
    // Keeps the database handle alive for the lifetime of the connection.
    _db: Database,
    conn: Connection,
}

/// libSQL-backed chat history.
///
/// A storage without a database (connection failure or no URL configured)
/// still serves the process, but every operation fails with
/// [`Error::StoreUnavailable`].
pub struct HistoryStorage {
    store: Option<Store>,
}

impl HistoryStorage {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::connect(db_url, None).await
    }

    pub async fn connect(db_url: &str, auth_token: Option<&str>) -> Result<Self> {
        match Self::init_database(db_url, auth_token).await {
            Ok(store) => {
                info!("Database initialized successfully: {}", db_url);
                Ok(Self { store: Some(store) })
            }
            Err(e) => {
                error!(
                    "Database connection failed, persistence will be unavailable: {}",
                    e
                );
                Ok(Self::unavailable())
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    async fn init_database(db_url: &str, auth_token: Option<&str>) -> Result<Store> {
        let db = if is_remote_url(db_url) {
            Builder::new_remote(
                db_url.to_string(),
                auth_token.unwrap_or_default().to_string(),
            )
            .build()
            .await?
        } else {
            Builder::new_local(db_url).build().await?
        };

        // One shared connection: every `:memory:` connection is a separate database.
        let conn = db.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                message_type TEXT NOT NULL DEFAULT 'text',
                image TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            (),
        )
        .await?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_created_at ON chat_messages (created_at)",
            (),
        )
        .await?;

        Ok(Store { _db: db, conn })
    }

    fn conn(&self) -> Result<&Connection> {
        self.store
            .as_ref()
            .map(|store| &store.conn)
            .ok_or(Error::StoreUnavailable)
    }
}

#[async_trait]
impl MessageStore for HistoryStorage {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage> {
        if message.text.is_empty() {
            return Err(Error::validation("Message text must not be empty"));
        }
        let conn = self.conn()?;

        let mut message = ChatMessage {
            id: None,
            created_at: Utc::now(),
            ..message
        };

        let params = vec![
            Value::Text(message.role.as_str().to_string()),
            Value::Text(message.text.clone()),
            Value::Text(message.message_type.as_str().to_string()),
            message
                .image
                .clone()
                .map(Value::Text)
                .unwrap_or(Value::Null),
            Value::Text(
                message
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        ];

        let mut rows = conn
            .query(
                "INSERT INTO chat_messages (role, text, message_type, image, created_at) \
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
                params,
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| Error::internal("Insert returned no id"))?;
        message.id = Some(row.get::<i64>(0)?);

        debug!(
            "Saved {} {} message with id {:?}",
            message.role, message.message_type, message.id
        );
        Ok(message)
    }

    async fn list(&self) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, role, text, message_type, image, created_at FROM chat_messages \
                 ORDER BY created_at ASC, id ASC",
                (),
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let role: String = row.get(1)?;
            let message_type: String = row.get(3)?;
            let image = match row.get_value(4)? {
                Value::Text(image) => Some(image),
                _ => None,
            };
            let created_at_str: String = row.get(5)?;
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|e| Error::internal(format!("Failed to parse timestamp: {e}")))?
                .with_timezone(&Utc);

            messages.push(ChatMessage {
                id: Some(row.get(0)?),
                role: role.parse::<Role>()?,
                text: row.get(2)?,
                message_type: message_type.parse::<MessageType>()?,
                image,
                created_at,
            });
        }

        debug!("Retrieved {} messages from history", messages.len());
        Ok(messages)
    }

    async fn clear(&self) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM chat_messages", ()).await?;
        info!("Cleared {} messages from history", deleted);
        Ok(deleted)
    }
}

fn is_remote_url(db_url: &str) -> bool {
    ["libsql://", "http://", "https://", "wss://", "ws://"]
        .iter()
        .any(|scheme| db_url.starts_with(scheme))
}
