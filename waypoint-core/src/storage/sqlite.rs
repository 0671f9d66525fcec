//! SQLite-backed thread storage
//!
//! Threads and their messages in one local database. Message parts and
//! metadata are stored as JSON columns so the wire shape survives a
//! round trip unchanged, including part types this build does not know
//! about.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::message::{Message, Part, Role};

/// Get current unix timestamp in milliseconds
fn unix_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Information about a thread for listing/display
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub id: String,
    pub resource_id: String,
    pub title: Option<String>,
    pub message_count: usize,
    /// Unix timestamp (ms) when created
    pub created_at: i64,
    /// Unix timestamp (ms) when last updated
    pub updated_at: i64,
}

/// Shared SQLite connection
///
/// The main entry point for persistence. One store serves every thread
/// owned by a resource (user) id.
pub struct ThreadStore {
    conn: Arc<Mutex<Connection>>,
}

impl ThreadStore {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // Timestamps are INTEGER (epoch milliseconds)
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                resource_id TEXT NOT NULL,
                title TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                thread_id TEXT REFERENCES threads(id) ON DELETE CASCADE,
                sequence_number INTEGER NOT NULL,
                role TEXT CHECK(role IN ('user', 'assistant', 'system')) NOT NULL,
                parts TEXT NOT NULL,
                metadata TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_threads_resource ON threads(resource_id, updated_at);
            CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, sequence_number);
            "#,
        )
        .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Create a new thread for a resource id, returning its id
    pub fn create_thread(&self, thread_id: &str, resource_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_timestamp_ms();
        conn.execute(
            "INSERT INTO threads (id, resource_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![thread_id, resource_id, now, now],
        )?;
        Ok(())
    }

    /// List threads for a resource, most recently updated first
    pub fn list_threads(&self, resource_id: &str) -> Result<Vec<ThreadInfo>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.resource_id, t.title, COUNT(m.id) as msg_count, t.created_at, t.updated_at
             FROM threads t
             LEFT JOIN messages m ON m.thread_id = t.id
             WHERE t.resource_id = ?1
             GROUP BY t.id
             ORDER BY t.updated_at DESC, t.created_at DESC, t.id",
        )?;

        let infos = stmt
            .query_map(params![resource_id], |row| {
                Ok(ThreadInfo {
                    id: row.get(0)?,
                    resource_id: row.get(1)?,
                    title: row.get(2)?,
                    message_count: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(infos)
    }

    /// Load a thread's messages in order
    ///
    /// Rows whose JSON no longer decodes are skipped with a warning
    /// rather than failing the whole load.
    pub fn load_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, role, parts, metadata FROM messages
             WHERE thread_id = ?1 ORDER BY sequence_number",
        )?;

        let rows = stmt
            .query_map(params![thread_id], |row| {
                let id: String = row.get(0)?;
                let role: String = row.get(1)?;
                let parts: String = row.get(2)?;
                let metadata: Option<String> = row.get(3)?;
                Ok((id, role, parts, metadata))
            })?
            .filter_map(|r| r.ok());

        let mut messages = Vec::new();
        for (id, role_str, parts_json, metadata_json) in rows {
            let role = match role_str.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                _ => {
                    warn!(message_id = %id, role = %role_str, "Skipping message with unknown role");
                    continue;
                }
            };
            let parts: Vec<Part> = match serde_json::from_str(&parts_json) {
                Ok(parts) => parts,
                Err(error) => {
                    warn!(message_id = %id, %error, "Skipping message with undecodable parts");
                    continue;
                }
            };
            let metadata = metadata_json.and_then(|json| serde_json::from_str::<Value>(&json).ok());
            messages.push(Message {
                id,
                role,
                parts,
                metadata,
            });
        }

        Ok(messages)
    }

    /// Append a message to a thread, assigning the next sequence number
    pub fn append_message(&self, thread_id: &str, message: &Message) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_timestamp_ms();

        let sequence_number: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM messages WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .unwrap_or(1);

        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let parts_json = serde_json::to_string(&message.parts)?;
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO messages (id, thread_id, sequence_number, role, parts, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &message.id,
                thread_id,
                sequence_number,
                role,
                &parts_json,
                &metadata_json,
                now
            ],
        )?;

        conn.execute(
            "UPDATE threads SET updated_at = ?1 WHERE id = ?2",
            params![now, thread_id],
        )?;

        Ok(())
    }

    /// Replace a stored message in place (streaming updates land here)
    pub fn update_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let parts_json = serde_json::to_string(&message.parts)?;
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            "UPDATE messages SET parts = ?1, metadata = ?2 WHERE id = ?3",
            params![&parts_json, &metadata_json, &message.id],
        )?;
        Ok(())
    }

    /// Rename a thread
    pub fn rename_thread(&self, thread_id: &str, title: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_timestamp_ms();
        conn.execute(
            "UPDATE threads SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now, thread_id],
        )?;
        Ok(())
    }

    /// Delete a thread and all its messages
    pub fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM messages WHERE thread_id = ?1",
            params![thread_id],
        )?;
        conn.execute("DELETE FROM threads WHERE id = ?1", params![thread_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Part;
    use serde_json::json;

    fn text_message(role: Role, text: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
            metadata: None,
        }
    }

    #[test]
    fn test_append_and_load_round_trip() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();

        let user = text_message(Role::User, "What's the weather in Rome?");
        let assistant = text_message(Role::Assistant, "Sunny, 24 degrees.");
        store.append_message("t1", &user).unwrap();
        store.append_message("t1", &assistant).unwrap();

        let loaded = store.load_messages("t1").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, user.id);
        assert_eq!(loaded[0].parts, user.parts);
        assert_eq!(loaded[1].role, Role::Assistant);
    }

    #[test]
    fn test_unknown_part_types_survive_storage() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();

        let mut message = text_message(Role::Assistant, "hi");
        message
            .parts
            .push(Part::Unknown(json!({ "type": "step-start" })));
        store.append_message("t1", &message).unwrap();

        let loaded = store.load_messages("t1").unwrap();
        assert_eq!(loaded[0].parts.len(), 2);
        assert!(matches!(loaded[0].parts[1], Part::Unknown(_)));
    }

    #[test]
    fn test_corrupt_rows_are_skipped() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();
        store
            .append_message("t1", &text_message(Role::User, "first"))
            .unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO messages (id, thread_id, sequence_number, role, parts, created_at)
                 VALUES ('bad', 't1', 2, 'user', 'not json', 0)",
                [],
            )
            .unwrap();
        }

        let loaded = store.load_messages("t1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].parts[0], Part::Text { text: "first".to_string() });
    }

    #[test]
    fn test_rows_with_unknown_role_are_skipped() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();
        store
            .append_message("t1", &text_message(Role::User, "hello"))
            .unwrap();

        // A row written by some other frontend with a role this message
        // model does not carry.
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO messages (id, thread_id, sequence_number, role, parts, created_at)
                 VALUES ('sys', 't1', 2, 'system', '[]', 0)",
                [],
            )
            .unwrap();
        }

        let loaded = store.load_messages("t1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].role, Role::User);
    }

    #[test]
    fn test_listing_order_is_stable_under_timestamp_ties() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();
        store.create_thread("t2", "traveler").unwrap();
        store.create_thread("t3", "traveler").unwrap();

        // Force every timestamp onto the same millisecond, then bump t3.
        {
            let conn = store.conn.lock().unwrap();
            conn.execute("UPDATE threads SET created_at = 1000, updated_at = 1000", [])
                .unwrap();
            conn.execute("UPDATE threads SET updated_at = 2000 WHERE id = 't3'", [])
                .unwrap();
        }

        let threads = store.list_threads("traveler").unwrap();
        let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t1", "t2"]);

        let again = store.list_threads("traveler").unwrap();
        let ids_again: Vec<&str> = again.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ids_again);
    }

    #[test]
    fn test_list_rename_delete() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();
        store.create_thread("t2", "traveler").unwrap();
        store.create_thread("other", "someone-else").unwrap();
        store
            .append_message("t1", &text_message(Role::User, "hello"))
            .unwrap();

        store.rename_thread("t1", Some("Trip planning")).unwrap();

        let threads = store.list_threads("traveler").unwrap();
        assert_eq!(threads.len(), 2);
        // t1 was touched last by the rename
        assert_eq!(threads[0].id, "t1");
        assert_eq!(threads[0].title.as_deref(), Some("Trip planning"));
        assert_eq!(threads[0].message_count, 1);

        store.delete_thread("t1").unwrap();
        let threads = store.list_threads("traveler").unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "t2");
    }

    #[test]
    fn test_update_message_replaces_parts() {
        let store = ThreadStore::in_memory().unwrap();
        store.create_thread("t1", "traveler").unwrap();
        let mut message = text_message(Role::Assistant, "partial");
        store.append_message("t1", &message).unwrap();

        message.parts = vec![Part::Text {
            text: "complete answer".to_string(),
        }];
        store.update_message(&message).unwrap();

        let loaded = store.load_messages("t1").unwrap();
        assert_eq!(
            loaded[0].parts[0],
            Part::Text { text: "complete answer".to_string() }
        );
    }
}
