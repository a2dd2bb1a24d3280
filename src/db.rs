use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{EntityTable, ProgressScope, Question, SubTopic, Topic, TopicId};
use crate::store::Store;

pub const STORAGE_KEY: &str = "question-manager-storage-v2";

/// What a previous session left behind. Every key is optional so that a
/// partial value merges over defaults instead of being rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub topics: Option<EntityTable<Topic>>,
    #[serde(default)]
    pub sub_topics: Option<EntityTable<SubTopic>>,
    #[serde(default)]
    pub questions: Option<EntityTable<Question>>,
    #[serde(default)]
    pub ui: Option<PersistedUi>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUi {
    #[serde(default)]
    pub expanded_topics: Vec<TopicId>,
}

// The persisted subset, borrowed straight out of the store.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    topics: &'a EntityTable<Topic>,
    sub_topics: &'a EntityTable<SubTopic>,
    questions: &'a EntityTable<Question>,
    ui: SnapshotUi<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotUi<'a> {
    expanded_topics: &'a [TopicId],
}

impl<'a> From<&'a Store> for Snapshot<'a> {
    fn from(store: &'a Store) -> Self {
        Self {
            topics: store.topics(),
            sub_topics: store.sub_topics(),
            questions: store.questions(),
            ui: SnapshotUi {
                expanded_topics: &store.ui().expanded_topics,
            },
        }
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    // Key/value operations
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, now.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get(0)
            });

        match value {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn last_saved(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let stamp: Result<String> = self.conn.query_row(
            "SELECT updated_at FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match stamp {
            Ok(s) => Ok(DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Store persistence
    pub fn save_state(&self, store: &Store) -> std::result::Result<(), AppError> {
        let json = serde_json::to_string(&Snapshot::from(store))?;
        self.put(STORAGE_KEY, &json)?;
        debug!(bytes = json.len(), "persisted store");
        Ok(())
    }

    pub fn load_state(&self) -> std::result::Result<Option<PersistedState>, AppError> {
        match self.get(STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Rebuilds the store from the last persisted value. Anything missing,
    /// unreadable or structurally broken falls back to the bundled seed.
    pub fn hydrate(&self, scope: ProgressScope) -> Store {
        let store = match self.load_state() {
            Ok(Some(persisted)) => {
                let mut store = Store::seeded();
                store.restore(persisted);
                let problems = store.integrity_violations();
                if problems.is_empty() {
                    store
                } else {
                    warn!(
                        count = problems.len(),
                        first = %problems[0],
                        "persisted state is inconsistent, falling back to seed data"
                    );
                    Store::seeded()
                }
            }
            Ok(None) => {
                debug!("no persisted state, starting from seed data");
                Store::seeded()
            }
            Err(err) => {
                warn!(error = %err, "could not read persisted state, falling back to seed data");
                Store::seeded()
            }
        };
        store.with_progress_scope(scope)
    }
}
