//! Server-held conversation sessions keyed by opaque ids.

use crate::pipeline::language::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_MAX_ENTRIES: usize = 1_024;
pub const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Text,
    Pdf,
    Article,
}

/// One document conversation: the normalized source text, its latest
/// summary, and the response language. A summarize call overwrites the
/// whole record; the context is immutable between summarize calls.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub source: SourceKind,
    pub context: String,
    pub summary: Option<String>,
    pub language: Language,
    pub toc: Vec<String>,
    pub created_at_epoch_secs: u64,
    pub updated_at_epoch_secs: u64,
}

/// Keyed session state behind a capability abstraction so an alternate
/// backing store can replace the in-memory map without touching the
/// pipeline. Writes are last-writer-wins.
pub trait SessionStore: Send + Sync {
    fn create_id(&self) -> String;
    fn get(&self, id: &str) -> Option<Session>;
    fn put(&self, id: &str, session: Session);
}

struct StoredEntry {
    session: Session,
    stored_at: Instant,
}

/// Process-local store with bounded growth: entries expire after `ttl`
/// and the oldest entry is evicted once `max_entries` is reached.
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    max_entries: usize,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    fn purge_expired(entries: &mut HashMap<String, StoredEntry>, ttl: Duration) {
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
    }

    fn evict_oldest(entries: &mut HashMap<String, StoredEntry>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            entries.remove(&id);
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn get(&self, id: &str) -> Option<Session> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries
            .get(id)
            .is_some_and(|entry| entry.stored_at.elapsed() > self.ttl)
        {
            entries.remove(id);
            return None;
        }
        entries.get(id).map(|entry| entry.session.clone())
    }

    fn put(&self, id: &str, session: Session) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::purge_expired(&mut entries, self.ttl);
        if !entries.contains_key(id) && entries.len() >= self.max_entries {
            Self::evict_oldest(&mut entries);
        }
        entries.insert(
            id.to_string(),
            StoredEntry {
                session,
                stored_at: Instant::now(),
            },
        );
    }
}
