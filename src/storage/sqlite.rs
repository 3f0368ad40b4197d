//! SQLite storage backend for Daydream

use super::traits::{DreamStore, OpenStore, StorageError, StorageResult};
use crate::dream::{Concept, ConceptId, Dream, DreamId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed dream store
///
/// Uses a single SQLite database file with tables for dreams and concepts.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Dreams table
            CREATE TABLE IF NOT EXISTS dreams (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            -- Index for newest-first dream listings
            CREATE INDEX IF NOT EXISTS idx_dreams_created_at
                ON dreams(created_at);

            -- Concepts table; parent links form a DAG within one dream
            CREATE TABLE IF NOT EXISTS concepts (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                parent1_id TEXT REFERENCES concepts(id),
                parent2_id TEXT REFERENCES concepts(id),
                dream_id TEXT NOT NULL REFERENCES dreams(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );

            -- Indexes for per-dream concept queries
            CREATE INDEX IF NOT EXISTS idx_concepts_dream
                ON concepts(dream_id);
            CREATE INDEX IF NOT EXISTS idx_concepts_dream_created_at
                ON concepts(dream_id, created_at);

            -- Enable foreign keys (required for the dream -> concepts cascade)
            PRAGMA foreign_keys = ON;

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Ok(())
    }

    /// Serialize a timestamp to its database column form.
    ///
    /// Fixed-width RFC 3339 with microseconds, so lexical ordering in SQL
    /// matches chronological ordering.
    fn ts_to_db(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Deserialize a timestamp from its database column form
    fn db_to_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| StorageError::DateParse(e.to_string()))?
            .with_timezone(&Utc))
    }

    fn parse_dream_id(raw: &str) -> StorageResult<DreamId> {
        DreamId::parse(raw).ok_or_else(|| StorageError::IdParse(raw.to_string()))
    }

    fn parse_concept_id(raw: &str) -> StorageResult<ConceptId> {
        ConceptId::parse(raw).ok_or_else(|| StorageError::IdParse(raw.to_string()))
    }

    /// Deserialize a dream from its row (id, created_at)
    fn row_to_dream(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn build_dream(id: String, created_at: String) -> StorageResult<Dream> {
        Ok(Dream {
            id: Self::parse_dream_id(&id)?,
            created_at: Self::db_to_ts(&created_at)?,
        })
    }

    /// Deserialize a concept from its row
    /// (id, content, parent1_id, parent2_id, dream_id, created_at)
    #[allow(clippy::type_complexity)]
    fn row_to_concept(
        row: &Row<'_>,
    ) -> rusqlite::Result<(String, String, Option<String>, Option<String>, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn build_concept(
        id: String,
        content: String,
        parent1_id: Option<String>,
        parent2_id: Option<String>,
        dream_id: String,
        created_at: String,
    ) -> StorageResult<Concept> {
        Ok(Concept {
            id: Self::parse_concept_id(&id)?,
            content,
            parent1_id: parent1_id
                .as_deref()
                .map(Self::parse_concept_id)
                .transpose()?,
            parent2_id: parent2_id
                .as_deref()
                .map(Self::parse_concept_id)
                .transpose()?,
            dream_id: Self::parse_dream_id(&dream_id)?,
            created_at: Self::db_to_ts(&created_at)?,
        })
    }

    fn insert_concept_stmt(conn: &Connection, concept: &Concept) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO concepts (id, content, parent1_id, parent2_id, dream_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                concept.id.to_string(),
                concept.content,
                concept.parent1_id.map(|id| id.to_string()),
                concept.parent2_id.map(|id| id.to_string()),
                concept.dream_id.to_string(),
                Self::ts_to_db(&concept.created_at),
            ],
        )?;
        Ok(())
    }

    fn query_concepts(
        conn: &Connection,
        sql: &str,
        query_params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Concept>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(query_params, Self::row_to_concept)?;

        let mut concepts = Vec::new();
        for row in rows {
            let (id, content, parent1, parent2, dream_id, created_at) = row?;
            concepts.push(Self::build_concept(
                id, content, parent1, parent2, dream_id, created_at,
            )?);
        }
        Ok(concepts)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DreamStore for SqliteStore {
    fn create_dream(&self, dream: &Dream, concepts: &[Concept]) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO dreams (id, created_at) VALUES (?1, ?2)",
            params![dream.id.to_string(), Self::ts_to_db(&dream.created_at)],
        )?;

        for concept in concepts {
            Self::insert_concept_stmt(&tx, concept)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_dream(&self, id: &DreamId) -> StorageResult<Option<Dream>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, created_at FROM dreams WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_dream,
            )
            .optional()?;

        match row {
            Some((id, created_at)) => Ok(Some(Self::build_dream(id, created_at)?)),
            None => Ok(None),
        }
    }

    fn list_dreams(&self, offset: u64, limit: u64) -> StorageResult<Vec<Dream>> {
        // An offset beyond i64 is past any possible row count
        let offset = match i64::try_from(offset) {
            Ok(n) => n,
            Err(_) => return Ok(Vec::new()),
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, created_at FROM dreams
            ORDER BY created_at DESC, id
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let rows = stmt.query_map(params![limit, offset], Self::row_to_dream)?;

        let mut dreams = Vec::new();
        for row in rows {
            let (id, created_at) = row?;
            dreams.push(Self::build_dream(id, created_at)?);
        }
        Ok(dreams)
    }

    fn count_dreams(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dreams", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn delete_dream(&self, id: &DreamId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM dreams WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn insert_concept(&self, concept: &Concept) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_concept_stmt(&conn, concept)
    }

    fn concepts_for_dream(&self, dream_id: &DreamId) -> StorageResult<Vec<Concept>> {
        let conn = self.conn.lock().unwrap();
        Self::query_concepts(
            &conn,
            r#"
            SELECT id, content, parent1_id, parent2_id, dream_id, created_at
            FROM concepts
            WHERE dream_id = ?1
            ORDER BY created_at DESC, id
            "#,
            params![dream_id.to_string()],
        )
    }

    fn initial_concepts(&self, dream_id: &DreamId) -> StorageResult<Vec<Concept>> {
        let conn = self.conn.lock().unwrap();
        Self::query_concepts(
            &conn,
            r#"
            SELECT id, content, parent1_id, parent2_id, dream_id, created_at
            FROM concepts
            WHERE dream_id = ?1 AND parent1_id IS NULL AND parent2_id IS NULL
            ORDER BY created_at ASC, id
            LIMIT 2
            "#,
            params![dream_id.to_string()],
        )
    }

    fn sample_concepts(&self, dream_id: &DreamId, count: u64) -> StorageResult<Vec<Concept>> {
        let conn = self.conn.lock().unwrap();
        Self::query_concepts(
            &conn,
            r#"
            SELECT id, content, parent1_id, parent2_id, dream_id, created_at
            FROM concepts
            WHERE dream_id = ?1
            ORDER BY RANDOM()
            LIMIT ?2
            "#,
            params![dream_id.to_string(), i64::try_from(count).unwrap_or(i64::MAX)],
        )
    }

    fn ping(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Build a seeded dream: two initial concepts plus one derived child,
    /// with strictly increasing timestamps.
    fn seeded_dream(content_a: &str, content_b: &str) -> (Dream, Vec<Concept>) {
        let dream = Dream::new();
        let mut a = Concept::initial(dream.id, content_a);
        let mut b = Concept::initial(dream.id, content_b);
        let mut child = Concept::derived(dream.id, "combined", a.id, b.id);

        a.created_at = dream.created_at + Duration::milliseconds(1);
        b.created_at = dream.created_at + Duration::milliseconds(2);
        child.created_at = dream.created_at + Duration::milliseconds(3);

        (dream, vec![a, b, child])
    }

    #[test]
    fn create_dream_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, concepts) = seeded_dream("sea of glass", "a forgotten key");

        store.create_dream(&dream, &concepts).unwrap();

        let loaded = store.get_dream(&dream.id).unwrap().unwrap();
        assert_eq!(loaded.id, dream.id);
        assert_eq!(loaded.created_at, dream.created_at);

        let loaded_concepts = store.concepts_for_dream(&dream.id).unwrap();
        assert_eq!(loaded_concepts.len(), 3);
        for original in &concepts {
            let loaded = loaded_concepts
                .iter()
                .find(|c| c.id == original.id)
                .unwrap();
            assert_eq!(loaded.created_at, original.created_at);
        }

        let initial: Vec<_> = loaded_concepts.iter().filter(|c| c.is_initial()).collect();
        assert_eq!(initial.len(), 2);

        let derived: Vec<_> = loaded_concepts.iter().filter(|c| !c.is_initial()).collect();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].parent1_id, Some(concepts[0].id));
        assert_eq!(derived[0].parent2_id, Some(concepts[1].id));
    }

    #[test]
    fn create_dream_rolls_back_on_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, mut concepts) = seeded_dream("sea of glass", "a forgotten key");
        // Duplicate primary key forces the third insert to fail
        concepts[2].id = concepts[0].id;

        let result = store.create_dream(&dream, &concepts);
        assert!(result.is_err());

        // The whole transaction rolled back, including the dream row
        assert!(store.get_dream(&dream.id).unwrap().is_none());
        assert_eq!(store.count_dreams().unwrap(), 0);
    }

    #[test]
    fn concepts_ordered_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, concepts) = seeded_dream("first idea", "second idea");
        store.create_dream(&dream, &concepts).unwrap();

        let loaded = store.concepts_for_dream(&dream.id).unwrap();
        for pair in loaded.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(loaded[0].content, "combined");
    }

    #[test]
    fn initial_concepts_in_creation_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, concepts) = seeded_dream("Purple elephant", "Quiet revolution");
        store.create_dream(&dream, &concepts).unwrap();

        let initial = store.initial_concepts(&dream.id).unwrap();
        assert_eq!(initial.len(), 2);
        assert_eq!(initial[0].content, "Purple elephant");
        assert_eq!(initial[1].content, "Quiet revolution");
    }

    #[test]
    fn sample_concepts_without_replacement() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, concepts) = seeded_dream("sea of glass", "a forgotten key");
        store.create_dream(&dream, &concepts).unwrap();

        let sampled = store.sample_concepts(&dream.id, 2).unwrap();
        assert_eq!(sampled.len(), 2);
        assert_ne!(sampled[0].id, sampled[1].id);
        for concept in &sampled {
            assert_eq!(concept.dream_id, dream.id);
        }
    }

    #[test]
    fn sample_caps_at_available_concepts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dream = Dream::new();
        let concept = Concept::initial(dream.id, "lonely idea");
        store.create_dream(&dream, &[concept]).unwrap();

        let sampled = store.sample_concepts(&dream.id, 2).unwrap();
        assert_eq!(sampled.len(), 1);
    }

    #[test]
    fn list_dreams_paginates_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut dream = Dream::new();
            dream.created_at = base + Duration::seconds(i);
            store.create_dream(&dream, &[]).unwrap();
            ids.push(dream.id);
        }

        assert_eq!(store.count_dreams().unwrap(), 5);

        let page = store.list_dreams(0, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[4]);
        assert_eq!(page[1].id, ids[3]);

        let tail = store.list_dreams(4, 2).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, ids[0]);

        let beyond = store.list_dreams(10, 2).unwrap();
        assert!(beyond.is_empty());

        // Offsets past i64 range read as an empty page, not the first one
        let far_beyond = store.list_dreams(u64::MAX, 2).unwrap();
        assert!(far_beyond.is_empty());
    }

    #[test]
    fn delete_dream_cascades_to_concepts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dream, concepts) = seeded_dream("sea of glass", "a forgotten key");
        store.create_dream(&dream, &concepts).unwrap();

        assert!(store.delete_dream(&dream.id).unwrap());
        assert!(store.get_dream(&dream.id).unwrap().is_none());
        assert!(store.concepts_for_dream(&dream.id).unwrap().is_empty());

        // Second delete reports nothing removed
        assert!(!store.delete_dream(&dream.id).unwrap());
    }

    #[test]
    fn ping_succeeds() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ping().unwrap();
    }

    #[test]
    fn open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("daydream.db");

        let (dream, concepts) = seeded_dream("sea of glass", "a forgotten key");
        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.create_dream(&dream, &concepts).unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        assert!(store.get_dream(&dream.id).unwrap().is_some());
        assert_eq!(store.concepts_for_dream(&dream.id).unwrap().len(), 3);
    }
}
