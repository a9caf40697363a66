//! SQLite-based storage for sessions, the baby profile and cached state.
//!
//! Provides persistent storage for:
//! - Logged sleep sessions (soft-deleted, never removed)
//! - The baby profile
//! - The last computed learner state
//! - Key-value store for application state (e.g. a running timer)

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError};
use crate::learner::LearnerState;
use crate::profile::BabyProfile;
use crate::session::{Quality, SessionSource, SleepSession};
use crate::time;

const SESSION_COLUMNS: &str =
    "id, start_at, end_at, quality, notes, source, deleted, updated_at";

/// Timestamps are stored as fixed-width UTC text so they sort lexically.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_ts(row: &rusqlite::Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// Build a SleepSession from a row selected with `SESSION_COLUMNS`
fn row_to_session(row: &rusqlite::Row) -> Result<SleepSession, rusqlite::Error> {
    let quality = row
        .get::<_, Option<u8>>(3)?
        .map(Quality::new)
        .transpose()
        .map_err(|e| conversion_error(3, e))?;
    let source: String = row.get(5)?;
    let source = source
        .parse::<SessionSource>()
        .map_err(|e| conversion_error(5, e))?;

    Ok(SleepSession {
        id: row.get(0)?,
        start: parse_ts(row, 1)?,
        end: parse_ts(row, 2)?,
        quality,
        notes: row.get(4)?,
        source,
        deleted: row.get(6)?,
        updated_at: parse_ts(row, 7)?,
    })
}

fn row_to_profile(row: &rusqlite::Row) -> Result<BabyProfile, rusqlite::Error> {
    let birth: String = row.get(2)?;
    let birth_date = NaiveDate::parse_from_str(&birth, "%Y-%m-%d")
        .map_err(|e| conversion_error(2, e))?;
    Ok(BabyProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date,
        created_at: parse_ts(row, 3)?,
        updated_at: parse_ts(row, 4)?,
    })
}

/// Undecodable rows become `CorruptRow`, everything else keeps its mapping.
fn decode_error(table: &'static str) -> impl Fn(rusqlite::Error) -> DatabaseError {
    move |err| match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => DatabaseError::CorruptRow {
            table: table.to_string(),
            message: inner.to_string(),
        },
        other => other.into(),
    }
}

/// SQLite database for napcast data.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/napcast.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("napcast.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Sessions ===

    /// Insert a new session.
    ///
    /// # Errors
    /// Fails for inverted ranges and duplicate ids.
    pub fn insert_session(&self, session: &SleepSession) -> Result<(), DatabaseError> {
        if !session.is_valid() {
            return Err(DatabaseError::QueryFailed(format!(
                "session {} ends before it starts",
                session.id
            )));
        }
        self.conn.execute(
            &format!("INSERT INTO sleep_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                session.id,
                format_ts(session.start),
                format_ts(session.end),
                session.quality.map(|q| q.get()),
                session.notes,
                session.source.as_str(),
                session.deleted,
                format_ts(session.updated_at),
            ],
        )?;
        tracing::info!(id = %session.id, "session inserted");
        Ok(())
    }

    /// Overwrite every field of an existing session.
    pub fn update_session(&self, session: &SleepSession) -> Result<(), DatabaseError> {
        if !session.is_valid() {
            return Err(DatabaseError::QueryFailed(format!(
                "session {} ends before it starts",
                session.id
            )));
        }
        let changed = self.conn.execute(
            "UPDATE sleep_sessions
             SET start_at = ?2, end_at = ?3, quality = ?4, notes = ?5,
                 source = ?6, deleted = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                session.id,
                format_ts(session.start),
                format_ts(session.end),
                session.quality.map(|q| q.get()),
                session.notes,
                session.source.as_str(),
                session.deleted,
                format_ts(session.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                kind: "session".into(),
                id: session.id.clone(),
            });
        }
        tracing::info!(id = %session.id, "session updated");
        Ok(())
    }

    /// Mark a session deleted. The row stays for sync and history.
    pub fn soft_delete_session(&self, id: &str, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE sleep_sessions SET deleted = 1, updated_at = ?2 WHERE id = ?1 AND deleted = 0",
            params![id, format_ts(now)],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                kind: "session".into(),
                id: id.to_string(),
            });
        }
        tracing::info!(id, "session deleted");
        Ok(())
    }

    /// Look up a session by id, deleted or not.
    pub fn get_session(&self, id: &str) -> Result<Option<SleepSession>, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sleep_sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
            .map_err(decode_error("sleep_sessions"))
    }

    fn query_sessions(
        &self,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<SleepSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sleep_sessions
             WHERE deleted = 0 {filter}
             ORDER BY start_at, id"
        ))?;
        let rows = stmt.query_map(args, row_to_session)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(decode_error("sleep_sessions"))
    }

    /// Non-deleted sessions touching `[from, to]`, ordered by start.
    pub fn sessions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SleepSession>, DatabaseError> {
        self.query_sessions(
            "AND start_at <= ?2 AND end_at >= ?1",
            params![format_ts(from), format_ts(to)],
        )
    }

    /// Non-deleted sessions overlapping the local calendar day `date`.
    pub fn sessions_for_day(
        &self,
        date: NaiveDate,
        tz: FixedOffset,
    ) -> Result<Vec<SleepSession>, DatabaseError> {
        let start = time::at_local(date, NaiveTime::MIN, tz).with_timezone(&Utc);
        let end = start + Duration::days(1);
        self.query_sessions(
            "AND start_at < ?2 AND end_at > ?1",
            params![format_ts(start), format_ts(end)],
        )
    }

    /// Every non-deleted session, ordered by start.
    pub fn all_sessions(&self) -> Result<Vec<SleepSession>, DatabaseError> {
        self.query_sessions("", [])
    }

    // === Profile ===

    /// The profile in use: the oldest one created.
    pub fn active_profile(&self) -> Result<Option<BabyProfile>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, name, birth_date, created_at, updated_at
                 FROM baby_profiles ORDER BY created_at, id LIMIT 1",
                [],
                row_to_profile,
            )
            .optional()
            .map_err(decode_error("baby_profiles"))
    }

    pub fn upsert_profile(&self, profile: &BabyProfile) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO baby_profiles (id, name, birth_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                birth_date = excluded.birth_date,
                updated_at = excluded.updated_at",
            params![
                profile.id,
                profile.name,
                profile.birth_date.format("%Y-%m-%d").to_string(),
                format_ts(profile.created_at),
                format_ts(profile.updated_at),
            ],
        )?;
        tracing::info!(id = %profile.id, "profile saved");
        Ok(())
    }

    // === Learner cache ===

    pub fn save_learner_state(&self, state: &LearnerState) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO learner_state
                (id, version, ewma_nap_length_min, ewma_wake_window_min, confidence, last_updated)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                state.version,
                state.ewma_nap_length_min,
                state.ewma_wake_window_min,
                state.confidence,
                format_ts(state.last_updated),
            ],
        )?;
        Ok(())
    }

    pub fn load_learner_state(&self) -> Result<Option<LearnerState>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT version, ewma_nap_length_min, ewma_wake_window_min, confidence, last_updated
                 FROM learner_state WHERE id = 1",
                [],
                |row| {
                    Ok(LearnerState {
                        version: row.get(0)?,
                        ewma_nap_length_min: row.get(1)?,
                        ewma_wake_window_min: row.get(2)?,
                        confidence: row.get(3)?,
                        last_updated: parse_ts(row, 4)?,
                    })
                },
            )
            .optional()
            .map_err(decode_error("learner_state"))
    }

    // === Key-value ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn kv_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    /// Delete all user data. The schema stays in place.
    pub fn reset_all(&self) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM sleep_sessions;
             DELETE FROM baby_profiles;
             DELETE FROM learner_state;
             DELETE FROM kv;",
        )?;
        tx.commit()?;
        tracing::info!("all data reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, h, m, 0).unwrap()
    }

    fn session(start: DateTime<Utc>, end: DateTime<Utc>) -> SleepSession {
        SleepSession::new(start, end, SessionSource::Manual, end).unwrap()
    }

    #[test]
    fn insert_and_get_session() {
        let db = Database::open_memory().unwrap();
        let s = session(utc(2, 9, 0), utc(2, 10, 15))
            .with_quality(Quality::new(4).unwrap())
            .with_notes("car seat");
        db.insert_session(&s).unwrap();

        let loaded = db.get_session(&s.id).unwrap().unwrap();
        assert_eq!(loaded, s);
        assert!(db.get_session("sess_missing").unwrap().is_none());
    }

    #[test]
    fn rejects_inverted_and_duplicate() {
        let db = Database::open_memory().unwrap();
        let s = session(utc(2, 9, 0), utc(2, 10, 0));
        db.insert_session(&s).unwrap();
        assert!(db.insert_session(&s).is_err());

        let mut inverted = s.clone();
        inverted.id = "sess_inverted".into();
        inverted.end = inverted.start;
        assert!(db.insert_session(&inverted).is_err());
    }

    #[test]
    fn update_and_soft_delete() {
        let db = Database::open_memory().unwrap();
        let mut s = session(utc(2, 9, 0), utc(2, 10, 0));
        db.insert_session(&s).unwrap();

        s.end = utc(2, 10, 30);
        db.update_session(&s).unwrap();
        assert_eq!(db.get_session(&s.id).unwrap().unwrap().end, utc(2, 10, 30));

        db.soft_delete_session(&s.id, utc(2, 11, 0)).unwrap();
        let gone = db.get_session(&s.id).unwrap().unwrap();
        assert!(gone.deleted);
        assert_eq!(gone.updated_at, utc(2, 11, 0));
        assert!(db.all_sessions().unwrap().is_empty());

        assert!(matches!(
            db.soft_delete_session(&s.id, utc(2, 12, 0)),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn update_missing_is_not_found() {
        let db = Database::open_memory().unwrap();
        let s = session(utc(2, 9, 0), utc(2, 10, 0));
        assert!(matches!(
            db.update_session(&s),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn range_queries() {
        let db = Database::open_memory().unwrap();
        let night = session(utc(1, 19, 0), utc(2, 6, 0));
        let nap = session(utc(2, 13, 0), utc(2, 14, 0));
        let other_day = session(utc(3, 13, 0), utc(3, 14, 0));
        for s in [&other_day, &nap, &night] {
            db.insert_session(s).unwrap();
        }

        let all = db.all_sessions().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, night.id);

        let day = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let utc0 = FixedOffset::east_opt(0).unwrap();
        let ids: Vec<_> = db
            .sessions_for_day(day, utc0)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![night.id.clone(), nap.id.clone()]);

        let between = db.sessions_between(utc(2, 14, 0), utc(3, 12, 0)).unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].id, nap.id);
    }

    #[test]
    fn profile_upsert_and_active() {
        let db = Database::open_memory().unwrap();
        assert!(db.active_profile().unwrap().is_none());

        let birth = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut profile = BabyProfile::new("Ada", birth, utc(1, 8, 0));
        db.upsert_profile(&profile).unwrap();
        let later = BabyProfile::new("Second", birth, utc(2, 8, 0));
        db.upsert_profile(&later).unwrap();

        profile.name = "Ada L".into();
        profile.updated_at = utc(3, 8, 0);
        db.upsert_profile(&profile).unwrap();

        let active = db.active_profile().unwrap().unwrap();
        assert_eq!(active, profile);
    }

    #[test]
    fn learner_state_cache() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_learner_state().unwrap().is_none());

        let state = LearnerState {
            version: 1,
            ewma_nap_length_min: 66.825,
            ewma_wake_window_min: 130.5,
            last_updated: utc(2, 9, 0),
            confidence: 0.1,
        };
        db.save_learner_state(&state).unwrap();
        db.save_learner_state(&state).unwrap();
        assert_eq!(db.load_learner_state().unwrap(), Some(state));
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        assert!(db.kv_delete("test").unwrap());
        assert!(!db.kv_delete("test").unwrap());
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let db = Database::open_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO sleep_sessions (id, start_at, end_at, updated_at)
                 VALUES ('sess_bad', 'yesterday', '2024-07-02T10:00:00.000Z', '2024-07-02T10:00:00.000Z')",
                [],
            )
            .unwrap();
        assert!(matches!(
            db.all_sessions(),
            Err(DatabaseError::CorruptRow { .. })
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let db = Database::open_memory().unwrap();
        db.insert_session(&session(utc(2, 9, 0), utc(2, 10, 0))).unwrap();
        db.kv_set("timer.start", "x").unwrap();
        db.reset_all().unwrap();
        assert!(db.all_sessions().unwrap().is_empty());
        assert!(db.kv_get("timer.start").unwrap().is_none());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("napcast.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
