use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use smartsort_core::{AnalysisSession, DuplicateGroup, FileRecord, SessionId};

use crate::error::{CacheError, Result};
use crate::store::ResultCache;

/// Key tying a cached result to a file's size and modification time.
///
/// Any change to either value produces a different fingerprint, so stale
/// entries are never returned.
pub fn metadata_fingerprint(modified: DateTime<Utc>, size: u64) -> String {
    let nanos = modified
        .timestamp_nanos_opt()
        .unwrap_or_else(|| modified.timestamp_micros().saturating_mul(1000));
    blake3::hash(format!("{nanos}:{size}").as_bytes())
        .to_hex()
        .to_string()
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(column: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| conversion_error(column, e))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisSession> {
    let session_id: String = row.get(0)?;
    let directory_path: String = row.get(1)?;
    let timestamp: String = row.get(2)?;
    let files_processed: i64 = row.get(3)?;
    let status: String = row.get(5)?;
    let summary: String = row.get(6)?;
    let metrics: String = row.get(7)?;

    Ok(AnalysisSession {
        session_id: SessionId::new(session_id),
        directory_path: PathBuf::from(directory_path),
        timestamp: parse_timestamp(2, &timestamp)?,
        files_processed: files_processed.max(0) as u64,
        processing_time_seconds: row.get(4)?,
        status: status.parse().map_err(|e| conversion_error(5, e))?,
        summary: parse_json(6, &summary)?,
        performance_metrics: parse_json(7, &metrics)?,
    })
}

const SESSION_COLUMNS: &str = "session_id, directory_path, timestamp, files_processed, \
                               processing_time, status, summary, performance_metrics";

impl ResultCache {
    // ── File results ─────────────────────────────────────────────

    /// Look up a cached record for `path`, using its current metadata.
    ///
    /// Returns `None` when the file cannot be stat'ed, when no entry matches,
    /// or when the stored payload no longer deserializes.
    pub fn lookup(&self, path: &Path) -> Result<Option<FileRecord>> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!("Cache lookup skipped for {}: {}", path.display(), e);
                return Ok(None);
            }
        };
        let modified = match metadata.modified() {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(_) => return Ok(None),
        };
        self.lookup_with_metadata(path, modified, metadata.len())
    }

    /// Look up the newest entry for `path` whose metadata fingerprint matches.
    pub fn lookup_with_metadata(
        &self,
        path: &Path,
        modified: DateTime<Utc>,
        size: u64,
    ) -> Result<Option<FileRecord>> {
        let key = metadata_fingerprint(modified, size);
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT result FROM file_cache \
             WHERE filepath = ?1 AND metadata_fingerprint = ?2 \
             ORDER BY id DESC LIMIT 1",
        )?;
        let payload: Option<String> = stmt
            .query_row(params![path_key(path), key], |row| row.get(0))
            .optional()?;

        Ok(payload.and_then(|json| match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Discarding unreadable cache entry for {}: {}", path.display(), e);
                None
            }
        }))
    }

    /// Append a result for the record's path. Earlier entries are kept.
    pub fn store(&self, record: &FileRecord, session_id: &SessionId) -> Result<()> {
        let key = metadata_fingerprint(record.modified_at, record.size_bytes);
        let payload = serde_json::to_string(record)?;
        let conn = self.conn();
        conn.prepare_cached(
            "INSERT INTO file_cache \
             (filepath, metadata_fingerprint, result, session_id, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![
            path_key(&record.path),
            key,
            payload,
            session_id.as_str(),
            Utc::now().to_rfc3339(),
        ])?;
        Ok(())
    }

    /// Total number of cached result rows, including superseded ones.
    pub fn entry_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM file_cache", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    // ── Sessions ─────────────────────────────────────────────────

    /// Persist session metadata.
    ///
    /// Sessions are immutable once recorded: a second insert under the same
    /// id fails with a constraint error and leaves the stored row untouched.
    pub fn record_session(&self, session: &AnalysisSession) -> Result<()> {
        let summary = serde_json::to_string(&session.summary)?;
        let metrics = serde_json::to_string(&session.performance_metrics)?;
        self.conn().execute(
            "INSERT INTO analysis_session \
             (session_id, directory_path, timestamp, files_processed, \
              processing_time, status, summary, performance_metrics) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.session_id.as_str(),
                path_key(&session.directory_path),
                session.timestamp.to_rfc3339(),
                session.files_processed as i64,
                session.processing_time_seconds,
                session.status.to_string(),
                summary,
                metrics,
            ],
        )?;
        debug!("Recorded session {}", session.session_id);
        Ok(())
    }

    /// Persist the per-file results of a session.
    pub fn record_session_files(
        &self,
        session_id: &SessionId,
        records: &[FileRecord],
    ) -> Result<usize> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO session_file (session_id, filepath, record) \
                 VALUES (?1, ?2, ?3)",
            )?;
            for record in records {
                let payload = serde_json::to_string(record)?;
                count += stmt.execute(params![
                    session_id.as_str(),
                    path_key(&record.path),
                    payload
                ])?;
            }
        }
        tx.commit()?;
        debug!("Stored {} session files for {}", count, session_id);
        Ok(count)
    }

    /// Persist the duplicate groups of a session in report order.
    pub fn record_session_groups(
        &self,
        session_id: &SessionId,
        groups: &[DuplicateGroup],
    ) -> Result<usize> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO session_group (session_id, signature, kind, confidence, payload) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for group in groups {
                let payload = serde_json::to_string(group)?;
                count += stmt.execute(params![
                    session_id.as_str(),
                    group.signature,
                    group.kind.to_string(),
                    group.confidence,
                    payload,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Stored {} groups for {}", count, session_id);
        Ok(count)
    }

    /// Most recent sessions first.
    pub fn history(&self, limit: usize) -> Result<Vec<AnalysisSession>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SESSION_COLUMNS} FROM analysis_session ORDER BY rowid DESC LIMIT ?1"
        ))?;
        let sessions = stmt
            .query_map(params![limit as i64], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn session(&self, session_id: &SessionId) -> Result<Option<AnalysisSession>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SESSION_COLUMNS} FROM analysis_session WHERE session_id = ?1"
        ))?;
        match stmt.query_row(params![session_id.as_str()], session_from_row) {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Database(e)),
        }
    }

    /// Stored file records of a session, ordered by path.
    pub fn session_files(&self, session_id: &SessionId) -> Result<Vec<FileRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT record FROM session_file WHERE session_id = ?1 ORDER BY filepath",
        )?;
        let payloads = stmt
            .query_map(params![session_id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        payloads
            .iter()
            .map(|json| serde_json::from_str(json).map_err(CacheError::from))
            .collect()
    }

    /// Stored groups of a session, in the order they were reported.
    pub fn session_groups(&self, session_id: &SessionId) -> Result<Vec<DuplicateGroup>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached("SELECT payload FROM session_group WHERE session_id = ?1 ORDER BY id")?;
        let payloads = stmt
            .query_map(params![session_id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        payloads
            .iter()
            .map(|json| serde_json::from_str(json).map_err(CacheError::from))
            .collect()
    }
}
