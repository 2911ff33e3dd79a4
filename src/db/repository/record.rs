use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::auth::UserId;
use crate::db::{open_database, open_memory_database, PersistenceError};
use crate::models::record::{NewRecord, StoredRecord};

/// Storage collaborator for medical records.
///
/// Append-only: records are created and listed, never updated.
pub trait RecordStore {
    /// Store a record for `user_id`; storage assigns id and `created_at`.
    fn create(&self, user_id: &UserId, record: &NewRecord) -> Result<StoredRecord, PersistenceError>;

    /// All records of `user_id`, newest first.
    fn list(&self, user_id: &UserId) -> Result<Vec<StoredRecord>, PersistenceError>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self::new(open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        Ok(Self::new(open_memory_database()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creation timestamp that sorts after every stored row, even if the
    /// wall clock stepped backwards. An unreadable latest stamp falls back
    /// to the clock instead of blocking the write.
    fn next_created_at(&self) -> Result<DateTime<Utc>, PersistenceError> {
        let now = truncate_millis(Utc::now());
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(created_at) FROM medical_records",
            [],
            |row| row.get(0),
        )?;

        let latest = latest.and_then(|s| {
            parse_created_at(&s)
                .inspect_err(|e| {
                    tracing::warn!(error = %e, "Ignoring unreadable latest created_at");
                })
                .ok()
        });
        Ok(match latest {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn create(&self, user_id: &UserId, record: &NewRecord) -> Result<StoredRecord, PersistenceError> {
        let id = Uuid::new_v4();
        let created_at = self.next_created_at()?;
        let medications_json = serde_json::to_string(&record.medications)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO medical_records
             (id, user_id, title, record_date, doctor_name, extracted_data, diagnosis,
              medications, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.to_string(),
                user_id.to_string(),
                record.title,
                record.record_date.format("%Y-%m-%d").to_string(),
                record.doctor_name,
                record.embedded_extraction,
                record.diagnosis,
                medications_json,
                format_created_at(&created_at),
            ],
        )?;

        tracing::info!(record_id = %id, user_id = %user_id, "Medical record stored");

        Ok(StoredRecord {
            id,
            user_id: *user_id,
            title: record.title.clone(),
            record_date: record.record_date,
            doctor_name: record.doctor_name.clone(),
            embedded_extraction: record.embedded_extraction.clone(),
            diagnosis: record.diagnosis.clone(),
            medications: record.medications.clone(),
            created_at,
        })
    }

    fn list(&self, user_id: &UserId) -> Result<Vec<StoredRecord>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, record_date, doctor_name, extracted_data, diagnosis,
                    medications, created_at
             FROM medical_records
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(RecordRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                record_date: row.get(3)?,
                doctor_name: row.get(4)?,
                extracted_data: row.get(5)?,
                diagnosis: row.get(6)?,
                medications: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(record_from_row(row?)?);
        }
        Ok(records)
    }
}

/// Column values as stored, before type conversion.
struct RecordRow {
    id: String,
    user_id: String,
    title: String,
    record_date: String,
    doctor_name: String,
    extracted_data: String,
    diagnosis: String,
    medications: String,
    created_at: String,
}

fn record_from_row(row: RecordRow) -> Result<StoredRecord, PersistenceError> {
    let id = Uuid::parse_str(&row.id).map_err(|e| corrupt(format!("id {}: {e}", row.id)))?;
    let user_id = row
        .user_id
        .parse::<UserId>()
        .map_err(|e| corrupt(format!("user_id {}: {e}", row.user_id)))?;
    let record_date = NaiveDate::parse_from_str(&row.record_date, "%Y-%m-%d")
        .map_err(|e| corrupt(format!("record_date {}: {e}", row.record_date)))?;
    let medications: Vec<String> = serde_json::from_str(&row.medications)
        .map_err(|e| corrupt(format!("medications for {id}: {e}")))?;

    Ok(StoredRecord {
        id,
        user_id,
        title: row.title,
        record_date,
        doctor_name: row.doctor_name,
        embedded_extraction: row.extracted_data,
        diagnosis: row.diagnosis,
        medications,
        created_at: parse_created_at(&row.created_at)?,
    })
}

fn corrupt(reason: String) -> PersistenceError {
    PersistenceError::CorruptRow {
        table: "medical_records".into(),
        reason,
    }
}

fn format_created_at(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_created_at(s: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("created_at {s}: {e}")))
}

fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
