use crate::diff::ChangeLogEntry;
use crate::ledger::{
    materialize, now_timestamp, ChangeRequest, Decision, Ledger, LedgerError, NewChangeRequest,
    RequestStatus, Review,
};
use crate::record::Record;
use crate::store::{RecordStore, StoreError};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "records.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_records(
            seat_no TEXT PRIMARY KEY,
            name TEXT,
            record_json TEXT NOT NULL
        )",
        [],
    )?;
    // Workspaces created before edit tracking have no updated_at column.
    ensure_student_records_updated_at(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS change_requests(
            id TEXT PRIMARY KEY,
            teacher_id TEXT NOT NULL,
            teacher_name TEXT NOT NULL,
            student_seat_no TEXT NOT NULL,
            student_name TEXT NOT NULL,
            changes_json TEXT NOT NULL,
            status TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            reviewed_at TEXT,
            reviewed_by TEXT,
            admin_comment TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_change_requests_status ON change_requests(status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_change_requests_teacher ON change_requests(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn ensure_student_records_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "student_records", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE student_records ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Bulk-load write path. Creates the row if needed; returns true when it already existed.
pub fn upsert_record(conn: &Connection, key: &str, record: &Record) -> anyhow::Result<bool> {
    let existed: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM student_records WHERE seat_no = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    conn.execute(
        "INSERT INTO student_records(seat_no, name, record_json, updated_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(seat_no) DO UPDATE SET
           name = excluded.name,
           record_json = excluded.record_json,
           updated_at = excluded.updated_at",
        (
            key,
            record.student_name(),
            serde_json::to_string(record)?,
            now_timestamp(),
        ),
    )?;
    Ok(existed.is_some())
}

/// Seat number and name of every stored row, in seat order.
pub fn list_record_summaries(conn: &Connection) -> anyhow::Result<Vec<(String, Option<String>)>> {
    let mut stmt =
        conn.prepare("SELECT seat_no, name FROM student_records ORDER BY seat_no")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_rows(conn: &Connection, table: &str) -> anyhow::Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

pub struct SqliteRecordStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn store_backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl RecordStore for SqliteRecordStore<'_> {
    fn fetch_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM student_records WHERE seat_no = ?",
                [key],
                |r| r.get(0),
            )
            .optional()
            .map_err(store_backend)?;
        match raw {
            Some(s) => serde_json::from_str(&s).map(Some).map_err(store_backend),
            None => Ok(None),
        }
    }

    fn save_record(&mut self, key: &str, record: &Record) -> Result<(), StoreError> {
        let json = serde_json::to_string(record).map_err(store_backend)?;
        let changed = self
            .conn
            .execute(
                "UPDATE student_records
                 SET name = ?, record_json = ?, updated_at = ?
                 WHERE seat_no = ?",
                (record.student_name(), json, now_timestamp(), key),
            )
            .map_err(store_backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

pub struct SqliteLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteLedger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, where_sql: &str, params: &[&str]) -> Result<Vec<ChangeRequest>, LedgerError> {
        let sql = format!(
            "SELECT id, teacher_id, teacher_name, student_seat_no, student_name, changes_json,
                    status, submitted_at, reviewed_at, reviewed_by, admin_comment
             FROM change_requests
             {}
             ORDER BY rowid",
            where_sql
        );
        let mut stmt = self.conn.prepare(&sql).map_err(ledger_backend)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(RequestRow {
                    id: row.get(0)?,
                    teacher_id: row.get(1)?,
                    teacher_name: row.get(2)?,
                    student_seat_no: row.get(3)?,
                    student_name: row.get(4)?,
                    changes_json: row.get(5)?,
                    status: row.get(6)?,
                    submitted_at: row.get(7)?,
                    reviewed_at: row.get(8)?,
                    reviewed_by: row.get(9)?,
                    admin_comment: row.get(10)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(ledger_backend)?;
        rows.into_iter().map(RequestRow::into_request).collect()
    }
}

fn ledger_backend(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

struct RequestRow {
    id: String,
    teacher_id: String,
    teacher_name: String,
    student_seat_no: String,
    student_name: String,
    changes_json: String,
    status: String,
    submitted_at: String,
    reviewed_at: Option<String>,
    reviewed_by: Option<String>,
    admin_comment: Option<String>,
}

impl RequestRow {
    fn into_request(self) -> Result<ChangeRequest, LedgerError> {
        let changes: Vec<ChangeLogEntry> =
            serde_json::from_str(&self.changes_json).map_err(ledger_backend)?;
        let status = RequestStatus::parse(&self.status).ok_or_else(|| {
            LedgerError::Backend(format!("unknown status {:?} on {}", self.status, self.id))
        })?;
        let review = match (self.reviewed_at, self.reviewed_by) {
            (Some(reviewed_at), Some(reviewed_by)) => Some(Review {
                reviewed_at,
                reviewed_by,
                admin_comment: self.admin_comment,
            }),
            _ => None,
        };
        Ok(ChangeRequest {
            id: self.id,
            teacher_id: self.teacher_id,
            teacher_name: self.teacher_name,
            student_seat_no: self.student_seat_no,
            student_name: self.student_name,
            changes,
            status,
            submitted_at: self.submitted_at,
            review,
        })
    }
}

impl Ledger for SqliteLedger<'_> {
    fn append(&mut self, draft: NewChangeRequest) -> Result<ChangeRequest, LedgerError> {
        let request = materialize(draft)?;
        let changes_json = serde_json::to_string(&request.changes).map_err(ledger_backend)?;
        self.conn
            .execute(
                "INSERT INTO change_requests(
                    id, teacher_id, teacher_name, student_seat_no, student_name,
                    changes_json, status, submitted_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    &request.id,
                    &request.teacher_id,
                    &request.teacher_name,
                    &request.student_seat_no,
                    &request.student_name,
                    changes_json,
                    request.status.as_str(),
                    &request.submitted_at,
                ),
            )
            .map_err(ledger_backend)?;
        Ok(request)
    }

    fn list_all(&self) -> Result<Vec<ChangeRequest>, LedgerError> {
        self.query("", &[])
    }

    fn list_pending(&self) -> Result<Vec<ChangeRequest>, LedgerError> {
        self.query("WHERE status = ?", &[RequestStatus::Pending.as_str()])
    }

    fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<ChangeRequest>, LedgerError> {
        self.query("WHERE teacher_id = ?", &[teacher_id])
    }

    fn find_by_id(&self, id: &str) -> Result<Option<ChangeRequest>, LedgerError> {
        Ok(self.query("WHERE id = ?", &[id])?.into_iter().next())
    }

    fn transition(
        &mut self,
        id: &str,
        decision: Decision,
        reviewed_by: &str,
        admin_comment: Option<&str>,
    ) -> Result<Option<ChangeRequest>, LedgerError> {
        let changed = self
            .conn
            .execute(
                "UPDATE change_requests
                 SET status = ?, reviewed_at = ?, reviewed_by = ?, admin_comment = ?
                 WHERE id = ?",
                (
                    decision.status().as_str(),
                    now_timestamp(),
                    reviewed_by,
                    admin_comment,
                    id,
                ),
            )
            .map_err(ledger_backend)?;
        if changed == 0 {
            return Ok(None);
        }
        self.find_by_id(id)
    }
}
