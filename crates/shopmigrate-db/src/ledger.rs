use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use shopmigrate_common::{DEFAULT_LEDGER_TABLE, Error, Result};

use crate::quote_ident;

/// Persisted fact that a unit has been applied. Rows are only ever inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: String,
    pub checksum: String,
    pub outcome: RecordOutcome,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// The unit's statements ran.
    Applied,
    /// The objects were already in the schema; recorded without running DDL.
    Adopted,
}

impl RecordOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RecordOutcome::Applied => "applied",
            RecordOutcome::Adopted => "adopted",
        }
    }

}

impl FromSql for RecordOutcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "applied" => Ok(RecordOutcome::Applied),
            "adopted" => Ok(RecordOutcome::Adopted),
            other => Err(FromSqlError::Other(
                format!("unknown ledger outcome '{other}'").into(),
            )),
        }
    }
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only log of applied units, kept in a table of the target database.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn ensure(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                checksum TEXT NOT NULL,
                outcome TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );",
            quote_ident(&self.table)
        ))
    }

    fn exists(&self, conn: &Connection) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![self.table],
            |row| row.get(0),
        )
    }

    pub fn find(&self, conn: &Connection, id: &str) -> rusqlite::Result<Option<MigrationRecord>> {
        if !self.exists(conn)? {
            return Ok(None);
        }
        conn.query_row(
            &format!(
                "SELECT id, checksum, outcome, applied_at FROM {} WHERE id = ?1",
                quote_ident(&self.table)
            ),
            params![id],
            read_record,
        )
        .optional()
    }

    /// All records in the order they were written.
    pub fn records(&self, conn: &Connection) -> Result<Vec<MigrationRecord>> {
        let ledger_err = |e: rusqlite::Error| {
            Error::Database(format!("failed to read ledger {}: {e}", self.table))
        };
        if !self.exists(conn).map_err(ledger_err)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, checksum, outcome, applied_at FROM {} ORDER BY seq ASC",
                quote_ident(&self.table)
            ))
            .map_err(ledger_err)?;

        let rows = stmt.query_map([], read_record).map_err(ledger_err)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(ledger_err)?);
        }
        Ok(records)
    }

    /// Must be called inside the unit's transaction so the record commits
    /// together with the schema change.
    pub(crate) fn append(
        &self,
        conn: &Connection,
        id: &str,
        checksum: &str,
        outcome: RecordOutcome,
    ) -> rusqlite::Result<MigrationRecord> {
        let applied_at = Utc::now();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, checksum, outcome, applied_at) VALUES (?1, ?2, ?3, ?4)",
                quote_ident(&self.table)
            ),
            params![id, checksum, outcome.as_str(), applied_at.to_rfc3339()],
        )?;
        Ok(MigrationRecord {
            id: id.to_string(),
            checksum: checksum.to_string(),
            outcome,
            applied_at,
        })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_TABLE)
    }
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MigrationRecord> {
    Ok(MigrationRecord {
        id: row.get(0)?,
        checksum: row.get(1)?,
        outcome: row.get(2)?,
        applied_at: parse_datetime(&row.get::<_, String>(3)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
    })
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // rows written by hand with datetime('now') use "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ledger_reads_as_empty() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::default();
        assert!(ledger.records(&conn).unwrap().is_empty());
        assert!(ledger.find(&conn, "Products").unwrap().is_none());
    }

    #[test]
    fn append_then_find_and_list_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::default();
        ledger.ensure(&conn).unwrap();

        ledger
            .append(&conn, "Products", "abc", RecordOutcome::Applied)
            .unwrap();
        ledger
            .append(&conn, "Clients", "def", RecordOutcome::Adopted)
            .unwrap();

        let found = ledger.find(&conn, "Clients").unwrap().unwrap();
        assert_eq!(found.checksum, "def");
        assert_eq!(found.outcome, RecordOutcome::Adopted);

        let ids: Vec<_> = ledger
            .records(&conn)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["Products", "Clients"]);
    }

    #[test]
    fn a_unit_can_only_be_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::new("schema_log");
        ledger.ensure(&conn).unwrap();
        ledger.ensure(&conn).unwrap();

        ledger
            .append(&conn, "Orders", "x", RecordOutcome::Applied)
            .unwrap();
        assert!(
            ledger
                .append(&conn, "Orders", "x", RecordOutcome::Applied)
                .is_err()
        );
    }

    #[test]
    fn parse_datetime_accepts_sqlite_format() {
        let dt = parse_datetime("2024-03-01 10:20:30").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:20:30+00:00");
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn corrupt_ledger_rows_are_reported() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::default();
        ledger.ensure(&conn).unwrap();
        conn.execute(
            "INSERT INTO _migrations (id, checksum, outcome, applied_at)
             VALUES ('Orders', 'x', 'skipped', '2024-03-01T10:20:30+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO _migrations (id, checksum, outcome, applied_at)
             VALUES ('Clients', 'y', 'applied', 'not a date')",
            [],
        )
        .unwrap();

        assert!(matches!(
            ledger.find(&conn, "Orders"),
            Err(rusqlite::Error::FromSqlConversionFailure(2, ..))
        ));
        assert!(matches!(
            ledger.find(&conn, "Clients"),
            Err(rusqlite::Error::FromSqlConversionFailure(3, ..))
        ));
        assert!(ledger.records(&conn).is_err());
    }

    #[test]
    fn default_ledger_uses_the_shared_table_name() {
        assert_eq!(Ledger::default().table(), DEFAULT_LEDGER_TABLE);
    }
}
