//! Migration units: named, atomic schema changes with an existence probe.
//!
//! A unit carries its DDL statements, the predicate that tells whether the
//! objects it creates are already in the live schema, optional seed rows and
//! the identifiers of the units it depends on.

use std::collections::HashSet;
use std::fmt::Write as _;

use ring::digest::{Context, SHA256};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use shopmigrate_common::{Error, Result};

use crate::seed::SeedData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationUnit {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub statements: Vec<String>,
    #[serde(default)]
    pub exists: ExistencePredicate,
    #[serde(default)]
    pub seed: Vec<SeedData>,
}

impl MigrationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            statements: Vec::new(),
            exists: ExistencePredicate::Never,
            seed: Vec::new(),
        }
    }

    pub fn depends_on(mut self, unit: impl Into<String>) -> Self {
        self.depends_on.push(unit.into());
        self
    }

    pub fn statement(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(sql.into());
        self
    }

    pub fn exists(mut self, predicate: ExistencePredicate) -> Self {
        self.exists = predicate;
        self
    }

    pub fn seed(mut self, seed: SeedData) -> Self {
        self.seed.push(seed);
        self
    }

    /// Hex SHA-256 over everything that defines the unit except its name.
    /// Stored in the ledger so a unit edited after it was applied can be
    /// reported as drift.
    pub fn checksum(&self) -> String {
        let mut ctx = Context::new(&SHA256);
        for sql in &self.statements {
            ctx.update(sql.trim().as_bytes());
            ctx.update(&[0]);
        }
        for dep in &self.depends_on {
            ctx.update(b"dep:");
            ctx.update(dep.as_bytes());
            ctx.update(&[0]);
        }
        self.exists.digest(&mut ctx);
        for seed in &self.seed {
            ctx.update(b"seed:");
            ctx.update(seed.table.as_bytes());
            ctx.update(&[1]);
            ctx.update(seed.key_columns.join(",").as_bytes());
            ctx.update(&[1]);
            ctx.update(seed.columns.join(",").as_bytes());
            for row in &seed.rows {
                for value in row {
                    value.digest(&mut ctx);
                }
                ctx.update(&[2]);
            }
        }

        let mut hex = String::with_capacity(64);
        for byte in ctx.finish().as_ref() {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }

    /// Structural checks done at registration time, before any SQL runs.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("unit name must not be empty".into()));
        }
        if self.statements.iter().all(|s| s.trim().is_empty()) && self.seed.is_empty() {
            return Err(Error::Config(format!(
                "unit {} has no statements and no seed data",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for dep in &self.depends_on {
            if !seen.insert(dep.as_str()) {
                return Err(Error::Config(format!(
                    "unit {} lists dependency {dep} twice",
                    self.name
                )));
            }
        }

        for seed in &self.seed {
            seed.validate()
                .map_err(|e| Error::Config(format!("unit {}: {e}", self.name)))?;
        }
        Ok(())
    }
}

/// How to tell, from the live schema alone, that a unit's objects already exist.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExistencePredicate {
    TableExists { table: String },
    ColumnExists { table: String, column: String },
    IndexExists { index: String },
    ViewExists { view: String },
    TriggerExists { trigger: String },
    AllOf { all: Vec<ExistencePredicate> },
    /// No schema probe; only the ledger decides.
    #[default]
    Never,
}

impl ExistencePredicate {
    pub fn table(table: impl Into<String>) -> Self {
        Self::TableExists {
            table: table.into(),
        }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnExists {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn index(index: impl Into<String>) -> Self {
        Self::IndexExists {
            index: index.into(),
        }
    }

    pub fn view(view: impl Into<String>) -> Self {
        Self::ViewExists { view: view.into() }
    }

    pub fn all(predicates: impl IntoIterator<Item = ExistencePredicate>) -> Self {
        Self::AllOf {
            all: predicates.into_iter().collect(),
        }
    }

    /// Evaluate against `sqlite_master` / `pragma_table_info`. Names compare
    /// case-insensitively, like SQLite itself resolves them.
    pub fn holds(&self, conn: &Connection) -> rusqlite::Result<bool> {
        match self {
            Self::TableExists { table } => object_exists(conn, "table", table),
            Self::IndexExists { index } => object_exists(conn, "index", index),
            Self::ViewExists { view } => object_exists(conn, "view", view),
            Self::TriggerExists { trigger } => object_exists(conn, "trigger", trigger),
            Self::ColumnExists { table, column } => conn.query_row(
                "SELECT count(*) > 0 FROM pragma_table_info(?1) WHERE lower(name) = lower(?2)",
                params![table, column],
                |row| row.get(0),
            ),
            Self::AllOf { all } => {
                if all.is_empty() {
                    return Ok(false);
                }
                for predicate in all {
                    if !predicate.holds(conn)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Never => Ok(false),
        }
    }

    pub(crate) fn digest(&self, ctx: &mut Context) {
        let (tag, names): (u8, Vec<&str>) = match self {
            Self::TableExists { table } => (b'T', vec![table]),
            Self::ColumnExists { table, column } => (b'C', vec![table, column]),
            Self::IndexExists { index } => (b'I', vec![index]),
            Self::ViewExists { view } => (b'V', vec![view]),
            Self::TriggerExists { trigger } => (b'R', vec![trigger]),
            Self::AllOf { all } => {
                ctx.update(&[b'A']);
                for predicate in all {
                    predicate.digest(ctx);
                }
                ctx.update(&[b')']);
                return;
            }
            Self::Never => (b'N', Vec::new()),
        };
        ctx.update(&[tag]);
        for name in names {
            ctx.update(name.as_bytes());
            ctx.update(&[0]);
        }
    }
}

fn object_exists(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT count(*) > 0 FROM sqlite_master WHERE type = ?1 AND lower(name) = lower(?2)",
        params![kind, name],
        |row| row.get(0),
    )
}
