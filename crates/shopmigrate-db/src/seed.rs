use std::fmt;

use ring::digest::Context;
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use serde::{Deserialize, Serialize};
use shopmigrate_common::{Error, Result};
use tracing::debug;

use crate::quote_ident;

/// Initial rows that belong to a unit. Rows are matched on `key_columns`, so
/// re-running never duplicates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedData {
    pub table: String,
    pub key_columns: Vec<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<SeedValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SeedData {
    /// Seed for `table` with the given columns, keyed on the first one.
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        Self {
            table: table.into(),
            key_columns: columns.first().cloned().into_iter().collect(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn keyed_by<I, S>(mut self, key_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = key_columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn row(mut self, values: impl IntoIterator<Item = SeedValue>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.columns.is_empty() {
            return Err(format!("seed for {} has no columns", self.table));
        }
        if self.key_columns.is_empty() {
            return Err(format!("seed for {} has no key columns", self.table));
        }
        let key_positions = self.key_positions()?;
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(format!(
                    "seed row {} for {} has {} values, expected {}",
                    i + 1,
                    self.table,
                    row.len(),
                    self.columns.len()
                ));
            }
            if key_positions.iter().any(|&p| row[p] == SeedValue::Null) {
                return Err(format!(
                    "seed row {} for {} has a NULL key",
                    i + 1,
                    self.table
                ));
            }
        }
        Ok(())
    }

    fn key_positions(&self) -> std::result::Result<Vec<usize>, String> {
        self.key_columns
            .iter()
            .map(|key| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(key))
                    .ok_or_else(|| {
                        format!("seed key column {key} is not a column of {}", self.table)
                    })
            })
            .collect()
    }

    /// Insert missing rows. Rows already present with equal values are left
    /// alone; rows present with different values are a conflict.
    /// Returns the number of rows inserted.
    pub(crate) fn apply(&self, conn: &Connection, unit: &str) -> Result<usize> {
        let key_positions = self.key_positions().map_err(Error::Config)?;
        let table = quote_ident(&self.table);
        let cols = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let filter = self
            .key_columns
            .iter()
            .enumerate()
            .map(|(i, k)| format!("{} = ?{}", quote_ident(k), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let select = format!("SELECT {cols} FROM {table} WHERE {filter}");
        let insert = format!("INSERT INTO {table} ({cols}) VALUES ({placeholders})");
        let engine_err = |source| Error::StatementExecution {
            unit: unit.to_string(),
            step: format!("seed {}", self.table),
            source,
        };

        let mut inserted = 0;
        for row in &self.rows {
            let key: Vec<&SeedValue> = key_positions.iter().map(|&p| &row[p]).collect();
            let existing: Option<Vec<Value>> = conn
                .query_row(&select, params_from_iter(key.iter()), |r| {
                    (0..self.columns.len()).map(|i| r.get(i)).collect()
                })
                .optional()
                .map_err(engine_err)?;

            match existing {
                None => {
                    conn.execute(&insert, params_from_iter(row.iter()))
                        .map_err(engine_err)?;
                    inserted += 1;
                }
                Some(stored) if row.iter().zip(&stored).all(|(s, v)| s.matches(v)) => {
                    debug!(table = %self.table, key = %self.describe_key(row, &key_positions), "seed row already present");
                }
                Some(_) => {
                    return Err(Error::SeedDataConflict {
                        unit: unit.to_string(),
                        table: self.table.clone(),
                        key: self.describe_key(row, &key_positions),
                    });
                }
            }
        }
        Ok(inserted)
    }

    fn describe_key(&self, row: &[SeedValue], key_positions: &[usize]) -> String {
        key_positions
            .iter()
            .map(|&p| format!("{}={}", self.columns[p], row[p]))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl SeedValue {
    /// Compare against what SQLite returned. Column affinity may have turned
    /// `1.00` into integer `1` or a number into text, so numbers compare by value.
    fn matches(&self, stored: &Value) -> bool {
        const EPSILON: f64 = 1e-9;
        match (self, stored) {
            (SeedValue::Null, Value::Null) => true,
            (SeedValue::Bool(b), Value::Integer(i)) => *i == i64::from(*b),
            (SeedValue::Integer(a), Value::Integer(b)) => a == b,
            (SeedValue::Integer(a), Value::Real(b)) => (*a as f64 - b).abs() < EPSILON,
            (SeedValue::Real(a), Value::Real(b)) => (a - b).abs() < EPSILON,
            (SeedValue::Real(a), Value::Integer(b)) => (a - *b as f64).abs() < EPSILON,
            (SeedValue::Text(a), Value::Text(b)) => a == b,
            (SeedValue::Text(a), Value::Integer(b)) => text_equals_number(a, *b as f64),
            (SeedValue::Text(a), Value::Real(b)) => text_equals_number(a, *b),
            (SeedValue::Integer(a), Value::Text(b)) => text_equals_number(b, *a as f64),
            (SeedValue::Real(a), Value::Text(b)) => text_equals_number(b, *a),
            _ => false,
        }
    }

    /// Feed a type tag plus the exact value into a checksum.
    pub(crate) fn digest(&self, ctx: &mut Context) {
        match self {
            SeedValue::Null => ctx.update(b"n"),
            SeedValue::Bool(b) => ctx.update(&[b'b', u8::from(*b)]),
            SeedValue::Integer(i) => {
                ctx.update(b"i");
                ctx.update(&i.to_le_bytes());
            }
            SeedValue::Real(r) => {
                ctx.update(b"r");
                ctx.update(&r.to_bits().to_le_bytes());
            }
            SeedValue::Text(s) => {
                ctx.update(b"t");
                ctx.update(&(s.len() as u64).to_le_bytes());
                ctx.update(s.as_bytes());
            }
        }
    }
}

fn text_equals_number(text: &str, number: f64) -> bool {
    text.trim()
        .parse::<f64>()
        .is_ok_and(|x| (x - number).abs() < 1e-9)
}

impl ToSql for SeedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SeedValue::Null => ToSqlOutput::Owned(Value::Null),
            SeedValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SeedValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SeedValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SeedValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl fmt::Display for SeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedValue::Null => f.write_str("NULL"),
            SeedValue::Bool(b) => write!(f, "{b}"),
            SeedValue::Integer(i) => write!(f, "{i}"),
            SeedValue::Real(r) => write!(f, "{r}"),
            SeedValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SeedValue {
    fn from(s: &str) -> Self {
        SeedValue::Text(s.to_string())
    }
}

impl From<i64> for SeedValue {
    fn from(i: i64) -> Self {
        SeedValue::Integer(i)
    }
}

impl From<f64> for SeedValue {
    fn from(r: f64) -> Self {
        SeedValue::Real(r)
    }
}

impl From<bool> for SeedValue {
    fn from(b: bool) -> Self {
        SeedValue::Bool(b)
    }
}
