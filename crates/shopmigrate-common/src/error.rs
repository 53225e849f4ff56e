use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("duplicate unit: {0}")]
    DuplicateUnit(String),

    #[error("cyclic dependency between units: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("unit {unit} depends on unknown unit {dependency}")]
    UnknownDependency { unit: String, dependency: String },

    #[error("unit {unit} scheduled before its dependency {dependency}")]
    OutOfOrder { unit: String, dependency: String },

    #[error("unit {unit}: {step} failed: {source}")]
    StatementExecution {
        unit: String,
        step: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("unit {unit}: seed row {key} in {table} conflicts with existing data")]
    SeedDataConflict {
        unit: String,
        table: String,
        key: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Identifier of the unit that caused this error, if it is tied to one.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Error::DuplicateUnit(unit) => Some(unit),
            Error::UnknownDependency { unit, .. }
            | Error::OutOfOrder { unit, .. }
            | Error::StatementExecution { unit, .. }
            | Error::SeedDataConflict { unit, .. } => Some(unit),
            _ => None,
        }
    }
}
