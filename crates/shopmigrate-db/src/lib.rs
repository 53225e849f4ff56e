pub mod applier;
pub mod catalog;
pub mod connection;
pub mod ledger;
pub mod manifest;
pub mod migrations;
pub mod seed;

pub use applier::{MigrationApplier, RunReport, UnitOutcome, UnitReport, UnitStatus};
pub use connection::{ConnectionOptions, open_database, open_in_memory};
pub use ledger::{Ledger, MigrationRecord, RecordOutcome};
pub use manifest::{Manifest, ManifestFormat};
pub use migrations::{ExistencePredicate, MigrationUnit};
pub use seed::{SeedData, SeedValue};

/// Double-quote an SQLite identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
