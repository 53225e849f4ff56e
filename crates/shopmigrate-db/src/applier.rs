//! Dependency-ordered, idempotent application of migration units.
//!
//! Units are registered up front, ordered with a stable topological sort and
//! then applied one at a time. Each unit runs inside a single immediate
//! transaction: its DDL, its seed rows and its ledger record either all commit
//! or all roll back.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use shopmigrate_common::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::ledger::{Ledger, MigrationRecord, RecordOutcome};
use crate::migrations::MigrationUnit;

type ProgressFn = Box<dyn Fn(&UnitReport) + Send + Sync>;

pub struct MigrationApplier {
    units: Vec<MigrationUnit>,
    index: HashMap<String, usize>,
    ledger: Ledger,
    progress: Option<ProgressFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Statements executed and the unit was recorded.
    Applied,
    /// Objects were already present in the schema; recorded without DDL.
    Adopted,
    /// A ledger record already existed; nothing was done.
    AlreadyApplied,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub outcome: UnitOutcome,
    pub statements_executed: usize,
    pub rows_seeded: usize,
    /// The recorded checksum no longer matches the unit definition.
    pub drifted: bool,
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            UnitOutcome::Applied => write!(f, "unit {} applied successfully", self.name),
            UnitOutcome::AlreadyApplied => write!(f, "unit {} already applied", self.name),
            UnitOutcome::Adopted => write!(
                f,
                "unit {} already applied (existing schema recorded)",
                self.name
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
    /// The run stopped between units because cancellation was requested.
    pub cancelled: bool,
}

impl RunReport {
    /// Units whose statements ran during this run.
    pub fn applied_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.outcome == UnitOutcome::Applied)
            .count()
    }

    pub fn statements_executed(&self) -> usize {
        self.units.iter().map(|u| u.statements_executed).sum()
    }
}

/// Where a planned unit stands against the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct UnitStatus {
    pub name: String,
    pub depends_on: Vec<String>,
    pub record: Option<MigrationRecord>,
    pub drifted: bool,
}

impl MigrationApplier {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            index: HashMap::new(),
            ledger: Ledger::default(),
            progress: None,
        }
    }

    pub fn with_ledger_table(mut self, table: impl Into<String>) -> Self {
        self.ledger = Ledger::new(table);
        self
    }

    /// Called after every unit that completes during [`run`](Self::run).
    pub fn on_progress(mut self, f: impl Fn(&UnitReport) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Registered units in registration order.
    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn register(&mut self, unit: MigrationUnit) -> Result<()> {
        if self.index.contains_key(&unit.name) {
            return Err(Error::DuplicateUnit(unit.name));
        }
        unit.validate()?;

        debug!(unit = %unit.name, deps = ?unit.depends_on, "registered unit");
        self.index.insert(unit.name.clone(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    pub fn register_all(&mut self, units: impl IntoIterator<Item = MigrationUnit>) -> Result<()> {
        for unit in units {
            self.register(unit)?;
        }
        Ok(())
    }

    /// Topological order of every registered unit. Among units whose
    /// dependencies are satisfied, the one registered first goes first.
    pub fn plan(&self) -> Result<Vec<&MigrationUnit>> {
        let n = self.units.len();
        let mut pending = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, unit) in self.units.iter().enumerate() {
            for dep in &unit.depends_on {
                let &d = self
                    .index
                    .get(dep)
                    .ok_or_else(|| Error::UnknownDependency {
                        unit: unit.name.clone(),
                        dependency: dep.clone(),
                    })?;
                pending[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &d in &dependents[i] {
                pending[d] -= 1;
                if pending[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() < n {
            return Err(Error::CyclicDependency(self.find_cycle(&pending)));
        }
        Ok(order.into_iter().map(|i| &self.units[i]).collect())
    }

    /// Walk from the earliest-registered unit still blocked, following its first
    /// blocked dependency, until a unit repeats. Every blocked unit has at least
    /// one blocked dependency, so the walk always closes a loop.
    fn find_cycle(&self, pending: &[usize]) -> Vec<String> {
        let blocked: HashSet<usize> = (0..pending.len()).filter(|&i| pending[i] > 0).collect();
        let Some(&start) = blocked.iter().min() else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(pos) = path.iter().position(|&p| p == current) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| self.units[i].name.clone())
                    .collect();
                cycle.push(self.units[current].name.clone());
                return cycle;
            }
            path.push(current);
            let next = self.units[current]
                .depends_on
                .iter()
                .filter_map(|dep| self.index.get(dep).copied())
                .find(|d| blocked.contains(d));
            match next {
                Some(d) => current = d,
                None => return path.iter().map(|&i| self.units[i].name.clone()).collect(),
            }
        }
    }

    /// Apply a single unit, unless the ledger or the live schema says it is
    /// already there.
    pub fn apply(&self, conn: &mut Connection, unit: &MigrationUnit) -> Result<UnitReport> {
        let name = unit.name.as_str();
        let checksum = unit.checksum();

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(failed(name, "begin transaction"))?;
        self.ledger
            .ensure(&tx)
            .map_err(failed(name, "ledger setup"))?;

        if let Some(record) = self
            .ledger
            .find(&tx, name)
            .map_err(failed(name, "ledger lookup"))?
        {
            let drifted = record.checksum != checksum;
            if drifted {
                warn!(
                    unit = name,
                    recorded = %record.checksum,
                    current = %checksum,
                    "unit definition changed since it was applied; not re-applying"
                );
            }
            info!(unit = name, "unit already applied");
            return Ok(UnitReport {
                name: name.to_string(),
                outcome: UnitOutcome::AlreadyApplied,
                statements_executed: 0,
                rows_seeded: 0,
                drifted,
            });
        }

        let present = unit
            .exists
            .holds(&tx)
            .map_err(failed(name, "existence check"))?;

        let mut executed = 0;
        let outcome = if present {
            info!(unit = name, "schema objects already present, recording without DDL");
            RecordOutcome::Adopted
        } else {
            for (i, sql) in unit.statements.iter().enumerate() {
                if sql.trim().is_empty() {
                    continue;
                }
                debug!(unit = name, statement = i + 1, "executing statement");
                tx.execute_batch(sql)
                    .map_err(failed(name, format!("statement {}", i + 1)))?;
                executed += 1;
            }
            RecordOutcome::Applied
        };

        let mut seeded = 0;
        for seed in &unit.seed {
            seeded += seed.apply(&tx, name)?;
        }
        if seeded > 0 {
            info!(unit = name, rows = seeded, "seed rows inserted");
        }

        self.ledger
            .append(&tx, name, &checksum, outcome)
            .map_err(failed(name, "ledger write"))?;
        tx.commit().map_err(failed(name, "commit"))?;

        let report = UnitReport {
            name: name.to_string(),
            outcome: match outcome {
                RecordOutcome::Applied => UnitOutcome::Applied,
                RecordOutcome::Adopted => UnitOutcome::Adopted,
            },
            statements_executed: executed,
            rows_seeded: seeded,
            drifted: false,
        };
        info!(unit = name, statements = executed, "{report}");
        Ok(report)
    }

    /// Apply `units` in the given order, stopping at the first failure. Every
    /// dependency must either come earlier in `units` or already be recorded.
    /// `cancel` is checked between units, never inside one.
    pub fn run(
        &self,
        conn: &mut Connection,
        units: &[&MigrationUnit],
        cancel: &AtomicBool,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut done: HashSet<&str> = HashSet::new();

        for unit in units {
            if cancel.load(Ordering::SeqCst) {
                info!(
                    remaining = units.len() - report.units.len(),
                    "run cancelled between units"
                );
                report.cancelled = true;
                break;
            }

            for dep in &unit.depends_on {
                if done.contains(dep.as_str()) {
                    continue;
                }
                let recorded = self
                    .ledger
                    .find(conn, dep)
                    .map_err(failed(&unit.name, "ledger lookup"))?;
                if recorded.is_none() {
                    return Err(Error::OutOfOrder {
                        unit: unit.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            let unit_report = self.apply(conn, unit).inspect_err(|e| {
                error!(unit = %unit.name, "unit failed, halting run: {e}");
            })?;

            if let Some(progress) = &self.progress {
                progress(&unit_report);
            }
            done.insert(unit.name.as_str());
            report.units.push(unit_report);
        }

        info!(
            applied = report.applied_count(),
            total = report.units.len(),
            "migration run finished"
        );
        Ok(report)
    }

    /// Plan, then run everything.
    pub fn migrate(&self, conn: &mut Connection, cancel: &AtomicBool) -> Result<RunReport> {
        let plan = self.plan()?;
        self.run(conn, &plan, cancel)
    }

    pub fn status(&self, conn: &Connection) -> Result<Vec<UnitStatus>> {
        let plan = self.plan()?;
        let mut statuses = Vec::with_capacity(plan.len());
        for unit in plan {
            let record = self.ledger.find(conn, &unit.name).map_err(|e| {
                Error::Database(format!("failed to read ledger for {}: {e}", unit.name))
            })?;
            let drifted = record
                .as_ref()
                .is_some_and(|r| r.checksum != unit.checksum());
            statuses.push(UnitStatus {
                name: unit.name.clone(),
                depends_on: unit.depends_on.clone(),
                record,
                drifted,
            });
        }
        Ok(statuses)
    }
}

impl Default for MigrationApplier {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(unit: &str, step: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Error {
    let unit = unit.to_string();
    let step = step.into();
    move |source| Error::StatementExecution { unit, step, source }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::migrations::ExistencePredicate;
    use crate::seed::{SeedData, SeedValue};

    fn table_unit(name: &str, deps: &[&str]) -> MigrationUnit {
        let mut unit = MigrationUnit::new(name)
            .statement(format!("CREATE TABLE {name} (Id INTEGER PRIMARY KEY)"))
            .exists(ExistencePredicate::table(name));
        for dep in deps {
            unit = unit.depends_on(*dep);
        }
        unit
    }

    fn names(plan: &[&MigrationUnit]) -> Vec<String> {
        plan.iter().map(|u| u.name.clone()).collect()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        ExistencePredicate::table(name).holds(conn).unwrap()
    }

    fn never_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn duplicate_registration_fails_immediately() {
        let mut applier = MigrationApplier::new();
        applier.register(table_unit("Products", &[])).unwrap();
        let err = applier.register(table_unit("Products", &[])).unwrap_err();
        assert!(matches!(err, Error::DuplicateUnit(ref n) if n == "Products"));
        assert_eq!(applier.len(), 1);
    }

    #[test]
    fn plan_breaks_ties_by_registration_order() {
        let mut applier = MigrationApplier::new();
        applier
            .register_all([
                table_unit("Cart", &["Products", "ProductVariants"]),
                table_unit("Orders", &[]),
                table_unit("ProductVariants", &["Products"]),
                table_unit("Products", &[]),
                table_unit("Clients", &[]),
            ])
            .unwrap();

        let plan = applier.plan().unwrap();
        assert_eq!(
            names(&plan),
            vec!["Orders", "Products", "ProductVariants", "Cart", "Clients"]
        );
    }

    #[test]
    fn plan_respects_dependencies_for_every_registration_order() {
        let units = [
            table_unit("A", &[]),
            table_unit("B", &["A"]),
            table_unit("C", &["B"]),
            table_unit("D", &["A"]),
        ];

        let mut order: Vec<usize> = (0..units.len()).collect();
        for_each_permutation(&mut order, 0, &mut |perm| {
            let mut applier = MigrationApplier::new();
            for &i in perm {
                applier.register(units[i].clone()).unwrap();
            }
            let plan = names(&applier.plan().unwrap());
            let pos = |n: &str| plan.iter().position(|p| p == n).unwrap();
            assert!(pos("A") < pos("B"), "{plan:?}");
            assert!(pos("B") < pos("C"), "{plan:?}");
            assert!(pos("A") < pos("D"), "{plan:?}");

            let mut conn = Connection::open_in_memory().unwrap();
            let report = applier.migrate(&mut conn, &never_cancel()).unwrap();
            let applied: Vec<_> = report.units.iter().map(|u| u.name.clone()).collect();
            assert_eq!(applied, plan);
        });
    }

    fn for_each_permutation(items: &mut Vec<usize>, k: usize, f: &mut dyn FnMut(&[usize])) {
        if k == items.len() {
            f(items);
            return;
        }
        for i in k..items.len() {
            items.swap(k, i);
            for_each_permutation(items, k + 1, f);
            items.swap(k, i);
        }
    }

    #[test]
    fn cycle_is_reported_deterministically() {
        let mut applier = MigrationApplier::new();
        applier
            .register_all([
                table_unit("Orders", &[]),
                table_unit("A", &["B"]),
                table_unit("B", &["A"]),
            ])
            .unwrap();

        for _ in 0..3 {
            match applier.plan() {
                Err(Error::CyclicDependency(cycle)) => assert_eq!(cycle, vec!["A", "B", "A"]),
                Err(other) => panic!("expected cycle, got {other}"),
                Ok(plan) => panic!("expected cycle, got {:?}", names(&plan)),
            }
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut applier = MigrationApplier::new();
        applier.register(table_unit("Loop", &["Loop"])).unwrap();
        let err = applier.plan().unwrap_err();
        assert_eq!(err.to_string(), "cyclic dependency between units: Loop -> Loop");
    }

    #[test]
    fn unknown_dependency_fails_plan() {
        let mut applier = MigrationApplier::new();
        applier.register(table_unit("Cart", &["Products"])).unwrap();
        let err = applier.plan().unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownDependency { ref unit, ref dependency } if unit == "Cart" && dependency == "Products"
        ));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut applier = MigrationApplier::new();
        applier
            .register_all([
                table_unit("Products", &[]),
                table_unit("ProductVariants", &["Products"]),
            ])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let first = applier.migrate(&mut conn, &never_cancel()).unwrap();
        assert_eq!(first.applied_count(), 2);
        assert_eq!(
            first.units.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            vec![
                "unit Products applied successfully",
                "unit ProductVariants applied successfully"
            ]
        );

        let second = applier.migrate(&mut conn, &never_cancel()).unwrap();
        assert_eq!(second.applied_count(), 0);
        assert_eq!(second.statements_executed(), 0);
        assert!(
            second
                .units
                .iter()
                .all(|u| u.outcome == UnitOutcome::AlreadyApplied)
        );
        assert_eq!(applier.ledger().records(&conn).unwrap().len(), 2);
    }

    #[test]
    fn failing_statement_rolls_back_the_whole_unit() {
        let mut applier = MigrationApplier::new();
        applier
            .register(
                MigrationUnit::new("Payments")
                    .statement("CREATE TABLE Payments (Id INTEGER PRIMARY KEY)")
                    .statement("CREATE INDEX IX_Payments_Missing ON Payments(NoSuchColumn)")
                    .exists(ExistencePredicate::table("Payments")),
            )
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let err = applier.migrate(&mut conn, &never_cancel()).unwrap_err();
        match &err {
            Error::StatementExecution { unit, step, .. } => {
                assert_eq!(unit, "Payments");
                assert_eq!(step, "statement 2");
            }
            other => panic!("expected statement failure, got {other}"),
        }
        assert!(!table_exists(&conn, "Payments"));
        assert!(applier.ledger().find(&conn, "Payments").unwrap().is_none());
    }

    #[test]
    fn run_halts_at_first_failure() {
        let mut applier = MigrationApplier::new();
        applier
            .register_all([
                table_unit("Orders", &[]),
                MigrationUnit::new("Broken").statement("CREATE TABLE ("),
                table_unit("Clients", &[]),
            ])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let err = applier.migrate(&mut conn, &never_cancel()).unwrap_err();
        assert_eq!(err.unit(), Some("Broken"));
        assert!(table_exists(&conn, "Orders"));
        assert!(!table_exists(&conn, "Clients"));

        let recorded: Vec<_> = applier
            .ledger()
            .records(&conn)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(recorded, vec!["Orders"]);
    }

    #[test]
    fn existing_objects_are_adopted_without_ddl() {
        let mut applier = MigrationApplier::new();
        applier.register(table_unit("Clients", &[])).unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Clients (Id INTEGER PRIMARY KEY, Legacy TEXT)")
            .unwrap();

        let report = applier.migrate(&mut conn, &never_cancel()).unwrap();
        assert_eq!(report.units[0].outcome, UnitOutcome::Adopted);
        assert_eq!(report.statements_executed(), 0);
        assert_eq!(
            report.units[0].to_string(),
            "unit Clients already applied (existing schema recorded)"
        );

        let record = applier.ledger().find(&conn, "Clients").unwrap().unwrap();
        assert_eq!(record.outcome, RecordOutcome::Adopted);
        // the legacy column is still there; nothing was recreated
        assert!(
            ExistencePredicate::column("Clients", "Legacy")
                .holds(&conn)
                .unwrap()
        );
    }

    #[test]
    fn cancellation_stops_between_units() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let mut applier = MigrationApplier::new().on_progress(move |_| {
            flag.store(true, Ordering::SeqCst);
        });
        applier
            .register_all([table_unit("Orders", &[]), table_unit("Clients", &[])])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let report = applier.migrate(&mut conn, &cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.units.len(), 1);
        assert!(table_exists(&conn, "Orders"));
        assert!(!table_exists(&conn, "Clients"));

        // picking up again later finishes the job
        let resumed = applier.migrate(&mut conn, &never_cancel()).unwrap();
        assert_eq!(resumed.units[0].outcome, UnitOutcome::AlreadyApplied);
        assert_eq!(resumed.applied_count(), 1);
        assert!(table_exists(&conn, "Clients"));
    }

    #[test]
    fn run_rejects_units_ahead_of_their_dependencies() {
        let mut applier = MigrationApplier::new();
        applier
            .register_all([
                table_unit("Orders", &[]),
                table_unit("OrderItems", &["Orders"]),
            ])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let backwards = vec![&applier.units()[1], &applier.units()[0]];
        let err = applier
            .run(&mut conn, &backwards, &never_cancel())
            .unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { ref dependency, .. } if dependency == "Orders"));
        assert!(!table_exists(&conn, "OrderItems"));
    }

    #[test]
    fn progress_callback_sees_every_unit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut applier = MigrationApplier::new().on_progress(move |report| {
            sink.lock().unwrap().push(report.to_string());
        });
        applier
            .register_all([table_unit("Orders", &[]), table_unit("Clients", &[])])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        applier.migrate(&mut conn, &never_cancel()).unwrap();
        applier.migrate(&mut conn, &never_cancel()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "unit Orders applied successfully",
                "unit Clients applied successfully",
                "unit Orders already applied",
                "unit Clients already applied",
            ]
        );
    }

    #[test]
    fn edited_unit_is_reported_as_drift_not_reapplied() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut original = MigrationApplier::new();
        original.register(table_unit("Orders", &[])).unwrap();
        original.migrate(&mut conn, &never_cancel()).unwrap();

        let mut edited = MigrationApplier::new();
        edited
            .register(
                table_unit("Orders", &[]).statement("CREATE INDEX IX_Orders_Id ON Orders(Id)"),
            )
            .unwrap();
        let report = edited.migrate(&mut conn, &never_cancel()).unwrap();
        assert_eq!(report.units[0].outcome, UnitOutcome::AlreadyApplied);
        assert!(report.units[0].drifted);
        assert!(
            !ExistencePredicate::index("IX_Orders_Id")
                .holds(&conn)
                .unwrap()
        );

        let status = edited.status(&conn).unwrap();
        assert!(status[0].drifted);
    }

    #[test]
    fn seed_conflict_rolls_back_unit() {
        let mut applier = MigrationApplier::new();
        applier
            .register(
                MigrationUnit::new("Plans")
                    .statement("CREATE TABLE Plans (PlanName TEXT PRIMARY KEY, Months INTEGER)")
                    .statement("INSERT INTO Plans VALUES ('Monthly', 99)")
                    .seed(
                        SeedData::new("Plans", ["PlanName", "Months"])
                            .row(["Monthly".into(), SeedValue::Integer(1)]),
                    ),
            )
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let err = applier.migrate(&mut conn, &never_cancel()).unwrap_err();
        assert!(matches!(err, Error::SeedDataConflict { ref key, .. } if key == "PlanName=Monthly"));
        assert!(!table_exists(&conn, "Plans"));
        assert!(applier.ledger().find(&conn, "Plans").unwrap().is_none());
    }

    #[test]
    fn status_lists_pending_and_applied_in_plan_order() {
        let mut applier = MigrationApplier::new().with_ledger_table("schema_log");
        applier
            .register_all([
                table_unit("OrderItems", &["Orders"]),
                table_unit("Orders", &[]),
            ])
            .unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let orders = applier.units()[1].clone();
        applier.apply(&mut conn, &orders).unwrap();

        let status = applier.status(&conn).unwrap();
        assert_eq!(status[0].name, "Orders");
        assert!(status[0].record.is_some());
        assert_eq!(status[1].name, "OrderItems");
        assert!(status[1].record.is_none());
        assert!(table_exists(&conn, "schema_log"));
    }
}
