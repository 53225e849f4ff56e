use anyhow::Result;
use serde_json::json;
use shopmigrate_db::{MigrationUnit, RunReport, UnitStatus};

const WIDTH: usize = 78;
const LEFT_W: usize = 28;

/// Boxed two-column table, one row per entry.
fn render_table(title: &str, rows: &[(String, String)]) -> Vec<String> {
    let left_w = LEFT_W;
    let right_w = WIDTH - left_w - 6; // "│ " + "│  " + "│"
    let title_dashes = WIDTH.saturating_sub(7 + title.chars().count()); // "╭─── " + " " + "╮"
    let row = |l: &str, r: &str| {
        format!(
            "│ {:<left_w$}│  {:<right_w$}│",
            clip(l, left_w),
            clip(r, right_w)
        )
    };

    let mut lines = vec![format!("╭─── {title} {}╮", "─".repeat(title_dashes))];
    if rows.is_empty() {
        lines.push(row("(none)", ""));
    }
    for (l, r) in rows {
        lines.push(row(l, r));
    }
    lines.push(format!("╰{}╯", "─".repeat(WIDTH - 2)));
    lines
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub fn print_plan(plan: &[&MigrationUnit], as_json: bool) -> Result<()> {
    if as_json {
        let steps: Vec<_> = plan
            .iter()
            .enumerate()
            .map(|(i, unit)| {
                json!({
                    "step": i + 1,
                    "name": unit.name,
                    "depends_on": unit.depends_on,
                    "statements": unit.statements.len(),
                    "seed_tables": unit.seed.iter().map(|s| s.table.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    let rows: Vec<_> = plan
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let deps = if unit.depends_on.is_empty() {
                "-".to_string()
            } else {
                unit.depends_on.join(", ")
            };
            (format!("{:>2}. {}", i + 1, unit.name), format!("after {deps}"))
        })
        .collect();
    for line in render_table("Migration plan", &rows) {
        println!("{line}");
    }
    Ok(())
}

pub fn print_status(statuses: &[UnitStatus], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(statuses)?);
        return Ok(());
    }

    let rows: Vec<_> = statuses.iter().map(|s| (s.name.clone(), status_text(s))).collect();
    for line in render_table("Migration status", &rows) {
        println!("{line}");
    }
    let pending = statuses.iter().filter(|s| s.record.is_none()).count();
    println!("{pending} of {} unit(s) pending", statuses.len());
    Ok(())
}

fn status_text(status: &UnitStatus) -> String {
    match &status.record {
        None => "pending".to_string(),
        Some(record) => {
            let mut text = format!(
                "{} {}",
                record.outcome,
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
            if status.drifted {
                text.push_str(" (changed)");
            }
            text
        }
    }
}

pub fn print_summary(report: &RunReport) {
    let skipped = report.units.len() - report.applied_count();
    println!(
        "{} unit(s) applied, {skipped} already applied, {} statement(s) executed",
        report.applied_count(),
        report.statements_executed()
    );
    let drifted: Vec<_> = report
        .units
        .iter()
        .filter(|u| u.drifted)
        .map(|u| u.name.as_str())
        .collect();
    if !drifted.is_empty() {
        println!("changed since applied: {}", drifted.join(", "));
    }
}
