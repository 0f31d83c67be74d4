use crate::checks::CounterDrift;
use crate::store::{BatchReport, Subject};

fn subject_label(subject: &Subject) -> String {
    match subject {
        Subject::Department(d) => format!("department {d}"),
        Subject::ProjectId(p) => format!("project {p}"),
        Subject::Row(r) => format!("row {r}"),
    }
}

pub fn display_report(report: &BatchReport, dry_run: bool) {
    if dry_run {
        println!("Dry run, nothing was written.");
    }
    if !report.panels.is_empty() {
        println!("Panels:");
        for draft in &report.panels {
            println!("  - {} ({})", draft.panel_name, draft.members.join(", "));
        }
    }
    if !report.assignments.is_empty() {
        println!("Assignments:");
        for a in &report.assignments {
            println!("  - project {} -> panel {}", a.project_id, a.panel_id);
        }
    }
    let counts = [
        ("created", report.created),
        ("updated", report.updated),
        ("assigned", report.assigned),
    ];
    for (label, n) in counts {
        if let Some(n) = n {
            println!("{label}: {n}");
        }
    }
    println!("errors: {}", report.errors);
    for failure in &report.details {
        println!("  - {}: {}", subject_label(&failure.subject), failure.error);
    }
}

pub fn display_drifts(drifts: &[CounterDrift], fixed: bool) {
    if drifts.is_empty() {
        println!("All panel counters are consistent.");
        return;
    }
    println!("Panels with inconsistent project counters (stored/actual):");
    for d in drifts {
        let status = match (fixed, d.is_fixable()) {
            (true, true) => " (fixed)",
            (_, false) => " (over capacity)",
            (false, true) => "",
        };
        println!("  - {} ({}/{}){status}", d.panel_name, d.stored, d.actual);
    }
}
