//! Plain text output of the commands.

use std::io::{self, Write};

use crate::{
    cli::command_handlers::{ManifestEdit, TidyOutcome},
    model::lock::LockFile,
    reconcile::{ChangeReport, UpgradeAction, UpgradePlan},
    report::{short_commit, Explanation, Graph, ListRow, OutdatedRow, StatusRow},
};

const RULE: &str = "──────────────────────────────────────────────────";
const SHORT_RULE: &str = "───────────────";

pub fn edits(out: &mut impl Write, edits: &[ManifestEdit]) -> io::Result<()> {
    for edit in edits {
        match &edit.previous {
            None => writeln!(out, "+ {} @ {}", edit.module, edit.constraint)?,
            Some(previous) => writeln!(
                out,
                "~ {}: {} → {}",
                edit.module, previous, edit.constraint
            )?,
        }
    }
    Ok(())
}

pub fn changes(out: &mut impl Write, changes: &ChangeReport, lock_file: &LockFile) -> io::Result<()> {
    for module in &changes.added {
        let version = lock_file
            .get(module)
            .map(|locked| locked.version.as_str())
            .unwrap_or_default();
        writeln!(out, "+ {module} @ {version}")?;
    }
    for change in &changes.updated {
        writeln!(out, "~ {}: {} → {}", change.module, change.from, change.to)?;
    }
    for module in &changes.removed {
        writeln!(out, "- {module}")?;
    }
    Ok(())
}

pub fn tidy(out: &mut impl Write, outcome: &TidyOutcome) -> io::Result<()> {
    changes(out, &outcome.changes, &outcome.lock_file)?;
    match &outcome.written {
        Some(path) => writeln!(out, "Lockfile written to {}", path.display()),
        None => Ok(()),
    }
}

pub fn upgrade_plan(out: &mut impl Write, plan: &UpgradePlan) -> io::Result<()> {
    for planned in &plan.upgrades {
        match &planned.action {
            UpgradeAction::Upgrade { from, to } => {
                writeln!(out, "Upgrading {}: {} → {}", planned.module, from, to)?
            }
            UpgradeAction::Refresh { version } => {
                writeln!(out, "Refreshing {}: {}", planned.module, version)?
            }
            UpgradeAction::Add { version } => {
                writeln!(out, "Adding {}: {}", planned.module, version)?
            }
        }
    }
    if !plan.needs_resolution() {
        writeln!(out, "All dependencies are up to date.")?;
    }
    Ok(())
}

pub fn list(out: &mut impl Write, rows: &[ListRow], has_lock_file: bool) -> io::Result<()> {
    if has_lock_file {
        writeln!(out, "{:<50} {:<15} {:<15} STATUS", "MODULE", "CONSTRAINT", "LOCKED")?;
        writeln!(out, "{RULE:<50} {SHORT_RULE:<15} {SHORT_RULE:<15} ─────")?;
    } else {
        writeln!(out, "{:<50} CONSTRAINT", "MODULE")?;
        writeln!(out, "{RULE:<50} {SHORT_RULE}")?;
    }
    for row in rows {
        if has_lock_file {
            let (locked, status) = match &row.locked {
                Some(version) => (version.as_str(), "locked"),
                None => ("", "not locked"),
            };
            writeln!(
                out,
                "{:<50} {:<15} {:<15} {}",
                row.module, row.constraint, locked, status
            )?;
        } else {
            writeln!(out, "{:<50} {}", row.module, row.constraint)?;
        }
    }
    if rows.is_empty() {
        writeln!(out, "No dependencies.")?;
    }
    Ok(())
}

pub fn outdated(out: &mut impl Write, rows: &[OutdatedRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:<50} {:<15} {:<15} {:<15} NOTES",
        "MODULE", "CURRENT", "LATEST", "CONSTRAINT"
    )?;
    writeln!(
        out,
        "{RULE:<50} {SHORT_RULE:<15} {SHORT_RULE:<15} {SHORT_RULE:<15} ─────"
    )?;
    for row in rows {
        let (latest, notes) = match (&row.latest, row.freshness) {
            (Ok(latest), Some(freshness)) => (latest.as_str(), freshness.to_string()),
            (Ok(latest), None) => (latest.as_str(), String::new()),
            (Err(error), _) => ("ERROR", error.clone()),
        };
        writeln!(
            out,
            "{:<50} {:<15} {:<15} {:<15} {}",
            row.module, row.current, latest, row.constraint, notes
        )?;
    }
    if !rows.iter().any(OutdatedRow::has_update) {
        writeln!(out, "\nAll dependencies are up to date.")?;
    }
    Ok(())
}

pub fn graph(out: &mut impl Write, graph: &Graph) -> io::Result<()> {
    writeln!(out, "{}", graph.module)?;
    let last = graph.dependencies.len().saturating_sub(1);
    for (i, (module, version)) in graph.dependencies.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        writeln!(out, "{branch} {module} {version}")?;
    }
    Ok(())
}

pub fn explanation(out: &mut impl Write, explanation: &Explanation) -> io::Result<()> {
    writeln!(out, "Dependency: {}", explanation.module)?;
    writeln!(out, "{RULE}\n")?;
    writeln!(out, "Constraint: {}", explanation.constraint)?;

    let Some(locked) = &explanation.locked else {
        writeln!(out, "\nNot locked. Run `cpkg tidy` to lock it.")?;
        return Ok(());
    };
    writeln!(out, "\nLocked Information:")?;
    writeln!(out, "  Version: {}", locked.version)?;
    writeln!(out, "  Tag:     {}", locked.tag)?;
    writeln!(out, "  Commit:  {}", locked.commit)?;
    writeln!(out, "  Sum:     {}", locked.sum)?;
    writeln!(out, "  VCS:     {}", locked.vcs)?;
    writeln!(out, "  Repo:    {}", locked.repo_url)?;
    writeln!(out, "  Path:    {}", locked.path)?;
    if !locked.subdir.is_empty() {
        writeln!(out, "  Subdir:  {}", locked.subdir)?;
    }
    writeln!(out, "  Source:  {}", locked.source_path)?;

    writeln!(out, "\nLocal State:")?;
    match &explanation.checkout {
        Some(Ok(Some(state))) => {
            writeln!(out, "  Checkout: exists")?;
            writeln!(out, "  Current commit: {}", short_commit(&state.commit))?;
            if explanation.in_sync() == Some(true) {
                writeln!(out, "  Status: in sync")?;
            } else {
                writeln!(out, "  Status: out of sync")?;
            }
            if state.dirty {
                writeln!(out, "  Working tree: dirty")?;
            }
        }
        Some(Ok(None)) | None => writeln!(out, "  Checkout: missing")?,
        Some(Err(error)) => writeln!(out, "  Checkout: unreadable ({error})")?,
    }
    Ok(())
}

pub fn status(out: &mut impl Write, rows: &[StatusRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:<50} {:<15} {:<15} {:<15} STATUS",
        "MODULE", "CONSTRAINT", "LOCKED", "LOCAL"
    )?;
    writeln!(
        out,
        "{RULE:<50} {SHORT_RULE:<15} {SHORT_RULE:<15} {SHORT_RULE:<15} {SHORT_RULE}"
    )?;
    for row in rows {
        let locked = row.locked.as_deref().unwrap_or("NO_LOCK");
        write!(
            out,
            "{:<50} {:<15} {:<15} {:<15} {}",
            row.module, row.constraint, locked, row.local, row.status
        )?;
        match &row.error {
            Some(error) => writeln!(out, " ({error})")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    use crate::{
        model::lock::{LockedDependency, VcsKind},
        reconcile::{PlannedUpgrade, VersionChange},
        report::Freshness,
    };

    use pretty_assertions::assert_eq;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn change_report() {
        let lock_file = LockFile::new(
            "github.com/acme/app",
            "deps",
            BTreeMap::from([(
                "github.com/acme/new".to_owned(),
                LockedDependency {
                    version: "v1.0.0".to_owned(),
                    tag: "v1.0.0".to_owned(),
                    commit: String::new(),
                    sum: String::new(),
                    vcs: VcsKind::Git,
                    repo_url: String::new(),
                    path: String::new(),
                    subdir: String::new(),
                    source_path: String::new(),
                },
            )]),
        );
        let report = ChangeReport {
            added: vec!["github.com/acme/new".to_owned()],
            updated: vec![VersionChange {
                module: "github.com/acme/up".to_owned(),
                from: "v1.0.0".to_owned(),
                to: "v1.1.0".to_owned(),
            }],
            removed: vec!["github.com/acme/gone".to_owned()],
        };

        assert_eq!(
            render(|out| changes(out, &report, &lock_file)),
            "+ github.com/acme/new @ v1.0.0\n\
             ~ github.com/acme/up: v1.0.0 → v1.1.0\n\
             - github.com/acme/gone\n"
        );
    }

    #[test]
    fn manifest_edits() {
        let rendered = render(|out| {
            edits(
                out,
                &[
                    ManifestEdit {
                        module: "github.com/acme/list".to_owned(),
                        previous: None,
                        constraint: "^1.0.0".to_owned(),
                    },
                    ManifestEdit {
                        module: "github.com/acme/span".to_owned(),
                        previous: Some("~0.1.0".to_owned()),
                        constraint: "~0.2.0".to_owned(),
                    },
                ],
            )
        });
        assert_eq!(
            rendered,
            "+ github.com/acme/list @ ^1.0.0\n~ github.com/acme/span: ~0.1.0 → ~0.2.0\n"
        );
    }

    #[test]
    fn upgrade_messages() {
        let plan = UpgradePlan {
            upgrades: vec![PlannedUpgrade {
                module: "github.com/acme/list".to_owned(),
                action: UpgradeAction::Upgrade {
                    from: "v1.0.0".to_owned(),
                    to: "v1.2.0".to_owned(),
                },
            }],
            ..Default::default()
        };
        assert_eq!(
            render(|out| upgrade_plan(out, &plan)),
            "Upgrading github.com/acme/list: v1.0.0 → v1.2.0\n"
        );
        assert_eq!(
            render(|out| upgrade_plan(out, &UpgradePlan::default())),
            "All dependencies are up to date.\n"
        );
    }

    #[test]
    fn outdated_table_annotates_errors() {
        let rows = [
            OutdatedRow {
                module: "github.com/acme/list".to_owned(),
                constraint: "^1.0.0".to_owned(),
                current: "v1.0.0".to_owned(),
                latest: Ok("v1.0.0".to_owned()),
                freshness: Some(Freshness::UpToDate),
            },
            OutdatedRow {
                module: "github.com/acme/down".to_owned(),
                constraint: "^1.0.0".to_owned(),
                current: "v1.0.0".to_owned(),
                latest: Err("could not connect".to_owned()),
                freshness: None,
            },
        ];
        let rendered = render(|out| outdated(out, &rows));
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[2].ends_with("up to date"));
        assert!(lines[3].contains("ERROR"));
        assert!(lines[3].ends_with("could not connect"));
        assert!(rendered.ends_with("All dependencies are up to date.\n"));
    }

    #[test]
    fn graph_tree() {
        let tree = Graph {
            module: "github.com/acme/app".to_owned(),
            dependencies: vec![
                ("github.com/acme/libs/span".to_owned(), "v0.2.4".to_owned()),
                ("github.com/acme/list".to_owned(), "v1.2.0".to_owned()),
            ],
        };
        assert_eq!(
            render(|out| graph(out, &tree)),
            "github.com/acme/app\n\
             ├─ github.com/acme/libs/span v0.2.4\n\
             └─ github.com/acme/list v1.2.0\n"
        );
        let empty = Graph {
            module: "github.com/acme/app".to_owned(),
            dependencies: Vec::new(),
        };
        assert_eq!(render(|out| graph(out, &empty)), "github.com/acme/app\n");
    }

    #[test]
    fn empty_list() {
        let rendered = render(|out| list(out, &[], false));
        assert!(rendered.starts_with("MODULE"));
        assert!(rendered.ends_with("No dependencies.\n"));
    }
}
