//! CLI walkthrough of the history core.
//!
//! # Responsibility
//! - Drive commit, undo/redo and an asynchronous change end to end.
//! - Print history views and process statuses as JSON.
//!
//! Usage: `rewind_cli [config.json]`

use log::info;
use rewind_core::db::open_db_in_memory;
use rewind_core::{
    init_logging_from_config, ChangeError, ChangeRecord, ChangeResult, ChangeTarget, CoreConfig,
    EntryId, HistoryService, ProcessCoordinator, Project, SqliteHistoryJournal, TaskContext,
};
use std::error::Error;
use std::time::Duration;

/// Column headers of a toy sheet.
#[derive(Debug, Clone)]
struct Sheet {
    columns: Vec<String>,
}

impl ChangeTarget for Sheet {}

struct RenameColumn {
    from: String,
    to: String,
}

impl RenameColumn {
    fn boxed(from: &str, to: &str) -> Box<dyn ChangeRecord<Sheet>> {
        Box::new(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn swap(sheet: &mut Sheet, from: &str, to: &str) -> ChangeResult<()> {
        let column = sheet
            .columns
            .iter_mut()
            .find(|column| column.as_str() == from)
            .ok_or_else(|| ChangeError::new("column_missing", format!("no column `{from}`")))?;
        *column = to.to_string();
        Ok(())
    }
}

impl ChangeRecord<Sheet> for RenameColumn {
    fn apply(&self, target: &mut Sheet) -> ChangeResult<()> {
        Self::swap(target, &self.from, &self.to)
    }

    fn revert(&self, target: &mut Sheet) -> ChangeResult<()> {
        Self::swap(target, &self.to, &self.from)
    }

    fn kind(&self) -> &str {
        "rename_column"
    }
}

fn load_config() -> Result<CoreConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?),
        None => Ok(CoreConfig::default()),
    }
}

fn print_columns(project: &Project<Sheet>) {
    project.read_data(|sheet| println!("columns={}", sheet.columns.join(",")));
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    init_logging_from_config(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        rewind_core::core_version()
    );

    let conn = open_db_in_memory()?;
    let service = HistoryService::new(SqliteHistoryJournal::new(&conn));
    let coordinator = ProcessCoordinator::new(config.coordinator.clone());
    let project = Project::shared(
        "contacts",
        Sheet {
            columns: vec!["name".to_string(), "town".to_string(), "phone".to_string()],
        },
    );

    service.commit(&project, "Rename name to full_name", RenameColumn::boxed("name", "full_name"))?;
    service.commit(&project, "Rename town to city", RenameColumn::boxed("town", "city"))?;
    service.commit(&project, "Rename phone to mobile", RenameColumn::boxed("phone", "mobile"))?;
    print_columns(&project);

    let status = service.undo_redo(&coordinator, &project, EntryId(1))?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    print_columns(&project);

    let id = service.submit_change(
        &coordinator,
        &project,
        "Rename town to locality",
        |ctx: &TaskContext| {
            ctx.report_progress(50);
            Ok(RenameColumn::boxed("town", "locality"))
        },
    )?;
    println!("queued process_id={id}");

    let report = coordinator.wait_idle(Duration::from_secs(5));
    println!("{}", serde_json::to_string_pretty(&report.retired)?);
    service.reconcile(&project)?;

    println!("{}", serde_json::to_string_pretty(&project.history_view())?);
    println!(
        "{}",
        serde_json::to_string_pretty(&service.journal_snapshot(project.id())?)?
    );
    print_columns(&project);
    Ok(())
}
