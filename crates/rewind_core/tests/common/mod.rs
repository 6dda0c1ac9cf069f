#![allow(dead_code)]

use rewind_core::{ChangeError, ChangeRecord, ChangeResult, ChangeTarget};

/// Small column-oriented table used as a history target.
///
/// `calls` logs every apply/revert the engine routes through the target and
/// is ignored by equality.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub calls: Vec<(&'static str, String)>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl Eq for Table {}

impl Table {
    pub fn sample() -> Self {
        Self {
            columns: vec!["name".to_string(), "city".to_string()],
            rows: vec![
                vec!["ada".to_string(), "london".to_string()],
                vec!["grace".to_string(), "new york".to_string()],
                vec!["edsger".to_string(), "nuenen".to_string()],
            ],
            calls: Vec::new(),
        }
    }

    fn column_index(&self, name: &str) -> ChangeResult<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ChangeError::new("column_missing", format!("no column `{name}`")))
    }
}

impl ChangeTarget for Table {
    fn apply_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
        self.calls.push(("apply", record.kind().to_string()));
        record.apply(self)
    }

    fn revert_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
        self.calls.push(("revert", record.kind().to_string()));
        record.revert(self)
    }
}

pub struct RenameColumn {
    pub from: String,
    pub to: String,
}

impl ChangeRecord<Table> for RenameColumn {
    fn apply(&self, target: &mut Table) -> ChangeResult<()> {
        let index = target.column_index(&self.from)?;
        target.columns[index] = self.to.clone();
        Ok(())
    }

    fn revert(&self, target: &mut Table) -> ChangeResult<()> {
        let index = target.column_index(&self.to)?;
        target.columns[index] = self.from.clone();
        Ok(())
    }

    fn kind(&self) -> &str {
        "rename_column"
    }
}

pub struct DeleteRow {
    pub index: usize,
    pub removed: Vec<String>,
}

impl DeleteRow {
    /// Captures the row content so the change can be reverted.
    pub fn capture(table: &Table, index: usize) -> Self {
        Self {
            index,
            removed: table.rows[index].clone(),
        }
    }
}

impl ChangeRecord<Table> for DeleteRow {
    fn apply(&self, target: &mut Table) -> ChangeResult<()> {
        if self.index >= target.rows.len() {
            return Err(ChangeError::new("row_missing", "row out of range"));
        }
        target.rows.remove(self.index);
        Ok(())
    }

    fn revert(&self, target: &mut Table) -> ChangeResult<()> {
        if self.index > target.rows.len() {
            return Err(ChangeError::new("row_missing", "row out of range"));
        }
        target.rows.insert(self.index, self.removed.clone());
        Ok(())
    }

    fn kind(&self) -> &str {
        "delete_row"
    }
}

pub struct AddColumn {
    pub name: String,
    pub fill: String,
}

impl ChangeRecord<Table> for AddColumn {
    fn apply(&self, target: &mut Table) -> ChangeResult<()> {
        target.columns.push(self.name.clone());
        for row in &mut target.rows {
            row.push(self.fill.clone());
        }
        Ok(())
    }

    fn revert(&self, target: &mut Table) -> ChangeResult<()> {
        if target.columns.last() != Some(&self.name) {
            return Err(ChangeError::new("column_missing", "added column is not last"));
        }
        target.columns.pop();
        for row in &mut target.rows {
            row.pop();
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        "add_column"
    }
}

/// Change whose apply always fails.
pub struct Rejecting;

impl ChangeRecord<Table> for Rejecting {
    fn apply(&self, _target: &mut Table) -> ChangeResult<()> {
        Err(ChangeError::new("rejected", "always rejects"))
    }

    fn revert(&self, _target: &mut Table) -> ChangeResult<()> {
        Ok(())
    }
}

/// Change that applies once, then refuses every later apply or revert.
pub struct BreaksAfterApply {
    pub applied: std::sync::atomic::AtomicBool,
}

impl BreaksAfterApply {
    pub fn new() -> Self {
        Self {
            applied: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl ChangeRecord<Table> for BreaksAfterApply {
    fn apply(&self, _target: &mut Table) -> ChangeResult<()> {
        if self
            .applied
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(ChangeError::new("broken", "cannot reapply"));
        }
        Ok(())
    }

    fn revert(&self, _target: &mut Table) -> ChangeResult<()> {
        Err(ChangeError::new("broken", "cannot revert"))
    }
}

/// Change that applies once, reverts cleanly, then refuses to reapply.
pub struct FailsOnReapply {
    applied: std::sync::atomic::AtomicBool,
}

impl FailsOnReapply {
    pub fn new() -> Self {
        Self {
            applied: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl ChangeRecord<Table> for FailsOnReapply {
    fn apply(&self, _target: &mut Table) -> ChangeResult<()> {
        if self
            .applied
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(ChangeError::new("stale", "cannot reapply"));
        }
        Ok(())
    }

    fn revert(&self, _target: &mut Table) -> ChangeResult<()> {
        Ok(())
    }

    fn kind(&self) -> &str {
        "fails_on_reapply"
    }
}

pub fn rename(from: &str, to: &str) -> Box<dyn ChangeRecord<Table>> {
    Box::new(RenameColumn {
        from: from.to_string(),
        to: to.to_string(),
    })
}

pub fn add_column(name: &str, fill: &str) -> Box<dyn ChangeRecord<Table>> {
    Box::new(AddColumn {
        name: name.to_string(),
        fill: fill.to_string(),
    })
}
