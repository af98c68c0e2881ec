//src/archive.rs
//! Soft deletion of exercises.
//!
//! Archiving is one unit of work made of four steps: copy the row to the end
//! of the grid, delete the original, prefix the name with the inactive
//! marker, shade the new row. A legacy exercise moves together with the
//! empty-named rows holding its sets. There is no rollback. When a step fails
//! the error names it and `ArchiveStep::partial_state` describes what the
//! grid looks like, so it can be fixed by hand.
use std::fmt;
use tracing::{info, warn};

use crate::catalog::{self, is_inactive, ExerciseRecord};
use crate::error::{LedgerError, Step};
use crate::grid::{GridStore, Rgb, StoreError};
use crate::ledger;

/// Light grey fill used when no color is configured.
pub const DEFAULT_ARCHIVE_SHADE: Rgb = Rgb::new(0xd9, 0xd9, 0xd9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStep {
    Copy,
    /// Copying the set rows below a legacy header.
    CopyBlock,
    Delete,
    Rename,
    Shade,
}

impl ArchiveStep {
    /// The state a failure at this step leaves behind, or `None` when the
    /// grid is unchanged.
    pub const fn partial_state(self) -> Option<&'static str> {
        match self {
            ArchiveStep::Copy => None,
            ArchiveStep::CopyBlock => Some(
                "the header and some of its set rows are copied to the end of the grid; the original block is intact",
            ),
            ArchiveStep::Delete => Some(
                "the record exists twice: at the end of the grid and, wholly or in part, in place",
            ),
            ArchiveStep::Rename => {
                Some("the row moved to the end of the grid but still carries its active name")
            }
            ArchiveStep::Shade => Some("the row is archived and renamed but not shaded"),
        }
    }
}

impl fmt::Display for ArchiveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveStep::Copy => write!(f, "copy"),
            ArchiveStep::CopyBlock => write!(f, "copy block"),
            ArchiveStep::Delete => write!(f, "delete"),
            ArchiveStep::Rename => write!(f, "rename"),
            ArchiveStep::Shade => write!(f, "shade"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub record: ExerciseRecord,
    pub from_row: usize,
    /// True when the name already referred to an archived record and nothing
    /// was changed.
    pub already_archived: bool,
}

fn step_failed(step: ArchiveStep, exercise: &str) -> impl FnOnce(StoreError) -> LedgerError + '_ {
    move |source| {
        if let Some(state) = step.partial_state() {
            warn!(exercise, %step, state, "archiving stopped part-way");
        }
        LedgerError::StoreUnavailable {
            step: Step::Archive(step),
            source,
        }
    }
}

/// Archives the active exercise called `exercise_name`.
///
/// Only active records are candidates, so the bare name of an archived record
/// is `NotFound`. Passing an archived name with its marker ("-Squat") is a
/// no-op reported through `ArchiveOutcome::already_archived`.
/// # Errors
/// - `LedgerError::NotFound` if no matching record exists.
/// - `LedgerError::StoreUnavailable` with `Step::Archive(step)` naming the
///   failed step.
pub fn deactivate<G: GridStore>(
    grid: &mut G,
    exercise_name: &str,
    shade: Rgb,
) -> Result<ArchiveOutcome, LedgerError> {
    let row = match catalog::find_active_row(&*grid, exercise_name) {
        Ok(row) => row,
        Err(LedgerError::NotFound(_)) if is_inactive(exercise_name) => {
            return already_archived(&*grid, exercise_name);
        }
        Err(e) => return Err(e),
    };

    // Header plus the set rows of a legacy block.
    let block_len = 1 + ledger::legacy_capacity(&*grid, row)?;
    let mut width = grid.column_count().map_err(LedgerError::at(Step::Read))?.max(1);
    for offset in 1..block_len {
        let cells = grid
            .read_row(row + offset)
            .map_err(LedgerError::at(Step::Read))?;
        width = width.max(cells.len());
    }

    let cells = grid.read_row(row).map_err(LedgerError::at(Step::Read))?;
    let record = ExerciseRecord {
        name: cells.first().cloned().unwrap_or_default(),
        row,
        sessions: cells
            .iter()
            .skip(1)
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect(),
    };
    let width = width.max(cells.len());
    let last_row = grid.row_count().map_err(LedgerError::at(Step::Read))?;
    let name = record.name.trim().to_string();

    grid.copy_row(row, last_row + 1, width)
        .map_err(step_failed(ArchiveStep::Copy, &name))?;
    for offset in 1..block_len {
        grid.copy_row(row + offset, last_row + 1 + offset, width)
            .map_err(step_failed(ArchiveStep::CopyBlock, &name))?;
    }
    for _ in 0..block_len {
        grid.delete_row(row)
            .map_err(step_failed(ArchiveStep::Delete, &name))?;
    }

    // The copy moved up by the block length when the original went away.
    let archived = record.archived(last_row + 1 - block_len);
    grid.write_cell(archived.row, 1, &archived.name)
        .map_err(step_failed(ArchiveStep::Rename, &name))?;
    for offset in 0..block_len {
        grid.shade_row(archived.row + offset, width, shade)
            .map_err(step_failed(ArchiveStep::Shade, &name))?;
    }

    info!(
        exercise = %name,
        from_row = row,
        to_row = archived.row,
        rows = block_len,
        "archived exercise"
    );
    Ok(ArchiveOutcome {
        record: archived,
        from_row: row,
        already_archived: false,
    })
}

fn already_archived<G: GridStore>(
    grid: &G,
    exercise_name: &str,
) -> Result<ArchiveOutcome, LedgerError> {
    let wanted = exercise_name.trim().to_lowercase();
    let records = catalog::load_records(grid)?;
    let record = records
        .into_iter()
        .find(|r| !r.is_active() && r.name.trim().to_lowercase() == wanted)
        .ok_or_else(|| LedgerError::NotFound(exercise_name.trim().to_string()))?;
    Ok(ArchiveOutcome {
        from_row: record.row,
        record,
        already_archived: true,
    })
}
