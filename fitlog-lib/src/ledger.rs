//src/ledger.rs
use tracing::{debug, info, warn};

use crate::catalog::{self, is_inactive};
use crate::error::{LedgerError, Step};
use crate::grid::GridStore;
use crate::session::{SessionEntry, SetLine};

/// Where a session's data goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// The whole payload in a new column of the exercise's own row.
    #[default]
    Column,
    /// Old table layout: the date in the header row, one set per row below
    /// it, inside the block of rows reserved for the exercise.
    LegacyBlock,
}

/// The cell a session was written to (its date cell for legacy blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSlot {
    pub row: usize,
    pub col: usize,
    pub placement: Placement,
}

/// Appends `entry` as a new column in the row of `exercise_name`.
///
/// The payload and its styling (date line emphasized, set lines plain) go out
/// as one write. Two concurrent calls for the same exercise can pick the same
/// column; callers must not record into one row from several places at once.
/// # Errors
/// - `LedgerError::NotFound` if the exercise does not exist.
/// - `LedgerError::MalformedPayload` if the entry has no sets or a bad date.
/// - `LedgerError::StoreUnavailable` on adapter failure.
pub fn record_session<G: GridStore>(
    grid: &mut G,
    exercise_name: &str,
    entry: &SessionEntry,
) -> Result<SessionSlot, LedgerError> {
    let row = catalog::lookup_row(&*grid, exercise_name)?;
    let col = catalog::next_free_column(&*grid, row)?;
    let payload = entry.encode()?;

    grid.write_styled_cell(row, col, &payload, entry.date_len())
        .map_err(LedgerError::at(Step::Write))?;
    debug!(exercise = exercise_name, row, col, sets = entry.sets.len(), "recorded session");

    Ok(SessionSlot {
        row,
        col,
        placement: Placement::Column,
    })
}

/// Number of empty-named rows directly below `header_row`, up to the next
/// exercise header or the last used row of the grid.
pub fn legacy_capacity<G: GridStore>(grid: &G, header_row: usize) -> Result<usize, LedgerError> {
    let names = grid.read_column(1).map_err(LedgerError::at(Step::Read))?;
    Ok(names
        .iter()
        .skip(header_row)
        .take_while(|name| name.trim().is_empty())
        .count())
}

/// Writes `entry` using the legacy block layout. Nothing is written when the
/// block is too small.
///
/// The block ends at the next named row or at the last row holding text, so
/// a legacy exercise at the bottom of the grid has no room until its set
/// rows carry text.
/// # Errors
/// - `LedgerError::NotFound`, `LedgerError::MalformedPayload` as for `record_session`.
/// - `LedgerError::CapacityExceeded` if there are more sets than free rows.
/// - `LedgerError::StoreUnavailable` on adapter failure.
pub fn record_session_legacy<G: GridStore>(
    grid: &mut G,
    exercise_name: &str,
    entry: &SessionEntry,
) -> Result<SessionSlot, LedgerError> {
    let row = catalog::lookup_row(&*grid, exercise_name)?;
    entry.encode()?;

    let available = legacy_capacity(&*grid, row)?;
    if entry.sets.len() > available {
        return Err(LedgerError::CapacityExceeded {
            exercise: exercise_name.trim().to_string(),
            needed: entry.sets.len(),
            available,
        });
    }

    let col = catalog::next_free_column(&*grid, row)?;
    let date = entry.date.trim();
    grid.write_styled_cell(row, col, date, entry.date_len())
        .map_err(LedgerError::at(Step::Write))?;
    for (offset, set) in entry.sets.iter().enumerate() {
        grid.write_cell(row + 1 + offset, col, &set.to_string())
            .map_err(LedgerError::at(Step::Write))?;
    }
    debug!(exercise = exercise_name, row, col, available, "recorded legacy session");

    Ok(SessionSlot {
        row,
        col,
        placement: Placement::LegacyBlock,
    })
}

pub fn record_session_with<G: GridStore>(
    grid: &mut G,
    exercise_name: &str,
    entry: &SessionEntry,
    placement: Placement,
) -> Result<SessionSlot, LedgerError> {
    match placement {
        Placement::Column => record_session(grid, exercise_name, entry),
        Placement::LegacyBlock => record_session_legacy(grid, exercise_name, entry),
    }
}

/// Appends a new exercise row and writes its first session into column 2.
///
/// If the session write fails the row stays in place without a session and
/// the error carries `Step::InitialSession`.
/// # Errors
/// - `LedgerError::InvalidName` for blank, multi-line or marker-prefixed names.
/// - `LedgerError::DuplicateExercise` if the name is taken (case-insensitive,
///   archived records included).
/// - `LedgerError::MalformedPayload` if the entry cannot be encoded; nothing
///   is written then.
/// - `LedgerError::StoreUnavailable` on adapter failure.
pub fn create_exercise_with_session<G: GridStore>(
    grid: &mut G,
    exercise_name: &str,
    entry: &SessionEntry,
) -> Result<SessionSlot, LedgerError> {
    let name = exercise_name.trim();
    if name.is_empty() || name.contains('\n') || is_inactive(name) {
        return Err(LedgerError::InvalidName(exercise_name.to_string()));
    }
    if let Some(existing) = catalog::find_conflict(&*grid, name)? {
        return Err(LedgerError::DuplicateExercise(existing));
    }
    let payload = entry.encode()?;

    let row = grid.row_count().map_err(LedgerError::at(Step::Read))? + 1;
    grid.write_cell(row, 1, name)
        .map_err(LedgerError::at(Step::Write))?;
    if let Err(e) = grid.write_styled_cell(row, 2, &payload, entry.date_len()) {
        warn!(exercise = name, row, error = %e, "exercise created without its first session");
        return Err(LedgerError::at(Step::InitialSession)(e));
    }
    info!(exercise = name, row, "created exercise");

    Ok(SessionSlot {
        row,
        col: 2,
        placement: Placement::Column,
    })
}

/// Decodes every session of an exercise, oldest first. Legacy block columns
/// (date alone in the header cell, sets in the rows below) are understood.
/// Cells that cannot be decoded are skipped.
pub fn history<G: GridStore>(
    grid: &G,
    exercise_name: &str,
) -> Result<Vec<SessionEntry>, LedgerError> {
    let row = catalog::lookup_row(&*grid, exercise_name)?;
    let all = grid.read_all().map_err(LedgerError::at(Step::Read))?;
    let Some(header) = all.get(row - 1) else {
        return Ok(Vec::new());
    };
    let block: Vec<&Vec<String>> = all[row..]
        .iter()
        .take_while(|cells| cells.first().map_or(true, |n| n.trim().is_empty()))
        .collect();

    let mut sessions = Vec::new();
    for (i, payload) in header.iter().enumerate().skip(1) {
        if payload.trim().is_empty() {
            continue;
        }
        let decoded = if payload.trim().lines().count() == 1 && !block.is_empty() {
            decode_block_column(payload, &block, i)
        } else {
            SessionEntry::decode(payload)
        };
        match decoded {
            Ok(entry) => sessions.push(entry),
            Err(e) => warn!(exercise = exercise_name, row, col = i + 1, error = %e, "skipping unreadable session"),
        }
    }
    Ok(sessions)
}

fn decode_block_column(
    date: &str,
    block: &[&Vec<String>],
    index: usize,
) -> Result<SessionEntry, LedgerError> {
    let sets = block
        .iter()
        .map_while(|cells| cells.get(index).filter(|c| !c.trim().is_empty()))
        .map(|line| {
            SetLine::parse(line)
                .ok_or_else(|| LedgerError::MalformedPayload(format!("Cannot read set line '{line}'.")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if sets.is_empty() {
        return Err(LedgerError::MalformedPayload(format!(
            "Session '{}' has no sets.",
            date.trim()
        )));
    }
    Ok(SessionEntry::new(date.trim(), sets))
}
