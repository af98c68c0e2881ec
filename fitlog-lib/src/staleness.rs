//src/staleness.rs
use chrono::{Datelike, Local, NaiveDate};
use tracing::debug;

use crate::catalog::is_inactive;
use crate::error::{LedgerError, Step};
use crate::grid::GridStore;

/// An active exercise with the payload of its most recent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleExercise {
    pub name: String,
    pub row: usize,
    /// Lines of the last session payload, the date label first.
    pub lines: Vec<String>,
    pub last_date: NaiveDate,
}

/// Parses a "day.month" label ("5.12", "05.12.", "5/12").
pub fn parse_day_month(label: &str) -> Option<(u32, u32)> {
    let label = label.trim().trim_end_matches('.');
    let (day, month) = label.split_once(['.', '/'])?;
    let day = day.trim().parse().ok()?;
    let month = month.trim().parse().ok()?;
    Some((day, month))
}

/// Resolves a year-less label against `today`: the current year, or the one
/// before when that date would still be ahead of today or does not exist
/// this year (29.2).
pub fn infer_date(label: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (day, month) = parse_day_month(label)?;
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if date <= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day),
    }
}

/// `find_oldest_at` evaluated against the local date.
pub fn find_oldest<G: GridStore>(grid: &G, limit: usize) -> Result<Vec<StaleExercise>, LedgerError> {
    find_oldest_at(grid, limit, Local::now().date_naive())
}

/// The `limit` active exercises whose last session is oldest, oldest first.
///
/// Rows without a name, archived rows, rows without any session and rows
/// whose last date label cannot be read are left out. Ties keep row order.
/// # Errors
/// - `LedgerError::InvalidLimit` if `limit` is 0.
/// - `LedgerError::StoreUnavailable` if the grid cannot be read.
pub fn find_oldest_at<G: GridStore>(
    grid: &G,
    limit: usize,
    today: NaiveDate,
) -> Result<Vec<StaleExercise>, LedgerError> {
    if limit == 0 {
        return Err(LedgerError::InvalidLimit);
    }
    let rows = grid.read_all().map_err(LedgerError::at(Step::Read))?;

    let mut candidates: Vec<StaleExercise> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, cells)| {
            let name = cells.first()?.clone();
            if name.trim().is_empty() || is_inactive(&name) {
                return None;
            }
            let payload = cells.iter().skip(1).rev().find(|c| !c.trim().is_empty())?;
            let lines: Vec<String> = payload.lines().map(str::to_string).collect();
            let label = lines.iter().find(|l| !l.trim().is_empty());
            let Some(last_date) = label.and_then(|label| infer_date(label, today)) else {
                debug!(exercise = %name, row = i + 1, "no readable last session date");
                return None;
            };
            Some(StaleExercise {
                name,
                row: i + 1,
                lines,
                last_date,
            })
        })
        .collect();

    candidates.sort_by_key(|c| c.last_date);
    candidates.truncate(limit);
    Ok(candidates)
}
