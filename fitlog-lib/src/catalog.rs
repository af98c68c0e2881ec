//src/catalog.rs
//! Name resolution over column 1 of an account grid.
use crate::error::{LedgerError, Step};
use crate::grid::GridStore;

/// Prepended to an exercise name (no space) when the record is archived.
pub const INACTIVE_MARKER: char = '-';

pub fn is_inactive(name: &str) -> bool {
    name.trim_start().starts_with(INACTIVE_MARKER)
}

/// The name without the inactive marker.
pub fn bare_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(INACTIVE_MARKER)
        .map_or(trimmed, str::trim_start)
}

/// Comparison key: trimmed, marker-stripped, case-folded.
pub fn name_key(name: &str) -> String {
    bare_name(name).to_lowercase()
}

/// One row of the grid seen as a record: the name in column 1 and the
/// session payloads to its right, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRecord {
    pub name: String,
    pub row: usize,
    pub sessions: Vec<String>,
}

impl ExerciseRecord {
    pub fn is_active(&self) -> bool {
        !is_inactive(&self.name)
    }

    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }

    /// The most recent (right-most) session payload.
    pub fn last_session(&self) -> Option<&str> {
        self.sessions.last().map(String::as_str)
    }

    /// The name this record carries once archived. Archiving an archived
    /// record leaves it as it is.
    pub fn archived_name(&self) -> String {
        if self.is_active() {
            format!("{INACTIVE_MARKER}{}", self.name.trim())
        } else {
            self.name.clone()
        }
    }

    /// The active -> archived transition. Sessions are carried over intact.
    pub fn archived(&self, new_row: usize) -> Self {
        Self {
            name: self.archived_name(),
            row: new_row,
            sessions: self.sessions.clone(),
        }
    }
}

fn read_names<G: GridStore>(grid: &G) -> Result<Vec<String>, LedgerError> {
    grid.read_column(1).map_err(LedgerError::at(Step::Read))
}

/// Finds the first row whose name matches `name`, ignoring case, surrounding
/// whitespace and the inactive marker. Archived records can be found by their
/// bare name.
/// # Errors
/// `LedgerError::NotFound` if no row matches.
pub fn lookup_row<G: GridStore>(grid: &G, name: &str) -> Result<usize, LedgerError> {
    let key = name_key(name);
    if key.is_empty() {
        return Err(LedgerError::NotFound(name.to_string()));
    }
    read_names(grid)?
        .iter()
        .position(|stored| !stored.trim().is_empty() && name_key(stored) == key)
        .map(|i| i + 1)
        .ok_or_else(|| LedgerError::NotFound(name.trim().to_string()))
}

/// Like `lookup_row`, but only active records are candidates.
/// # Errors
/// `LedgerError::NotFound` if no active row matches.
pub fn find_active_row<G: GridStore>(grid: &G, name: &str) -> Result<usize, LedgerError> {
    let key = name_key(name);
    if key.is_empty() || is_inactive(name) {
        return Err(LedgerError::NotFound(name.trim().to_string()));
    }
    read_names(grid)?
        .iter()
        .position(|stored| {
            !stored.trim().is_empty() && !is_inactive(stored) && name_key(stored) == key
        })
        .map(|i| i + 1)
        .ok_or_else(|| LedgerError::NotFound(name.trim().to_string()))
}

/// The stored name colliding with `name`, if any (active or archived).
pub fn find_conflict<G: GridStore>(grid: &G, name: &str) -> Result<Option<String>, LedgerError> {
    let key = name_key(name);
    Ok(read_names(grid)?
        .into_iter()
        .find(|stored| !stored.trim().is_empty() && name_key(stored) == key))
}

/// Active exercise names in row order.
pub fn list_active<G: GridStore>(grid: &G) -> Result<Vec<String>, LedgerError> {
    Ok(read_names(grid)?
        .into_iter()
        .filter(|name| !name.trim().is_empty() && !is_inactive(name))
        .collect())
}

/// Archived exercise names (marker included) in row order.
pub fn list_inactive<G: GridStore>(grid: &G) -> Result<Vec<String>, LedgerError> {
    Ok(read_names(grid)?
        .into_iter()
        .filter(|name| is_inactive(name))
        .collect())
}

/// The column right after the contiguous run of filled cells starting at
/// column 1. New sessions are appended there.
pub fn next_free_column<G: GridStore>(grid: &G, row: usize) -> Result<usize, LedgerError> {
    let cells = grid.read_row(row).map_err(LedgerError::at(Step::Read))?;
    Ok(cells.iter().take_while(|c| !c.trim().is_empty()).count() + 1)
}

/// The whole grid as records, in row order. Rows with an empty name are
/// skipped.
pub fn load_records<G: GridStore>(grid: &G) -> Result<Vec<ExerciseRecord>, LedgerError> {
    let rows = grid.read_all().map_err(LedgerError::at(Step::Read))?;
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, cells)| {
            let mut cells = cells.into_iter();
            let name = cells.next().filter(|n| !n.trim().is_empty())?;
            Some(ExerciseRecord {
                name,
                row: i + 1,
                sessions: cells.filter(|c| !c.trim().is_empty()).collect(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryGrid;

    fn sample() -> MemoryGrid {
        MemoryGrid::from_rows(&[
            &["Squat", "1.1\n100x5"],
            &["-Deadlift", "2.1\n140x3"],
            &[""],
            &[" Pullups ", "3.1\nx10", "4.1\nx12"],
        ])
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let grid = sample();
        assert_eq!(lookup_row(&grid, "squat").unwrap(), 1);
        assert_eq!(lookup_row(&grid, "  PULLUPS").unwrap(), 4);
    }

    #[test]
    fn test_lookup_finds_archived_by_bare_name() {
        let grid = sample();
        assert_eq!(lookup_row(&grid, "Deadlift").unwrap(), 2);
        assert!(matches!(
            find_active_row(&grid, "Deadlift"),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            lookup_row(&grid, "Bench"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_active_and_inactive() {
        let grid = sample();
        assert_eq!(list_active(&grid).unwrap(), vec!["Squat", " Pullups "]);
        assert_eq!(list_inactive(&grid).unwrap(), vec!["-Deadlift"]);
    }

    #[test]
    fn test_next_free_column() {
        let grid = sample();
        assert_eq!(next_free_column(&grid, 1).unwrap(), 3);
        assert_eq!(next_free_column(&grid, 3).unwrap(), 1);
        assert_eq!(next_free_column(&grid, 4).unwrap(), 4);
    }

    #[test]
    fn test_load_records() {
        let records = load_records(&sample()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].row, 4);
        assert_eq!(records[2].last_session(), Some("4.1\nx12"));
        assert!(!records[1].is_active());
        assert_eq!(records[1].bare_name(), "Deadlift");
    }

    #[test]
    fn test_archived_transition_is_idempotent() {
        let record = ExerciseRecord {
            name: "Squat".to_string(),
            row: 1,
            sessions: vec!["1.1\n100x5".to_string()],
        };
        let archived = record.archived(9);
        assert_eq!(archived.name, "-Squat");
        assert_eq!(archived.sessions, record.sessions);
        assert_eq!(archived.archived(9), archived);
    }
}
