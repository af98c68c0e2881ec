//src/grid.rs
//! The grid store contract the ledger engine is written against, plus an
//! in-memory implementation.
//!
//! Rows and columns are 1-based, the way spreadsheet tools address cells.
use std::fmt;
use thiserror::Error;

/// Errors raised by a grid store adapter. The engine treats all of them as
/// "store unavailable" and never retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing grid store: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cell address out of range: row {row}, column {col}")]
    OutOfRange { row: usize, col: usize },
    #[error("Grid store unavailable during {0}")]
    Unavailable(GridOp),
}

/// Identifies an adapter primitive. Used for fault injection and in error
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOp {
    ReadAll,
    ReadRow,
    ReadColumn,
    WriteCell,
    WriteStyledCell,
    CopyRow,
    DeleteRow,
    ShadeRow,
}

impl fmt::Display for GridOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridOp::ReadAll => "read-all",
            GridOp::ReadRow => "read-row",
            GridOp::ReadColumn => "read-column",
            GridOp::WriteCell => "write-cell",
            GridOp::WriteStyledCell => "write-styled-cell",
            GridOp::CopyRow => "copy-row",
            GridOp::DeleteRow => "delete-row",
            GridOp::ShadeRow => "shade-row",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0xRRGGBB`, the form the SQLite adapter stores.
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }
}

/// One cell: its text plus the presentation state the engine manages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    /// Number of leading characters rendered bold/italic.
    pub emphasized_prefix: usize,
    pub background: Option<Rgb>,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The emphasized part of the text.
    pub fn emphasized_text(&self) -> String {
        self.text.chars().take(self.emphasized_prefix).collect()
    }
}

/// A persistent two-dimensional cell grid backing one account.
pub trait GridStore {
    /// Every row up to the last non-empty one, as plain text. Rows are not
    /// padded to a common width.
    fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// One row as plain text, with trailing empty cells dropped.
    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError>;

    /// One column as plain text, one entry per row up to `row_count()`.
    fn read_column(&self, col: usize) -> Result<Vec<String>, StoreError>;

    /// Index of the last row holding any text (0 for an empty grid).
    fn row_count(&self) -> Result<usize, StoreError>;

    /// Index of the right-most column holding any text.
    fn column_count(&self) -> Result<usize, StoreError>;

    fn cell(&self, row: usize, col: usize) -> Result<Option<Cell>, StoreError>;

    /// Plain value write; existing styling is left alone.
    fn write_cell(&mut self, row: usize, col: usize, text: &str) -> Result<(), StoreError>;

    /// Writes the text and its styling in a single request: the first
    /// `emphasized_prefix` characters are emphasized, the rest is plain.
    fn write_styled_cell(
        &mut self,
        row: usize,
        col: usize,
        text: &str,
        emphasized_prefix: usize,
    ) -> Result<(), StoreError>;

    /// Duplicates columns `1..=width` of `src` into `dst`, styling included.
    fn copy_row(&mut self, src: usize, dst: usize, width: usize) -> Result<(), StoreError>;

    /// Removes `row`; every following row moves up by one.
    fn delete_row(&mut self, row: usize) -> Result<(), StoreError>;

    /// Fills columns `1..=width` of `row` with a uniform background.
    fn shade_row(&mut self, row: usize, width: usize, color: Rgb) -> Result<(), StoreError>;
}

pub(crate) fn check_address(row: usize, col: usize) -> Result<(), StoreError> {
    if row == 0 || col == 0 {
        return Err(StoreError::OutOfRange { row, col });
    }
    Ok(())
}

/// Vector-of-rows grid. Used by tests and for dry runs; `fail_on` makes one
/// primitive fail so partial-failure paths can be exercised.
#[derive(Debug, Default, Clone)]
pub struct MemoryGrid {
    rows: Vec<Vec<Cell>>,
    failing: Option<GridOp>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a grid from plain text rows.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|text| Cell {
                        text: (*text).to_string(),
                        ..Cell::default()
                    })
                    .collect()
            })
            .collect();
        Self {
            rows,
            failing: None,
        }
    }

    /// Every later call to `op` fails with `StoreError::Unavailable`.
    pub fn fail_on(&mut self, op: GridOp) {
        self.failing = Some(op);
    }

    pub fn clear_failure(&mut self) {
        self.failing = None;
    }

    fn check(&self, op: GridOp) -> Result<(), StoreError> {
        match self.failing {
            Some(failing) if failing == op => Err(StoreError::Unavailable(op)),
            _ => Ok(()),
        }
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize_with(col, Cell::default);
        }
        &mut cells[col - 1]
    }

    fn last_text_index(cells: &[Cell]) -> usize {
        cells
            .iter()
            .rposition(|c| !c.text.is_empty())
            .map_or(0, |i| i + 1)
    }
}

impl GridStore for MemoryGrid {
    fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.check(GridOp::ReadAll)?;
        let count = self.row_count()?;
        Ok(self.rows[..count]
            .iter()
            .map(|cells| {
                cells[..Self::last_text_index(cells)]
                    .iter()
                    .map(|c| c.text.clone())
                    .collect()
            })
            .collect())
    }

    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError> {
        self.check(GridOp::ReadRow)?;
        check_address(row, 1)?;
        Ok(self
            .rows
            .get(row - 1)
            .map(|cells| {
                cells[..Self::last_text_index(cells)]
                    .iter()
                    .map(|c| c.text.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_column(&self, col: usize) -> Result<Vec<String>, StoreError> {
        self.check(GridOp::ReadColumn)?;
        check_address(1, col)?;
        let count = self.row_count()?;
        Ok(self.rows[..count]
            .iter()
            .map(|cells| cells.get(col - 1).map(|c| c.text.clone()).unwrap_or_default())
            .collect())
    }

    fn row_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .rows
            .iter()
            .rposition(|cells| Self::last_text_index(cells) > 0)
            .map_or(0, |i| i + 1))
    }

    fn column_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .rows
            .iter()
            .map(|cells| Self::last_text_index(cells))
            .max()
            .unwrap_or(0))
    }

    fn cell(&self, row: usize, col: usize) -> Result<Option<Cell>, StoreError> {
        check_address(row, col)?;
        Ok(self
            .rows
            .get(row - 1)
            .and_then(|cells| cells.get(col - 1))
            .cloned())
    }

    fn write_cell(&mut self, row: usize, col: usize, text: &str) -> Result<(), StoreError> {
        self.check(GridOp::WriteCell)?;
        check_address(row, col)?;
        self.cell_mut(row, col).text = text.to_string();
        Ok(())
    }

    fn write_styled_cell(
        &mut self,
        row: usize,
        col: usize,
        text: &str,
        emphasized_prefix: usize,
    ) -> Result<(), StoreError> {
        self.check(GridOp::WriteStyledCell)?;
        check_address(row, col)?;
        let cell = self.cell_mut(row, col);
        cell.text = text.to_string();
        cell.emphasized_prefix = emphasized_prefix.min(text.chars().count());
        Ok(())
    }

    fn copy_row(&mut self, src: usize, dst: usize, width: usize) -> Result<(), StoreError> {
        self.check(GridOp::CopyRow)?;
        check_address(src, 1)?;
        check_address(dst, 1)?;
        let mut copied: Vec<Cell> = self.rows.get(src - 1).cloned().unwrap_or_default();
        copied.resize_with(width, Cell::default);
        for (i, cell) in copied.into_iter().enumerate() {
            *self.cell_mut(dst, i + 1) = cell;
        }
        Ok(())
    }

    fn delete_row(&mut self, row: usize) -> Result<(), StoreError> {
        self.check(GridOp::DeleteRow)?;
        check_address(row, 1)?;
        if row <= self.rows.len() {
            self.rows.remove(row - 1);
        }
        Ok(())
    }

    fn shade_row(&mut self, row: usize, width: usize, color: Rgb) -> Result<(), StoreError> {
        self.check(GridOp::ShadeRow)?;
        check_address(row, 1)?;
        for col in 1..=width {
            self.cell_mut(row, col).background = Some(color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_row_drops_trailing_empty_cells() {
        let grid = MemoryGrid::from_rows(&[&["Squat", "1.1\n100x5", "", ""]]);
        assert_eq!(grid.read_row(1).unwrap(), vec!["Squat", "1.1\n100x5"]);
        assert!(grid.read_row(7).unwrap().is_empty());
    }

    #[test]
    fn test_zero_index_is_out_of_range() {
        let grid = MemoryGrid::new();
        assert!(matches!(
            grid.read_row(0),
            Err(StoreError::OutOfRange { row: 0, col: 1 })
        ));
    }

    #[test]
    fn test_row_count_ignores_trailing_empty_rows() {
        let grid = MemoryGrid::from_rows(&[&["A"], &[""], &["B"], &["", ""]]);
        assert_eq!(grid.row_count().unwrap(), 3);
        assert_eq!(grid.read_column(1).unwrap(), vec!["A", "", "B"]);
    }

    #[test]
    fn test_copy_then_delete_moves_styling() {
        let mut grid = MemoryGrid::from_rows(&[&["A"], &["B"]]);
        grid.write_styled_cell(1, 2, "5.12\n8x10", 4).unwrap();
        grid.copy_row(1, 3, 2).unwrap();
        grid.delete_row(1).unwrap();

        assert_eq!(grid.read_column(1).unwrap(), vec!["B", "A"]);
        let moved = grid.cell(2, 2).unwrap().unwrap();
        assert_eq!(moved.text, "5.12\n8x10");
        assert_eq!(moved.emphasized_text(), "5.12");
    }

    #[test]
    fn test_fault_injection() {
        let mut grid = MemoryGrid::from_rows(&[&["A"]]);
        grid.fail_on(GridOp::ShadeRow);
        let err = grid.shade_row(1, 1, Rgb::new(1, 2, 3)).unwrap_err();
        assert!(err.to_string().contains("shade-row"));
        grid.clear_failure();
        grid.shade_row(1, 1, Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(
            grid.cell(1, 1).unwrap().unwrap().background,
            Some(Rgb::new(1, 2, 3))
        );
    }

    #[test]
    fn test_rgb_packing() {
        let color = Rgb::new(0xd9, 0xd9, 0xd9);
        assert_eq!(color.to_u32(), 0x00d9_d9d9);
        assert_eq!(Rgb::from_u32(color.to_u32()), color);
    }
}
