//src/db.rs
use rusqlite::{named_params, params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::grid::{check_address, Cell, GridStore, Rgb, StoreError};

const DB_FILE_NAME: &str = "ledger.sqlite";
const APP_DATA_DIR: &str = "fitlog";

/// Gets the path to the SQLite database file within the app's data directory.
/// Exposed at crate root as get_db_path_util
pub fn get_db_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir().ok_or(StoreError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR); // Same dir name as config
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    Ok(conn)
}

/// Initializes the cell table if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cells (
            account TEXT NOT NULL,
            row_idx INTEGER NOT NULL,
            col_idx INTEGER NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            emphasized_prefix INTEGER NOT NULL DEFAULT 0,
            background INTEGER, -- 0xRRGGBB, NULL = no fill
            PRIMARY KEY (account, row_idx, col_idx)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cells_account_col ON cells(account, col_idx)",
        [],
    )?;

    Ok(())
}

/// One account's grid stored in the `cells` table.
pub struct SqliteGrid<'c> {
    conn: &'c Connection,
    account: String,
}

impl<'c> SqliteGrid<'c> {
    pub fn new(conn: &'c Connection, account: &str) -> Self {
        Self {
            conn,
            account: account.to_string(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Builds a row vector from `(col, text)` pairs, filling gaps with "".
    fn assemble(cells: Vec<(i64, String)>) -> Vec<String> {
        let width = cells.iter().map(|(c, _)| *c as usize).max().unwrap_or(0);
        let mut row = vec![String::new(); width];
        for (col, text) in cells {
            row[col as usize - 1] = text;
        }
        row
    }
}

impl GridStore for SqliteGrid<'_> {
    fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT row_idx, col_idx, text FROM cells
             WHERE account = ?1 AND text <> ''
             ORDER BY row_idx, col_idx",
        )?;
        let cells = stmt
            .query_map([&self.account], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<(i64, i64, String)>, _>>()?;

        let row_count = cells.last().map_or(0, |(r, _, _)| *r as usize);
        let mut grouped: Vec<Vec<(i64, String)>> = vec![Vec::new(); row_count];
        for (row, col, text) in cells {
            grouped[row as usize - 1].push((col, text));
        }
        Ok(grouped.into_iter().map(Self::assemble).collect())
    }

    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError> {
        check_address(row, 1)?;
        let mut stmt = self.conn.prepare(
            "SELECT col_idx, text FROM cells
             WHERE account = ?1 AND row_idx = ?2 AND text <> ''
             ORDER BY col_idx",
        )?;
        let cells = stmt
            .query_map(params![self.account, row as i64], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(cells))
    }

    fn read_column(&self, col: usize) -> Result<Vec<String>, StoreError> {
        check_address(1, col)?;
        let row_count = self.row_count()?;
        let mut stmt = self.conn.prepare(
            "SELECT row_idx, text FROM cells
             WHERE account = ?1 AND col_idx = ?2 AND text <> ''",
        )?;
        let mut column = vec![String::new(); row_count];
        let cells = stmt.query_map(params![self.account, col as i64], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?;
        for cell in cells {
            let (row, text) = cell?;
            column[row as usize - 1] = text;
        }
        Ok(column)
    }

    fn row_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(row_idx), 0) FROM cells WHERE account = ?1 AND text <> ''",
            [&self.account],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn column_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(col_idx), 0) FROM cells WHERE account = ?1 AND text <> ''",
            [&self.account],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn cell(&self, row: usize, col: usize) -> Result<Option<Cell>, StoreError> {
        check_address(row, col)?;
        let cell = self
            .conn
            .query_row(
                "SELECT text, emphasized_prefix, background FROM cells
                 WHERE account = ?1 AND row_idx = ?2 AND col_idx = ?3",
                params![self.account, row as i64, col as i64],
                |r| {
                    let background: Option<i64> = r.get(2)?;
                    Ok(Cell {
                        text: r.get(0)?,
                        emphasized_prefix: r.get::<_, i64>(1)? as usize,
                        background: background.map(|b| Rgb::from_u32(b as u32)),
                    })
                },
            )
            .optional()?;
        Ok(cell)
    }

    fn write_cell(&mut self, row: usize, col: usize, text: &str) -> Result<(), StoreError> {
        check_address(row, col)?;
        self.conn.execute(
            "INSERT INTO cells (account, row_idx, col_idx, text)
             VALUES (:account, :row, :col, :text)
             ON CONFLICT(account, row_idx, col_idx) DO UPDATE SET text = excluded.text",
            named_params! {
                ":account": self.account,
                ":row": row as i64,
                ":col": col as i64,
                ":text": text,
            },
        )?;
        Ok(())
    }

    fn write_styled_cell(
        &mut self,
        row: usize,
        col: usize,
        text: &str,
        emphasized_prefix: usize,
    ) -> Result<(), StoreError> {
        check_address(row, col)?;
        let prefix = emphasized_prefix.min(text.chars().count());
        // Text and styling land in one statement so the cell is never half-styled.
        self.conn.execute(
            "INSERT INTO cells (account, row_idx, col_idx, text, emphasized_prefix)
             VALUES (:account, :row, :col, :text, :prefix)
             ON CONFLICT(account, row_idx, col_idx) DO UPDATE
             SET text = excluded.text, emphasized_prefix = excluded.emphasized_prefix",
            named_params! {
                ":account": self.account,
                ":row": row as i64,
                ":col": col as i64,
                ":text": text,
                ":prefix": prefix as i64,
            },
        )?;
        Ok(())
    }

    fn copy_row(&mut self, src: usize, dst: usize, width: usize) -> Result<(), StoreError> {
        check_address(src, 1)?;
        check_address(dst, 1)?;
        if src == dst {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM cells WHERE account = ?1 AND row_idx = ?2 AND col_idx <= ?3",
            params![self.account, dst as i64, width as i64],
        )?;
        let copied = tx.execute(
            "INSERT INTO cells (account, row_idx, col_idx, text, emphasized_prefix, background)
             SELECT account, ?2, col_idx, text, emphasized_prefix, background FROM cells
             WHERE account = ?1 AND row_idx = ?3 AND col_idx <= ?4",
            params![self.account, dst as i64, src as i64, width as i64],
        )?;
        tx.commit()?;
        debug!(account = %self.account, src, dst, copied, "copied row");
        Ok(())
    }

    fn delete_row(&mut self, row: usize) -> Result<(), StoreError> {
        check_address(row, 1)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM cells WHERE account = ?1 AND row_idx = ?2",
            params![self.account, row as i64],
        )?;
        // Shift through negative indices so the primary key never collides mid-update.
        tx.execute(
            "UPDATE cells SET row_idx = -(row_idx - 1) WHERE account = ?1 AND row_idx > ?2",
            params![self.account, row as i64],
        )?;
        tx.execute(
            "UPDATE cells SET row_idx = -row_idx WHERE account = ?1 AND row_idx < 0",
            [&self.account],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn shade_row(&mut self, row: usize, width: usize, color: Rgb) -> Result<(), StoreError> {
        check_address(row, 1)?;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cells (account, row_idx, col_idx, background)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(account, row_idx, col_idx) DO UPDATE SET background = excluded.background",
            )?;
            for col in 1..=width {
                stmt.execute(params![
                    self.account,
                    row as i64,
                    col as i64,
                    i64::from(color.to_u32())
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
