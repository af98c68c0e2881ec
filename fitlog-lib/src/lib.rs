// src/lib.rs
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::debug;

// --- Declare modules ---
mod account;
pub mod archive;
pub mod catalog;
mod config;
pub mod db;
mod error;
pub mod grid;
pub mod interaction;
pub mod ledger;
pub mod session;
pub mod staleness;
pub mod volume;

// --- Expose public types ---
pub use account::AccountLedger;
pub use archive::{ArchiveOutcome, ArchiveStep, DEFAULT_ARCHIVE_SHADE};
pub use catalog::{ExerciseRecord, INACTIVE_MARKER};
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, ConfigError, StandardColor, Theme,
};
pub use db::{get_db_path as get_db_path_util, SqliteGrid};
pub use error::{LedgerError, Step};
pub use grid::{Cell, GridOp, GridStore, MemoryGrid, Rgb, StoreError};
pub use ledger::{Placement, SessionSlot};
pub use session::{SessionEntry, SetLine};
pub use staleness::StaleExercise;
pub use volume::{parse_legacy_message, parse_volume, LegacyMessage, VolumeError};

pub struct LedgerService {
    pub config: Config,
    pub conn: Connection,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl LedgerService {
    /// Initializes the ledger service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let conn = db::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        db::init_db(&conn).context("Failed to initialize database schema")?;
        debug!(?config_path, ?db_path, "ledger service initialized");

        Ok(Self {
            config,
            conn,
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    pub fn athletes(&self) -> &[String] {
        &self.config.athletes
    }

    /// Adds an athlete and saves the configuration.
    /// # Errors
    /// Returns `ConfigError` if the name is empty, taken, or saving fails.
    pub fn add_athlete(&mut self, athlete: &str) -> Result<(), ConfigError> {
        self.config.add_athlete(athlete)?;
        self.save_config()
    }

    /// # Errors
    /// Returns `ConfigError::Unauthorized` for users outside the allow list.
    pub fn authorize(&self, username: &str) -> Result<(), ConfigError> {
        self.config.authorize(username)
    }

    /// Opens the ledger of a configured athlete.
    /// # Errors
    /// Returns `ConfigError::UnknownAthlete` if the athlete is not configured.
    pub fn ledger(&self, athlete: &str) -> Result<AccountLedger<SqliteGrid<'_>>, ConfigError> {
        let account = self.config.resolve_athlete(athlete)?;
        Ok(AccountLedger::new(SqliteGrid::new(&self.conn, account))
            .with_shade(self.config.archive_shade())
            .with_legacy_exercises(self.config.legacy_exercises.clone()))
    }
}
