//src/account.rs
use chrono::NaiveDate;

use crate::archive::{self, ArchiveOutcome, DEFAULT_ARCHIVE_SHADE};
use crate::catalog::{self, name_key, ExerciseRecord};
use crate::error::LedgerError;
use crate::grid::{GridStore, Rgb};
use crate::ledger::{self, Placement, SessionSlot};
use crate::session::SessionEntry;
use crate::staleness::{self, StaleExercise};

/// One athlete's grid together with the settings the engine needs for it.
pub struct AccountLedger<G: GridStore> {
    grid: G,
    shade: Rgb,
    legacy_exercises: Vec<String>,
}

impl<G: GridStore> AccountLedger<G> {
    pub fn new(grid: G) -> Self {
        Self {
            grid,
            shade: DEFAULT_ARCHIVE_SHADE,
            legacy_exercises: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_shade(mut self, shade: Rgb) -> Self {
        self.shade = shade;
        self
    }

    /// Exercises whose sessions keep using the legacy row-block layout.
    #[must_use]
    pub fn with_legacy_exercises(mut self, names: Vec<String>) -> Self {
        self.legacy_exercises = names;
        self
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn placement_for(&self, exercise_name: &str) -> Placement {
        let key = name_key(exercise_name);
        if self.legacy_exercises.iter().any(|e| name_key(e) == key) {
            Placement::LegacyBlock
        } else {
            Placement::Column
        }
    }

    pub fn lookup_row(&self, exercise_name: &str) -> Result<usize, LedgerError> {
        catalog::lookup_row(&self.grid, exercise_name)
    }

    pub fn active_exercises(&self) -> Result<Vec<String>, LedgerError> {
        catalog::list_active(&self.grid)
    }

    pub fn archived_exercises(&self) -> Result<Vec<String>, LedgerError> {
        catalog::list_inactive(&self.grid)
    }

    pub fn records(&self) -> Result<Vec<ExerciseRecord>, LedgerError> {
        catalog::load_records(&self.grid)
    }

    /// Records a session with the placement configured for the exercise.
    pub fn record_session(
        &mut self,
        exercise_name: &str,
        entry: &SessionEntry,
    ) -> Result<SessionSlot, LedgerError> {
        let placement = self.placement_for(exercise_name);
        ledger::record_session_with(&mut self.grid, exercise_name, entry, placement)
    }

    pub fn record_session_with(
        &mut self,
        exercise_name: &str,
        entry: &SessionEntry,
        placement: Placement,
    ) -> Result<SessionSlot, LedgerError> {
        ledger::record_session_with(&mut self.grid, exercise_name, entry, placement)
    }

    pub fn create_exercise(
        &mut self,
        exercise_name: &str,
        entry: &SessionEntry,
    ) -> Result<SessionSlot, LedgerError> {
        ledger::create_exercise_with_session(&mut self.grid, exercise_name, entry)
    }

    pub fn archive(&mut self, exercise_name: &str) -> Result<ArchiveOutcome, LedgerError> {
        archive::deactivate(&mut self.grid, exercise_name, self.shade)
    }

    pub fn history(&self, exercise_name: &str) -> Result<Vec<SessionEntry>, LedgerError> {
        ledger::history(&self.grid, exercise_name)
    }

    pub fn oldest(&self, limit: usize) -> Result<Vec<StaleExercise>, LedgerError> {
        staleness::find_oldest(&self.grid, limit)
    }

    pub fn oldest_at(
        &self,
        limit: usize,
        today: NaiveDate,
    ) -> Result<Vec<StaleExercise>, LedgerError> {
        staleness::find_oldest_at(&self.grid, limit, today)
    }
}
