//src/session.rs
use std::fmt;

use crate::error::LedgerError;

pub const SET_SEPARATOR: char = 'x';

/// One performed set. `weight` is kept as the user typed it ("12,5" stays
/// "12,5").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLine {
    pub weight: String,
    pub reps: u32,
}

impl SetLine {
    pub fn new(weight: impl Into<String>, reps: u32) -> Self {
        Self {
            weight: weight.into(),
            reps,
        }
    }

    /// A blank, "0" or "-" weight means no load and is not rendered.
    pub fn has_weight(&self) -> bool {
        !matches!(self.weight.trim(), "" | "0" | "-")
    }

    /// Parses a rendered set line ("80x5", "x10").
    pub fn parse(line: &str) -> Option<Self> {
        let (weight, reps) = line.trim().rsplit_once(SET_SEPARATOR)?;
        let reps = reps.trim().parse().ok()?;
        Some(Self::new(weight.trim(), reps))
    }
}

impl fmt::Display for SetLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_weight() {
            write!(f, "{}{}{}", self.weight.trim(), SET_SEPARATOR, self.reps)
        } else {
            write!(f, "{}{}", SET_SEPARATOR, self.reps)
        }
    }
}

/// One logged workout of one exercise: a day/month label and its sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub date: String,
    pub sets: Vec<SetLine>,
}

impl SessionEntry {
    pub fn new(date: impl Into<String>, sets: Vec<SetLine>) -> Self {
        Self {
            date: date.into(),
            sets,
        }
    }

    fn validate(&self) -> Result<(), LedgerError> {
        let date = self.date.trim();
        if date.is_empty() {
            return Err(LedgerError::MalformedPayload(
                "Session date cannot be empty.".to_string(),
            ));
        }
        if date.contains('\n') {
            return Err(LedgerError::MalformedPayload(format!(
                "Session date '{date}' must be a single line."
            )));
        }
        if self.sets.is_empty() {
            return Err(LedgerError::MalformedPayload(format!(
                "Session '{date}' has no sets."
            )));
        }
        if let Some(bad) = self.sets.iter().find(|s| s.weight.contains('\n')) {
            return Err(LedgerError::MalformedPayload(format!(
                "Weight '{}' must be a single line.",
                bad.weight.escape_debug()
            )));
        }
        Ok(())
    }

    /// The date line first, then one line per set.
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.date.trim().to_string())
            .chain(self.sets.iter().map(ToString::to_string))
            .collect()
    }

    /// Serializes the session into its single-cell payload. Surrounding
    /// whitespace of the date and of each weight is dropped; everything else
    /// is kept as typed.
    /// # Errors
    /// `LedgerError::MalformedPayload` if the date is blank or multi-line or
    /// there are no sets.
    pub fn encode(&self) -> Result<String, LedgerError> {
        self.validate()?;
        Ok(self.lines().join("\n"))
    }

    /// Length of the emphasized date line, in characters.
    pub fn date_len(&self) -> usize {
        self.date.trim().chars().count()
    }

    /// Parses a payload written by `encode`.
    /// # Errors
    /// `LedgerError::MalformedPayload` if a set line does not parse or the
    /// payload has no sets.
    pub fn decode(payload: &str) -> Result<Self, LedgerError> {
        let mut lines = payload.lines().filter(|l| !l.trim().is_empty());
        let date = lines
            .next()
            .ok_or_else(|| LedgerError::MalformedPayload("Empty payload.".to_string()))?;
        let sets = lines
            .map(|line| {
                SetLine::parse(line).ok_or_else(|| {
                    LedgerError::MalformedPayload(format!("Cannot read set line '{line}'."))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let entry = Self::new(date.trim(), sets);
        entry.validate()?;
        Ok(entry)
    }
}
