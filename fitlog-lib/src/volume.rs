//src/volume.rs
//! The short forms users type a session in.
//!
//! `"5.12 2x5x10 3x8x10"` is the date followed by `sets x weight x reps`
//! groups. The older message form names everything, separated by `;`:
//! `"Роман Г.; 4.12; Тяга вертикального блока; 8; 4; 10"` is athlete, date,
//! exercise, weight, sets and reps.
use thiserror::Error;

use crate::session::{SessionEntry, SetLine, SET_SEPARATOR};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VolumeError {
    #[error("Invalid volume format. Example: 5.12 2x5x10 3x8x10")]
    MissingGroups,
    #[error("Invalid group '{0}'. Expected something like 2x5x10")]
    InvalidGroup(String),
    #[error("Invalid format. Use: name; date; exercise; weight; sets; reps")]
    InvalidMessage,
    #[error("Sets and reps must be whole numbers between 1 and {MAX_SETS_PER_GROUP}.")]
    InvalidCount,
}

/// Upper bound on the set count of one group.
pub const MAX_SETS_PER_GROUP: usize = 100;

/// A session sent in the `;`-separated message form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMessage {
    pub athlete: String,
    pub exercise: String,
    pub entry: SessionEntry,
}

/// Parses a volume string into a session, one set line per performed set.
/// The Cyrillic "х" is accepted as a separator.
pub fn parse_volume(input: &str) -> Result<SessionEntry, VolumeError> {
    let mut parts = input.split_whitespace();
    let date = parts.next().ok_or(VolumeError::MissingGroups)?;
    let groups: Vec<&str> = parts.collect();
    if groups.is_empty() {
        return Err(VolumeError::MissingGroups);
    }

    let mut sets = Vec::new();
    for group in groups {
        let (count, weight, reps) =
            parse_group(group).ok_or_else(|| VolumeError::InvalidGroup(group.to_string()))?;
        sets.extend(std::iter::repeat(SetLine::new(weight, reps)).take(count));
    }
    Ok(SessionEntry::new(date, sets))
}

fn parse_group(group: &str) -> Option<(usize, String, u32)> {
    let normalized = group.replace('х', "x").replace('Х', "x").to_lowercase();
    let mut fields = normalized.split(SET_SEPARATOR);
    let count: usize = fields.next()?.parse().ok()?;
    let weight = fields.next()?.to_string();
    let reps: u32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || count == 0 || count > MAX_SETS_PER_GROUP {
        return None;
    }
    Some((count, weight, reps))
}

/// Parses `"athlete; date; exercise; weight; sets; reps"`. Sets are expanded
/// into one line each, like a single volume group.
pub fn parse_legacy_message(input: &str) -> Result<LegacyMessage, VolumeError> {
    let parts: Vec<&str> = input.split(';').map(str::trim).collect();
    let &[athlete, date, exercise, weight, sets, reps] = parts.as_slice() else {
        return Err(VolumeError::InvalidMessage);
    };
    if athlete.is_empty() || date.is_empty() || exercise.is_empty() {
        return Err(VolumeError::InvalidMessage);
    }
    let sets = parse_count(sets).filter(|n| *n <= MAX_SETS_PER_GROUP as u32);
    let (Some(sets), Some(reps)) = (sets, parse_count(reps)) else {
        return Err(VolumeError::InvalidCount);
    };

    let line = SetLine::new(weight, reps);
    Ok(LegacyMessage {
        athlete: athlete.to_string(),
        exercise: exercise.to_string(),
        entry: SessionEntry::new(date, vec![line; sets as usize]),
    })
}

// A decimal comma is read as a point; the count must still be whole.
fn parse_count(field: &str) -> Option<u32> {
    field.replace(',', ".").parse().ok().filter(|n| *n > 0)
}
