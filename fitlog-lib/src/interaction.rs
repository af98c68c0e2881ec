//src/interaction.rs
//! Per-user conversation state for menu-driven front ends.
//!
//! A `Conversation` is owned by whoever talks to one user and is passed
//! explicitly; transitions never touch the grid. They return an `Action`
//! that the front end carries out against an `AccountLedger`.
use crate::session::SessionEntry;
use crate::volume::{parse_legacy_message, parse_volume};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    AthleteSelected {
        athlete: String,
    },
    ChoosingExercise {
        athlete: String,
    },
    AwaitingExerciseName {
        athlete: String,
    },
    AwaitingVolume {
        athlete: String,
        exercise: String,
        /// The exercise does not exist yet and is created with this session.
        create: bool,
    },
    AwaitingOldestCount {
        athlete: String,
    },
}

impl State {
    pub fn athlete(&self) -> Option<&str> {
        match self {
            State::Idle => None,
            State::AthleteSelected { athlete }
            | State::ChoosingExercise { athlete }
            | State::AwaitingExerciseName { athlete }
            | State::AwaitingVolume { athlete, .. }
            | State::AwaitingOldestCount { athlete } => Some(athlete),
        }
    }
}

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Back,
    SelectAthlete(String),
    AddSession,
    PickExercise(String),
    NewExercise,
    Oldest,
    OldestCount(usize),
    Text(String),
    /// A complete `;`-separated session message, accepted in any state.
    Message(String),
}

/// What the front end should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowAthletes,
    ShowAthleteMenu {
        athlete: String,
    },
    ShowExercises {
        athlete: String,
    },
    AskExerciseName,
    AskVolume {
        exercise: String,
    },
    AskOldestCount,
    Record {
        athlete: String,
        exercise: String,
        entry: SessionEntry,
    },
    Create {
        athlete: String,
        exercise: String,
        entry: SessionEntry,
    },
    Oldest {
        athlete: String,
        limit: usize,
    },
    /// Record into the exercise's legacy row block.
    RecordLegacy {
        athlete: String,
        exercise: String,
        entry: SessionEntry,
    },
    Reject(String),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub user: String,
    state: State,
}

impl Conversation {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            state: State::Idle,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn handle(&mut self, input: Input) -> Action {
        let state = std::mem::take(&mut self.state);
        let (next, action) = transition(state, input);
        self.state = next;
        action
    }
}

fn athlete_menu(athlete: String) -> (State, Action) {
    (
        State::AthleteSelected {
            athlete: athlete.clone(),
        },
        Action::ShowAthleteMenu { athlete },
    )
}

fn transition(state: State, input: Input) -> (State, Action) {
    match (state, input) {
        (_, Input::Start) => (State::Idle, Action::ShowAthletes),
        (_, Input::SelectAthlete(athlete)) => athlete_menu(athlete),
        (state, Input::Message(text)) => match parse_legacy_message(&text) {
            Ok(message) => (
                state,
                Action::RecordLegacy {
                    athlete: message.athlete,
                    exercise: message.exercise,
                    entry: message.entry,
                },
            ),
            Err(e) => (state, Action::Reject(e.to_string())),
        },

        (State::Idle | State::AthleteSelected { .. }, Input::Back) => {
            (State::Idle, Action::ShowAthletes)
        }
        (
            State::ChoosingExercise { athlete }
            | State::AwaitingExerciseName { athlete }
            | State::AwaitingVolume { athlete, .. }
            | State::AwaitingOldestCount { athlete },
            Input::Back,
        ) => athlete_menu(athlete),

        (State::AthleteSelected { athlete }, Input::AddSession) => (
            State::ChoosingExercise {
                athlete: athlete.clone(),
            },
            Action::ShowExercises { athlete },
        ),
        (State::AthleteSelected { athlete }, Input::Oldest) => {
            (State::AwaitingOldestCount { athlete }, Action::AskOldestCount)
        }

        (State::ChoosingExercise { athlete }, Input::PickExercise(exercise)) => (
            State::AwaitingVolume {
                athlete,
                exercise: exercise.clone(),
                create: false,
            },
            Action::AskVolume { exercise },
        ),
        (State::ChoosingExercise { athlete }, Input::NewExercise) => {
            (State::AwaitingExerciseName { athlete }, Action::AskExerciseName)
        }

        (State::AwaitingExerciseName { athlete }, Input::Text(name)) => {
            let exercise = name.trim().to_string();
            if exercise.is_empty() {
                return (
                    State::AwaitingExerciseName { athlete },
                    Action::Reject("Exercise name cannot be empty.".to_string()),
                );
            }
            (
                State::AwaitingVolume {
                    athlete,
                    exercise: exercise.clone(),
                    create: true,
                },
                Action::AskVolume { exercise },
            )
        }

        (
            State::AwaitingVolume {
                athlete,
                exercise,
                create,
            },
            Input::Text(text),
        ) => match parse_volume(&text) {
            Ok(entry) => {
                let action = if create {
                    Action::Create {
                        athlete: athlete.clone(),
                        exercise,
                        entry,
                    }
                } else {
                    Action::Record {
                        athlete: athlete.clone(),
                        exercise,
                        entry,
                    }
                };
                (State::AthleteSelected { athlete }, action)
            }
            Err(e) => (
                State::AwaitingVolume {
                    athlete,
                    exercise,
                    create,
                },
                Action::Reject(e.to_string()),
            ),
        },

        (State::AwaitingOldestCount { athlete }, Input::OldestCount(limit)) => {
            oldest(athlete, limit)
        }
        (State::AwaitingOldestCount { athlete }, Input::Text(text)) => {
            match text.trim().parse::<usize>() {
                Ok(limit) => oldest(athlete, limit),
                Err(_) => (
                    State::AwaitingOldestCount { athlete },
                    Action::Reject(format!("'{}' is not a number.", text.trim())),
                ),
            }
        }

        (state, input) => {
            let message = format!("Unexpected {input:?} here.");
            (state, Action::Reject(message))
        }
    }
}

fn oldest(athlete: String, limit: usize) -> (State, Action) {
    if limit == 0 {
        return (
            State::AwaitingOldestCount { athlete },
            Action::Reject("Pick at least one exercise.".to_string()),
        );
    }
    (
        State::AthleteSelected {
            athlete: athlete.clone(),
        },
        Action::Oldest { athlete, limit },
    )
}
