// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log strength workouts into per-athlete grids", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print lists as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured athletes
    Athletes,
    /// Add an athlete (one grid per athlete)
    AddAthlete {
        /// Athlete name, used as the account key (e.g., "Роман Г.")
        name: String,
    },
    /// List an athlete's exercises
    Exercises {
        athlete: String,
        /// List archived exercises instead of active ones
        #[arg(long)]
        archived: bool,
    },
    /// Log a session for an existing exercise
    Log {
        athlete: String,
        exercise: String,
        /// Date followed by sets x weight x reps groups (e.g., 5.12 2x5x10 3x8x10)
        #[arg(required = true, num_args = 2..)]
        volume: Vec<String>,
        /// Write into the exercise's legacy row block instead of a new column
        #[arg(long)]
        legacy: bool,
    },
    /// Log a session sent as "athlete; date; exercise; weight; sets; reps" into the
    /// exercise's legacy row block
    Message {
        /// The whole message (e.g., "Роман Г.; 4.12; Тяга вертикального блока; 8; 4; 10")
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Create an exercise together with its first session
    Create {
        athlete: String,
        exercise: String,
        /// Date followed by sets x weight x reps groups (e.g., 5.12 2x5x10)
        #[arg(required = true, num_args = 2..)]
        volume: Vec<String>,
    },
    /// Archive an exercise (moves it to the end, marks and shades it)
    Archive { athlete: String, exercise: String },
    /// Show the exercises that have gone longest without a session
    Oldest {
        athlete: String,
        /// Number of exercises to show (defaults to the configured value)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u16).range(1..))]
        limit: Option<u16>,
    },
    /// Show every session of an exercise
    History { athlete: String, exercise: String },
    /// Show an athlete's whole grid, archived rows included
    Show { athlete: String },
    /// Menu-driven session over stdin, as a chat front end would run it
    Chat {
        /// Username to authorize (without '@')
        #[arg(short, long)]
        user: String,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_collects_volume_words() {
        let cli = Cli::try_parse_from(["fitlog", "log", "anna", "Squat", "5.12", "2x100x5", "1x90x8"])
            .unwrap();
        match cli.command {
            Commands::Log {
                volume, legacy, ..
            } => {
                assert_eq!(volume, vec!["5.12", "2x100x5", "1x90x8"]);
                assert!(!legacy);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_message_joins_words() {
        let cli =
            Cli::try_parse_from(["fitlog", "message", "anna; 4.12; Squat; 100; 3; 5"]).unwrap();
        match cli.command {
            Commands::Message { text } => {
                assert_eq!(text, vec!["anna; 4.12; Squat; 100; 3; 5"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_oldest_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["fitlog", "oldest", "anna", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["fitlog", "oldest", "anna", "-n", "4"]).is_ok());
    }
}
