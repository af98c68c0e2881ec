//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, BufRead, Write};
use tracing_subscriber::EnvFilter;

use fitlog_lib::interaction::{Action, Conversation, Input, State};
use fitlog_lib::{
    parse_legacy_message, parse_volume, ExerciseRecord, LedgerError, LedgerService, Placement,
    SessionEntry, StaleExercise,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli_args = cli::parse_args(); // Parse arguments once
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command(); // Get the command structure
        let bin_name = cmd.get_name().to_string(); // Get the binary name

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout()); // Print script to stdout
        return Ok(());
    }

    // Initialize the service (loads config, connects to DB)
    let mut service =
        LedgerService::initialize().context("Failed to initialize ledger service")?;
    let header_color = fitlog_lib::parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Green);
    tracing::debug!(command = ?cli_args.command, "dispatching");

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Athletes => {
            let athletes = service.athletes().to_vec();
            if athletes.is_empty() {
                println!("No athletes configured. Use 'add-athlete <name>' to add one.");
            } else if export_csv {
                print_names_csv("Athlete", &athletes)?;
            } else {
                print_names_table("Athlete", &athletes, header_color);
            }
        }
        cli::Commands::AddAthlete { name } => {
            service
                .add_athlete(&name)
                .with_context(|| format!("Error adding athlete '{}'", name.trim()))?;
            println!("Added athlete '{}'.", name.trim());
        }
        cli::Commands::Exercises { athlete, archived } => {
            let ledger = service.ledger(&athlete)?;
            let names = if archived {
                ledger.archived_exercises()?
            } else {
                ledger.active_exercises()?
            };
            if names.is_empty() {
                println!("No exercises found for '{athlete}'.");
            } else if export_csv {
                print_names_csv("Exercise", &names)?;
            } else {
                print_names_table("Exercise", &names, header_color);
            }
        }
        cli::Commands::Log {
            athlete,
            exercise,
            volume,
            legacy,
        } => {
            let entry = parse_volume(&volume.join(" "))?;
            let mut ledger = service.ledger(&athlete)?;
            let result = if legacy {
                ledger.record_session_with(&exercise, &entry, Placement::LegacyBlock)
            } else {
                ledger.record_session(&exercise, &entry)
            };
            match result {
                Ok(slot) => println!(
                    "Logged {} set(s) of '{}' for {} (row {}, column {}).",
                    entry.sets.len(),
                    exercise.trim(),
                    athlete,
                    slot.row,
                    slot.col
                ),
                Err(e) => bail!("Error logging session: {}", e),
            }
        }
        cli::Commands::Message { text } => {
            let message = parse_legacy_message(&text.join(" "))?;
            let mut ledger = service.ledger(&message.athlete)?;
            let result =
                ledger.record_session_with(&message.exercise, &message.entry, Placement::LegacyBlock);
            match result {
                Ok(slot) => println!(
                    "Logged {} set(s) of '{}' for {} (row {}, column {}).",
                    message.entry.sets.len(),
                    message.exercise,
                    message.athlete,
                    slot.row,
                    slot.col
                ),
                Err(e) => bail!("Error logging session: {}", e),
            }
        }
        cli::Commands::Create {
            athlete,
            exercise,
            volume,
        } => {
            let entry = parse_volume(&volume.join(" "))?;
            let mut ledger = service.ledger(&athlete)?;
            match ledger.create_exercise(&exercise, &entry) {
                Ok(slot) => println!(
                    "Created '{}' for {} in row {} with its first session.",
                    exercise.trim(),
                    athlete,
                    slot.row
                ),
                Err(e) if e.left_partial_state() => bail!(
                    "'{}' was created but its first session was not saved: {}",
                    exercise.trim(),
                    e
                ),
                Err(e) => bail!("Error creating exercise: {}", e),
            }
        }
        cli::Commands::Archive { athlete, exercise } => {
            let mut ledger = service.ledger(&athlete)?;
            match ledger.archive(&exercise) {
                Ok(outcome) if outcome.already_archived => {
                    println!("'{}' is already archived.", outcome.record.name);
                }
                Ok(outcome) => println!(
                    "Archived '{}' (row {} -> row {}). Its sessions are kept.",
                    outcome.record.bare_name(),
                    outcome.from_row,
                    outcome.record.row
                ),
                Err(e) => report_archive_error(&exercise, e)?,
            }
        }
        cli::Commands::Oldest { athlete, limit } => {
            let limit = limit.map_or(service.config.default_oldest_limit, usize::from);
            let ledger = service.ledger(&athlete)?;
            let oldest = ledger.oldest(limit)?;
            if oldest.is_empty() {
                println!("No exercise of '{athlete}' has a readable last session.");
            } else if export_csv {
                print_oldest_csv(&oldest)?;
            } else {
                print_oldest_table(&oldest, header_color);
            }
        }
        cli::Commands::History { athlete, exercise } => {
            let ledger = service.ledger(&athlete)?;
            let sessions = ledger.history(&exercise)?;
            if sessions.is_empty() {
                println!("No sessions logged for '{}'.", exercise.trim());
            } else if export_csv {
                print_history_csv(&sessions)?;
            } else {
                print_history_table(&sessions, header_color);
            }
        }
        cli::Commands::Show { athlete } => {
            let ledger = service.ledger(&athlete)?;
            let records = ledger.records()?;
            let archive_color = fitlog_lib::parse_color(&service.config.archive_color)
                .map(Color::from)
                .unwrap_or(Color::Grey);
            if export_csv {
                print_records_csv(&records)?;
            } else {
                print_records_table(&records, header_color, archive_color);
            }
        }
        cli::Commands::Chat { user } => {
            service.authorize(&user)?;
            run_chat(&service, &user)?;
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

fn report_archive_error(exercise: &str, e: LedgerError) -> Result<()> {
    if let LedgerError::StoreUnavailable {
        step: fitlog_lib::Step::Archive(step),
        ..
    } = &e
    {
        if let Some(state) = step.partial_state() {
            bail!(
                "Archiving '{}' stopped at the {} step: {}. Check the grid by hand: {}.",
                exercise.trim(),
                step,
                e,
                state
            );
        }
    }
    bail!("Error archiving exercise: {}", e)
}

// --- Chat loop ---

fn prompt(text: &str) -> io::Result<Option<String>> {
    print!("{text}");
    stdout().flush()?;
    let mut line = String::new();
    if stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None); // EOF
    }
    Ok(Some(line.trim().to_string()))
}

/// Maps a typed line to an input, resolving numbers against the list the
/// user was last shown.
fn read_input(line: &str, state: &State, listed: &[String]) -> Input {
    if line.contains(';') && !matches!(state, State::AwaitingExerciseName { .. }) {
        return Input::Message(line.to_string());
    }
    match line {
        "/start" => return Input::Start,
        "/back" => return Input::Back,
        "/add" => return Input::AddSession,
        "/new" => return Input::NewExercise,
        "/oldest" => return Input::Oldest,
        _ => {}
    }
    let picked = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| listed.get(i))
        .cloned();
    match state {
        State::Idle => Input::SelectAthlete(picked.unwrap_or_else(|| line.to_string())),
        State::ChoosingExercise { .. } => {
            Input::PickExercise(picked.unwrap_or_else(|| line.to_string()))
        }
        _ => Input::Text(line.to_string()),
    }
}

fn print_numbered(items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
}

fn run_chat(service: &LedgerService, user: &str) -> Result<()> {
    let mut conversation = Conversation::new(user);
    let mut listed: Vec<String> = Vec::new();
    let mut action = conversation.handle(Input::Start);

    loop {
        match action {
            Action::ShowAthletes => {
                listed = service.athletes().to_vec();
                println!("Athletes (pick a number, /quit to leave):");
                print_numbered(&listed);
            }
            Action::ShowAthleteMenu { athlete } => {
                if let Err(e) = service.ledger(&athlete) {
                    eprintln!("{e}");
                    action = conversation.handle(Input::Start);
                    continue;
                }
                println!("{athlete}: /add to log a session, /oldest for stale exercises, /back");
            }
            Action::ShowExercises { athlete } => {
                listed = service.ledger(&athlete)?.active_exercises()?;
                println!("Exercises (pick a number, /new to create one, /back):");
                print_numbered(&listed);
            }
            Action::AskExerciseName => println!("Name of the new exercise:"),
            Action::AskVolume { exercise } => {
                println!("Send the volume for '{exercise}', e.g. 5.12 2x5x10 3x8x10");
            }
            Action::AskOldestCount => println!("How many exercises? (1-9)"),
            Action::Record {
                athlete,
                exercise,
                entry,
            } => match service.ledger(&athlete)?.record_session(&exercise, &entry) {
                Ok(_) => println!("Saved:\n{}", entry.lines().join("\n")),
                Err(e) => eprintln!("Not saved: {e}"),
            },
            Action::Create {
                athlete,
                exercise,
                entry,
            } => match service.ledger(&athlete)?.create_exercise(&exercise, &entry) {
                Ok(_) => println!("Created '{exercise}' with:\n{}", entry.lines().join("\n")),
                Err(e) => eprintln!("Not saved: {e}"),
            },
            Action::Oldest { athlete, limit } => {
                let oldest = service.ledger(&athlete)?.oldest(limit)?;
                if oldest.is_empty() {
                    println!("Nothing logged yet.");
                }
                for stale in &oldest {
                    println!("{}\n{}\n", stale.name, stale.lines.join("\n"));
                }
            }
            Action::RecordLegacy {
                athlete,
                exercise,
                entry,
            } => {
                let result = service.ledger(&athlete).map_err(anyhow::Error::from).and_then(
                    |mut ledger| {
                        ledger
                            .record_session_with(&exercise, &entry, Placement::LegacyBlock)
                            .map_err(anyhow::Error::from)
                    },
                );
                match result {
                    Ok(_) => println!(
                        "Saved for {athlete}, {exercise}:\n{}",
                        entry.lines().join("\n")
                    ),
                    Err(e) => eprintln!("Not saved: {e}"),
                }
            }
            Action::Reject(message) => eprintln!("{message}"),
        }

        let Some(line) = prompt("> ")? else {
            return Ok(());
        };
        if line == "/quit" {
            return Ok(());
        }
        let input = read_input(&line, conversation.state(), &listed);
        action = conversation.handle(input);
    }
}

// --- Table Printing Functions (Remain in CLI) ---

fn print_names_table(header: &str, names: &[String], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new(header).fg(header_color),
        ]);
    for (i, name) in names.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(name)]);
    }
    println!("{table}");
}

fn print_names_csv(header: &str, names: &[String]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([header])?;
    for name in names {
        writer.write_record([name])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_oldest_table(oldest: &[StaleExercise], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Exercise").fg(header_color),
            Cell::new("Last Date").fg(header_color),
            Cell::new("Days Ago").fg(header_color),
            Cell::new("Last Session").fg(header_color),
        ]);
    let today = chrono::Local::now().date_naive();
    for stale in oldest {
        table.add_row(vec![
            Cell::new(&stale.name),
            Cell::new(stale.last_date.format("%d.%m.%Y")),
            Cell::new((today - stale.last_date).num_days()),
            Cell::new(stale.lines.iter().skip(1).cloned().collect::<Vec<_>>().join("\n")),
        ]);
    }
    println!("{table}");
}

fn print_oldest_csv(oldest: &[StaleExercise]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Exercise", "Last_Date", "Sets"])?;
    for stale in oldest {
        writer.write_record([
            stale.name.clone(),
            stale.last_date.format("%Y-%m-%d").to_string(),
            stale.lines.iter().skip(1).cloned().collect::<Vec<_>>().join(" "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_history_table(sessions: &[SessionEntry], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Count").fg(header_color),
        ]);
    for session in sessions {
        let sets: Vec<String> = session.sets.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            Cell::new(&session.date).add_attribute(Attribute::Bold),
            Cell::new(sets.join(", ")),
            Cell::new(sets.len()),
        ]);
    }
    println!("{table}");
}

fn print_history_csv(sessions: &[SessionEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Date", "Set", "Weight", "Reps"])?;
    for session in sessions {
        for (i, set) in session.sets.iter().enumerate() {
            writer.write_record([
                session.date.clone(),
                (i + 1).to_string(),
                set.weight.clone(),
                set.reps.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_records_table(records: &[ExerciseRecord], header_color: Color, archive_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Row").fg(header_color),
            Cell::new("Exercise").fg(header_color),
            Cell::new("Sessions").fg(header_color),
            Cell::new("Last Session").fg(header_color),
        ]);
    for record in records {
        let name = if record.is_active() {
            Cell::new(&record.name)
        } else {
            Cell::new(&record.name).fg(archive_color).add_attribute(Attribute::Dim)
        };
        table.add_row(vec![
            Cell::new(record.row),
            name,
            Cell::new(record.sessions.len()),
            Cell::new(record.last_session().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_records_csv(records: &[ExerciseRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Row", "Exercise", "Active", "Sessions"])?;
    for record in records {
        writer.write_record([
            record.row.to_string(),
            record.name.clone(),
            record.is_active().to_string(),
            record.sessions.join(" | ").replace('\n', " "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_pick_from_listed_items() {
        let listed = vec!["Squat".to_string(), "Bench".to_string()];
        let choosing = State::ChoosingExercise {
            athlete: "anna".to_string(),
        };
        assert_eq!(
            read_input("2", &choosing, &listed),
            Input::PickExercise("Bench".to_string())
        );
        assert_eq!(
            read_input("Row", &choosing, &listed),
            Input::PickExercise("Row".to_string())
        );
        assert_eq!(read_input("/back", &choosing, &listed), Input::Back);
        assert_eq!(
            read_input("1", &State::Idle, &["anna".to_string()]),
            Input::SelectAthlete("anna".to_string())
        );
    }

    #[test]
    fn test_semicolon_lines_are_messages() {
        let line = "anna; 4.12; Squat; 100; 3; 5";
        assert_eq!(
            read_input(line, &State::Idle, &[]),
            Input::Message(line.to_string())
        );
        let naming = State::AwaitingExerciseName {
            athlete: "anna".to_string(),
        };
        assert_eq!(read_input("a;b", &naming, &[]), Input::Text("a;b".to_string()));
    }

    #[test]
    fn test_free_text_while_awaiting_volume() {
        let state = State::AwaitingVolume {
            athlete: "anna".to_string(),
            exercise: "Squat".to_string(),
            create: false,
        };
        assert_eq!(
            read_input("5.12 2x100x5", &state, &[]),
            Input::Text("5.12 2x100x5".to_string())
        );
    }
}
