use anyhow::Result;
use chrono::NaiveDate;
use fitlog_lib::{
    parse_legacy_message, parse_volume, AccountLedger, Config, ConfigError, GridOp, GridStore,
    LedgerError, LedgerService, MemoryGrid, Placement, SessionEntry, SetLine, SqliteGrid,
    StandardColor, Step,
};

// Helper function to create a test service with in-memory database
fn create_test_service() -> Result<LedgerService> {
    let conn = rusqlite::Connection::open_in_memory()?;
    fitlog_lib::db::init_db(&conn)?;

    let config = Config {
        athletes: vec!["anna".to_string(), "Роман Г.".to_string()],
        allowed_usernames: vec!["gblsh".to_string(), "staytorqued".to_string()],
        archive_color: "Grey".to_string(),
        legacy_exercises: vec!["Old Squat".to_string()],
        ..Default::default()
    };

    Ok(LedgerService {
        config,
        conn,
        db_path: ":memory:".into(),
        config_path: "test_config.toml".into(),
    })
}

fn day(d: u32, m: u32, y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn session(date: &str, sets: &[(&str, u32)]) -> SessionEntry {
    SessionEntry::new(
        date,
        sets.iter().map(|(w, r)| SetLine::new(*w, *r)).collect(),
    )
}

#[test]
fn test_created_exercise_is_oldest_on_empty_grid() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    let entry = session("5.12", &[("8", 10), ("8", 10)]);

    ledger.create_exercise("Pullups", &entry)?;

    let oldest = ledger.oldest_at(1, day(20, 12, 2025))?;
    assert_eq!(oldest.len(), 1);
    assert_eq!(oldest[0].name, "Pullups");
    assert_eq!(oldest[0].lines, entry.lines());
    Ok(())
}

#[test]
fn test_duplicate_exercise_is_rejected() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    ledger.create_exercise("Bench Press", &session("1.1", &[("60", 10)]))?;

    let result = ledger.create_exercise("bench press", &session("2.1", &[("60", 10)]));
    assert!(matches!(result, Err(LedgerError::DuplicateExercise(_))));
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Exercise name must be unique"));
    assert_eq!(ledger.active_exercises()?, vec!["Bench Press"]);
    Ok(())
}

#[test]
fn test_archive_removes_from_active_and_oldest() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    ledger.create_exercise("Squat", &session("1.3", &[("100", 5)]))?;
    ledger.create_exercise("Bench", &session("2.3", &[("60", 8)]))?;
    ledger.record_session("Squat", &session("3.3", &[("102,5", 5)]))?;
    let before = ledger.grid().read_row(1)?;

    let outcome = ledger.archive("Squat")?;
    assert_eq!(outcome.record.name, "-Squat");
    assert_eq!(outcome.record.row, 2);

    assert_eq!(ledger.active_exercises()?, vec!["Bench"]);
    assert_eq!(ledger.archived_exercises()?, vec!["-Squat"]);
    for limit in 1..=5 {
        let oldest = ledger.oldest_at(limit, day(1, 4, 2025))?;
        assert!(oldest.iter().all(|o| o.name != "-Squat" && o.name != "Squat"));
    }

    // Session payloads survive byte for byte; only the name and row change.
    let after = ledger.grid().read_row(2)?;
    assert_eq!(after[0], "-Squat");
    assert_eq!(after[1..], before[1..]);

    let shaded = ledger.grid().cell(2, 1)?.expect("archived name cell");
    assert_eq!(shaded.background, Some(StandardColor::Grey.rgb()));
    Ok(())
}

#[test]
fn test_consecutive_archives_keep_payloads_and_shade() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    ledger.create_exercise("A", &session("1.1", &[("100", 5)]))?;
    ledger.create_exercise("B", &session("2.1", &[("60", 8)]))?;
    ledger.create_exercise("C", &session("3.1", &[("", 12)]))?;
    ledger.record_session("B", &session("4.1", &[("62,5", 8)]))?;

    ledger.archive("A")?;
    let outcome = ledger.archive("B")?;
    assert_eq!(outcome.from_row, 1);
    assert_eq!(outcome.record.row, 3);

    let grey = Some(StandardColor::Grey.rgb());
    assert_eq!(ledger.grid().read_row(1)?, vec!["C", "3.1\nx12"]);
    assert_eq!(ledger.grid().read_row(2)?, vec!["-A", "1.1\n100x5"]);
    assert_eq!(
        ledger.grid().read_row(3)?,
        vec!["-B", "2.1\n60x8", "4.1\n62,5x8"]
    );
    for (row, col) in [(2, 1), (2, 2), (2, 3), (3, 1), (3, 2), (3, 3)] {
        let cell = ledger.grid().cell(row, col)?.expect("shaded cell");
        assert_eq!(cell.background, grey, "row {row}, col {col}");
    }
    assert_eq!(ledger.grid().cell(2, 2)?.expect("session").emphasized_prefix, 3);
    assert_eq!(ledger.grid().cell(3, 3)?.expect("session").emphasized_prefix, 3);
    assert_eq!(ledger.grid().cell(1, 1)?.expect("name").background, None);

    assert_eq!(ledger.active_exercises()?, vec!["C"]);
    assert_eq!(ledger.archived_exercises()?, vec!["-A", "-B"]);
    Ok(())
}

#[test]
fn test_archived_legacy_block_keeps_history() -> Result<()> {
    let service = create_test_service()?;
    let mut grid = SqliteGrid::new(&service.conn, "anna");
    for (row, name, payload) in [
        (1, "Old Squat", "2.1"),
        (2, "", "100x5"),
        (3, "", "95x5"),
        (4, "Bench", "1.1\n60x8"),
    ] {
        grid.write_cell(row, 1, name)?;
        grid.write_cell(row, 2, payload)?;
    }

    let mut ledger = service.ledger("anna")?;
    let before = ledger.history("Old Squat")?;
    assert_eq!(before[0].lines(), vec!["2.1", "100x5", "95x5"]);

    ledger.archive("Old Squat")?;
    assert_eq!(ledger.grid().read_column(1)?, vec!["Bench", "-Old Squat", "", ""]);
    assert_eq!(ledger.history("Old Squat")?, before);
    Ok(())
}

#[test]
fn test_sessions_append_in_call_order() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    ledger.create_exercise("Row", &session("1.1", &[("50", 10)]))?;

    let first = ledger.record_session("row", &session("3.1", &[("52,5", 10)]))?;
    let second = ledger.record_session("ROW", &session("5.1", &[("-", 12)]))?;
    assert_eq!(first.col, 3);
    assert_eq!(second.col, 4);
    assert_eq!(
        ledger.grid().read_row(1)?,
        vec!["Row", "1.1\n50x10", "3.1\n52,5x10", "5.1\nx12"]
    );

    let styled = ledger.grid().cell(1, 4)?.expect("session cell");
    assert_eq!(styled.emphasized_text(), "5.1");

    let dates: Vec<String> = ledger.history("Row")?.into_iter().map(|s| s.date).collect();
    assert_eq!(dates, vec!["1.1", "3.1", "5.1"]);
    Ok(())
}

#[test]
fn test_oldest_limit_on_five_records() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    for (name, date) in [
        ("A", "10.3"),
        ("B", "2.3"),
        ("C", "8.3"),
        ("D", "1.3"),
        ("E", "5.3"),
    ] {
        ledger.create_exercise(name, &session(date, &[("", 10)]))?;
    }

    let oldest = ledger.oldest_at(3, day(1, 4, 2025))?;
    let names: Vec<&str> = oldest.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["D", "B", "E"]);
    assert!(oldest.windows(2).all(|w| w[0].last_date <= w[1].last_date));
    Ok(())
}

#[test]
fn test_year_boundary_inference() -> Result<()> {
    let mut ledger = AccountLedger::new(MemoryGrid::from_rows(&[
        &["Squat", "31.12\n100x5"],
        &["Bench", "1.1\n60x8"],
    ]));
    let oldest = ledger.oldest_at(2, day(2, 1, 2025))?;
    assert_eq!(oldest[0].last_date, day(31, 12, 2024));
    assert_eq!(oldest[1].last_date, day(1, 1, 2025));

    ledger.record_session("Squat", &session("2.1", &[("100", 5)]))?;
    let oldest = ledger.oldest_at(1, day(2, 1, 2025))?;
    assert_eq!(oldest[0].name, "Bench");
    Ok(())
}

#[test]
fn test_legacy_capacity_exceeded_writes_nothing() -> Result<()> {
    let mut ledger = AccountLedger::new(MemoryGrid::from_rows(&[
        &["Old Squat", "1.1"],
        &["", "100x5"],
        &["", ""],
        &["Bench", "1.1\n60x8"],
    ]))
    .with_legacy_exercises(vec!["old squat".to_string()]);
    assert_eq!(ledger.placement_for("Old Squat"), Placement::LegacyBlock);
    let before = ledger.grid().read_all()?;

    let result = ledger.record_session("Old Squat", &session("3.1", &[("100", 5); 3]));
    assert!(matches!(
        result,
        Err(LedgerError::CapacityExceeded {
            needed: 3,
            available: 2,
            ..
        })
    ));
    assert_eq!(ledger.grid().read_all()?, before);

    ledger.record_session("Old Squat", &session("3.1", &[("100", 5), ("100", 4)]))?;
    let history = ledger.history("Old Squat")?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].lines(), vec!["3.1", "100x5", "100x4"]);
    Ok(())
}

#[test]
fn test_scenario_header_row_and_pullups() -> Result<()> {
    let ledger = AccountLedger::new(MemoryGrid::from_rows(&[
        &["Row", ""],
        &["Pullups", "5.12\n8x10\n8x10"],
    ]));
    let oldest = ledger.oldest_at(1, day(10, 12, 2025))?;
    assert_eq!(oldest.len(), 1);
    assert_eq!(oldest[0].name, "Pullups");
    assert_eq!(oldest[0].lines, vec!["5.12", "8x10", "8x10"]);
    Ok(())
}

#[test]
fn test_partial_archive_failure_is_reported() -> Result<()> {
    let mut grid = MemoryGrid::from_rows(&[&["Squat", "1.1\n100x5"], &["Bench", "1.1\n60x8"]]);
    grid.fail_on(GridOp::ShadeRow);
    let mut ledger = AccountLedger::new(grid);

    let err = ledger.archive("Squat").unwrap_err();
    assert!(matches!(
        err,
        LedgerError::StoreUnavailable {
            step: Step::Archive(fitlog_lib::ArchiveStep::Shade),
            ..
        }
    ));
    assert!(err.left_partial_state());
    // Renamed and moved, just not shaded.
    assert_eq!(ledger.archived_exercises()?, vec!["-Squat"]);
    Ok(())
}

#[test]
fn test_accounts_do_not_share_grids() -> Result<()> {
    let service = create_test_service()?;
    service
        .ledger("anna")?
        .create_exercise("Squat", &session("1.1", &[("100", 5)]))?;
    let roman = service.ledger("роман г.")?;
    assert!(roman.active_exercises()?.is_empty());
    assert!(matches!(
        roman.lookup_row("Squat"),
        Err(LedgerError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_unknown_athlete_and_authorization() -> Result<()> {
    let service = create_test_service()?;
    assert!(matches!(
        service.ledger("nobody"),
        Err(ConfigError::UnknownAthlete(_))
    ));
    assert!(service.authorize("@gblsh").is_ok());
    assert!(matches!(
        service.authorize("stranger"),
        Err(ConfigError::Unauthorized(_))
    ));
    Ok(())
}

#[test]
fn test_volume_string_records_expanded_sets() -> Result<()> {
    let service = create_test_service()?;
    let mut ledger = service.ledger("anna")?;
    let entry = parse_volume("5.12 2x5x10 1x7,5x8")?;
    ledger.create_exercise("Curl", &entry)?;
    assert_eq!(
        ledger.grid().read_row(1)?,
        vec!["Curl", "5.12\n5x10\n5x10\n7,5x8"]
    );
    Ok(())
}

#[test]
fn test_legacy_message_fills_row_block() -> Result<()> {
    let message = parse_legacy_message("anna; 4.12; Old Squat; 100; 2; 5")?;
    let mut ledger = AccountLedger::new(MemoryGrid::from_rows(&[
        &["Old Squat", "1.12"],
        &["", "95x5"],
        &["", ""],
        &["Bench", "1.12\n60x8"],
    ]));
    let slot =
        ledger.record_session_with(&message.exercise, &message.entry, Placement::LegacyBlock)?;
    assert_eq!((slot.row, slot.col), (1, 3));
    assert_eq!(ledger.grid().read_column(3)?, vec!["4.12", "100x5", "100x5", ""]);
    Ok(())
}
