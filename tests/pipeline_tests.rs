use chess_insights::deriver::starts_new_session;
use chess_insights::{
    AnalysisConfig, EnrichedTable, InsightsReport, Outcome, PerspectivePolicy, PgnSource,
    Pipeline, Side, SpeedClass, TimeControl,
};
use chrono::Duration;
use std::fmt::Write;
use std::io::Write as IoWrite;

/// Build a single PGN game from header pairs and a movetext
fn pgn_game(headers: &[(&str, &str)], movetext: &str) -> String {
    let mut game = String::new();
    for (key, value) in headers {
        writeln!(game, "[{} \"{}\"]", key, value).unwrap();
    }
    writeln!(game).unwrap();
    writeln!(game, "{}", movetext).unwrap();
    writeln!(game).unwrap();
    game
}

fn timed_game(white: &str, black: &str, result: &str, date: &str, time: &str) -> String {
    pgn_game(
        &[
            ("Event", "Rated Blitz game"),
            ("White", white),
            ("Black", black),
            ("Result", result),
            ("UTCDate", date),
            ("UTCTime", time),
            ("WhiteElo", "1500"),
            ("BlackElo", "1450"),
            ("TimeControl", "180+2"),
            ("Opening", "Italian Game"),
            ("ECO", "C50"),
        ],
        &format!("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 {}", result),
    )
}

fn run(pgn: &str, config: &AnalysisConfig) -> EnrichedTable {
    let pipeline = Pipeline::from_config(config).unwrap();
    let (table, _) = pipeline.run(PgnSource::new(pgn.as_bytes()));
    table
}

#[test]
fn test_two_tracked_identities_three_entries() {
    let pgn = [
        timed_game("IsmatS", "Bot", "1-0", "2024.01.10", "10:00:00"),
        timed_game("Bot", "Cassiny", "1-0", "2024.01.10", "11:00:00"),
        timed_game("Untracked", "AlsoUntracked", "0-1", "2024.01.10", "12:00:00"),
    ]
    .concat();

    let pipeline = Pipeline::from_config(&AnalysisConfig::new(["IsmatS", "Cassiny"])).unwrap();
    let (table, stats) = pipeline.run(PgnSource::new(pgn.as_bytes()));

    assert_eq!(table.len(), 2);
    assert_eq!(stats.entries_seen, 3);
    assert_eq!(stats.entries_untracked, 1);
    assert_eq!(stats.records_emitted, 2);

    let first = &table.records()[0].record;
    assert_eq!(first.identity, "IsmatS");
    assert_eq!(first.side, Side::White);
    assert_eq!(first.outcome, Outcome::Win);
    assert_eq!(first.rating_gap, 50);
    assert_eq!(first.ply_count, 6);

    let second = &table.records()[1].record;
    assert_eq!(second.identity, "Cassiny");
    assert_eq!(second.side, Side::Black);
    assert_eq!(second.outcome, Outcome::Loss);
    assert_eq!(second.rating_gap, -50);
}

#[test]
fn test_session_boundary_at_exact_threshold() {
    let pgn = [
        timed_game("IsmatS", "Bot", "1-0", "2024.03.01", "10:00:00"),
        timed_game("IsmatS", "Bot", "0-1", "2024.03.01", "11:00:00"),
        timed_game("IsmatS", "Bot", "1-0", "2024.03.01", "12:00:01"),
    ]
    .concat();

    let table = run(&pgn, &AnalysisConfig::new(["IsmatS"]).with_session_gap_hours(1.0));
    let records = table.records();

    assert_eq!(records[0].gap_since_previous, None);
    assert_eq!(records[1].gap_since_previous, Some(Duration::hours(1)));
    assert_eq!(records[1].gap_hours(), Some(1.0));
    // A gap of exactly the threshold stays in the session
    assert_eq!(records[0].session_id, Some(1));
    assert_eq!(records[1].session_id, Some(1));
    // One second over does not
    assert_eq!(records[2].session_id, Some(2));

    let threshold = Duration::hours(1);
    assert!(!starts_new_session(Some(Duration::hours(1)), threshold));
    assert!(starts_new_session(Some(Duration::milliseconds(3_600_360)), threshold));
}

#[test]
fn test_rerun_is_byte_identical() {
    let pgn = [
        timed_game("IsmatS", "Bot", "1-0", "2024.01.10", "10:00:00"),
        timed_game("Cassiny", "IsmatS", "1/2-1/2", "2024.01.10", "10:20:00"),
        timed_game("Bot", "Cassiny", "*", "2024.01.11", "23:59:59"),
        timed_game("IsmatS", "Bot", "0-1", "", ""),
    ]
    .concat();
    let config = AnalysisConfig::default();

    let mut first_csv = Vec::new();
    let mut second_csv = Vec::new();
    run(&pgn, &config).write_csv(&mut first_csv).unwrap();
    run(&pgn, &config).write_csv(&mut second_csv).unwrap();
    assert_eq!(first_csv, second_csv);

    let first_report = InsightsReport::build(&run(&pgn, &config), &config.report).render();
    let second_report = InsightsReport::build(&run(&pgn, &config), &config.report).render();
    assert_eq!(first_report, second_report);
}

#[test]
fn test_gap_and_session_properties_hold_per_identity() {
    let times = [
        "08:00:00", "08:10:00", "08:25:00", "09:40:00", "09:50:00", "13:00:00", "13:30:00",
    ];
    // Deliberately shuffled input order
    let order = [3, 0, 6, 1, 5, 2, 4];
    let pgn: String = order
        .iter()
        .map(|&i| timed_game("IsmatS", "Bot", "1-0", "2024.05.20", times[i]))
        .collect();

    let table = run(&pgn, &AnalysisConfig::new(["IsmatS"]));
    let sorted = table.chronological("IsmatS");
    assert_eq!(sorted.len(), times.len());

    assert_eq!(sorted[0].gap_since_previous, None);
    for pair in sorted.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        let expected_gap = current.timestamp.unwrap() - previous.timestamp.unwrap();
        assert_eq!(current.gap_since_previous, Some(expected_gap));

        let step = current.session_id.unwrap() - previous.session_id.unwrap();
        assert!(step <= 1);
        assert_eq!(step == 1, expected_gap > Duration::hours(1));
    }

    let sessions: Vec<u32> = sorted.iter().filter_map(|r| r.session_id).collect();
    assert_eq!(sessions, vec![1, 1, 1, 2, 2, 3, 3]);
}

#[test]
fn test_malformed_numeric_headers_become_zero() {
    let pgn = pgn_game(
        &[
            ("White", "IsmatS"),
            ("Black", "Bot"),
            ("Result", "1-0"),
            ("WhiteElo", "?"),
            ("BlackElo", "15OO"),
            ("WhiteRatingDiff", ""),
            ("TimeControl", "-"),
        ],
        "1. d4 d5 1-0",
    );

    let table = run(&pgn, &AnalysisConfig::new(["IsmatS"]));
    let record = &table.records()[0].record;
    assert_eq!(record.identity_rating, 0);
    assert_eq!(record.opponent_rating, 0);
    assert_eq!(record.rating_delta, 0);
    assert_eq!(record.time_control, TimeControl::new(0, 0));
    assert_eq!(record.speed_class, SpeedClass::Bullet);
}

#[test]
fn test_invalid_utf8_entry_is_skipped() {
    let mut pgn = timed_game("IsmatS", "Bot", "1-0", "2024.01.10", "10:00:00").into_bytes();
    pgn.extend_from_slice(
        b"[White \"IsmatS\"]\n[Black \"B\xffot\"]\n[Result \"0-1\"]\n\n1. e4 0-1\n\n",
    );
    pgn.extend_from_slice(
        timed_game("IsmatS", "Bot", "0-1", "2024.01.10", "10:30:00").as_bytes(),
    );

    let pipeline = Pipeline::from_config(&AnalysisConfig::new(["IsmatS"])).unwrap();
    let (table, stats) = pipeline.run(PgnSource::new(pgn.as_slice()));

    assert_eq!(stats.entries_seen, 3);
    assert_eq!(stats.entries_failed, 1);
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[1].record.outcome, Outcome::Loss);
}

#[test]
fn test_perspective_policies() {
    let pgn = timed_game("IsmatS", "Cassiny", "0-1", "2024.01.10", "10:00:00");

    let each = run(&pgn, &AnalysisConfig::new(["IsmatS", "Cassiny"]));
    assert_eq!(each.len(), 2);
    assert_eq!(each.records()[0].record.outcome, Outcome::Loss);
    assert_eq!(each.records()[1].record.identity, "Cassiny");
    assert_eq!(each.records()[1].record.outcome, Outcome::Win);

    let first_match = run(
        &pgn,
        &AnalysisConfig::new(["IsmatS", "Cassiny"]).with_perspective(PerspectivePolicy::FirstMatch),
    );
    assert_eq!(first_match.len(), 1);
    assert_eq!(first_match.records()[0].record.side, Side::White);
}

#[test]
fn test_speed_class_boundaries() {
    let cases = [
        ("0+0", SpeedClass::Bullet),
        ("179+0", SpeedClass::Bullet),
        ("180+0", SpeedClass::Blitz),
        ("599+0", SpeedClass::Blitz),
        ("600+0", SpeedClass::Rapid),
        ("1800+0", SpeedClass::Classical),
        ("60+3", SpeedClass::Blitz),
    ];

    let pgn: String = cases
        .iter()
        .map(|(tc, _)| {
            pgn_game(
                &[("White", "IsmatS"), ("Black", "Bot"), ("Result", "1-0"), ("TimeControl", tc)],
                "1. e4 1-0",
            )
        })
        .collect();

    let table = run(&pgn, &AnalysisConfig::new(["IsmatS"]));
    let classes: Vec<SpeedClass> = table.records().iter().map(|r| r.record.speed_class).collect();
    let expected: Vec<SpeedClass> = cases.iter().map(|(_, class)| *class).collect();
    assert_eq!(classes, expected);
}

#[test]
fn test_files_on_disk_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("games.pgn");
    let mut file = std::fs::File::create(&path).unwrap();
    for hour in 10..14 {
        let time = format!("{:02}:00:00", hour);
        let result = if hour % 2 == 0 { "1-0" } else { "0-1" };
        file.write_all(timed_game("IsmatS", "Bot", result, "2024.07.06", &time).as_bytes())
            .unwrap();
    }
    drop(file);

    let config = AnalysisConfig::new(["IsmatS"]);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let (table, stats) = pipeline.run(PgnSource::<std::fs::File>::from_path(&path).unwrap());
    assert_eq!(stats.records_emitted, 4);

    let csv_path = dir.path().join("table.csv");
    table.write_csv(std::fs::File::create(&csv_path).unwrap()).unwrap();
    let csv_text = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv_text.lines().count(), 5);

    let report = InsightsReport::build(&table, &config.report).render();
    assert!(report.contains("ISMATS"));
    assert!(report.contains("Summer"));

    assert!(PgnSource::<std::fs::File>::from_path(dir.path().join("missing.pgn")).is_err());
}
