use kabo_cli::run;
use kabo_engine::logger::RoundRecord;
use serial_test::serial;
use std::fs;

fn run_sim(args: &[&str]) -> (i32, String, String) {
    let mut argv = vec!["kabo", "sim"];
    argv.extend_from_slice(args);
    let mut out: Vec<u8> = Vec::new();
    let mut err: Vec<u8> = Vec::new();
    let code = run(argv, &mut out, &mut err);
    (
        code,
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    )
}

fn rounds_reported(stdout: &str) -> usize {
    let line = stdout
        .lines()
        .find(|l| l.starts_with("Simulated"))
        .expect("summary line");
    // "Simulated N game(s), R round(s)"
    line.split(", ")
        .nth(1)
        .and_then(|part| part.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .expect("round count")
}

#[test]
#[serial]
fn sim_runs_games_and_writes_one_line_per_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("rounds.jsonl");
    let (code, stdout, stderr) = run_sim(&[
        "--games",
        "2",
        "--players",
        "3",
        "--seed",
        "1",
        "--output",
        path.to_string_lossy().as_ref(),
    ]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("sim: games=2 players=3 ai=baseline seed=1"));
    assert!(stdout.contains("Game 1:"));
    assert!(stdout.contains("Game 2:"));

    let contents = fs::read_to_string(&path).unwrap();
    let records: Vec<RoundRecord> = contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("round record"))
        .collect();
    assert_eq!(records.len(), rounds_reported(&stdout));
    assert!(records.iter().all(|r| r.players.len() == 3));
    assert!(records.iter().all(|r| r.ts.is_some()));
    let games: Vec<u64> = records
        .iter()
        .filter_map(|r| r.meta.as_ref().and_then(|m| m["game"].as_u64()))
        .collect();
    assert_eq!(games.first(), Some(&1));
    assert_eq!(games.last(), Some(&2));
    assert!(records[0].round_id.ends_with("-000001"));
}

#[test]
#[serial]
fn sim_is_deterministic_with_a_seed() {
    let first = run_sim(&["--games", "3", "--seed", "99", "--ai", "random"]);
    let second = run_sim(&["--games", "3", "--seed", "99", "--ai", "random"]);
    assert_eq!(first.0, 0);
    assert_eq!(first.1, second.1);
}

#[test]
#[serial]
fn sim_rejects_zero_games_and_unknown_ai() {
    let (code, _, stderr) = run_sim(&["--games", "0"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("games must be >= 1"));

    let (code, _, stderr) = run_sim(&["--ai", "oracle"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("unknown ai 'oracle'"));
}

#[test]
#[serial]
fn sim_break_after_exits_with_interrupted_code() {
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var("KABO_SIM_BREAK_AFTER", "1") };
    let (code, stdout, stderr) = run_sim(&["--games", "3", "--seed", "5"]);
    unsafe { std::env::remove_var("KABO_SIM_BREAK_AFTER") };

    assert_eq!(code, 130);
    assert!(stdout.contains("Game 1:"));
    assert!(!stdout.contains("Game 2:"));
    assert!(stderr.contains("Interrupted: 1 of 3 games completed"));
}
