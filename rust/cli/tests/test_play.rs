use kabo_cli::commands::{PlayOptions, handle_play_command};
use serial_test::serial;
use std::io::Cursor;

fn play(input: &str, options: PlayOptions) -> (bool, String, String) {
    let mut out: Vec<u8> = Vec::new();
    let mut err: Vec<u8> = Vec::new();
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let ok = handle_play_command(options, &mut out, &mut err, &mut stdin).is_ok();
    (
        ok,
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    )
}

fn one_round(seed: u64) -> PlayOptions {
    PlayOptions {
        seed: Some(seed),
        rounds: Some(1),
        ..PlayOptions::default()
    }
}

#[test]
#[serial]
fn human_calls_kabo_and_the_round_is_scored() {
    // Peek at two cards, then call KABO on the first turn.
    let (ok, stdout, stderr) = play("0 1\nk\n", one_round(42));
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("play: opponents=1 ai=baseline seed=42"));
    assert!(stdout.contains("Your card at position 0 is a"));
    assert!(stdout.contains("Your card at position 1 is a"));
    assert!(stdout.contains("YOU called KABO!"));
    assert!(stdout.contains("Round 1 ended after"));
    assert!(stdout.contains("Stopped after 1 round(s)."));
}

#[test]
#[serial]
fn invalid_answers_are_reprompted() {
    let (ok, stdout, _) = play("0 0\nnine\n0 1\nk\n", one_round(42));
    assert!(ok);
    assert!(stdout.contains("Error: position 0 chosen twice"));
    assert!(stdout.contains("Error: 'nine' is not a card position"));
    assert!(stdout.contains("Stopped after 1 round(s)."));
}

#[test]
#[serial]
fn end_of_input_abandons_the_game() {
    let (ok, stdout, stderr) = play("", one_round(3));
    assert!(ok);
    assert!(stdout.contains("Quit after 0 completed round(s)."));
    assert!(stderr.contains("WARNING: game abandoned"));
}

#[test]
#[serial]
fn table_is_shown_with_every_seat() {
    let options = PlayOptions {
        opponents: 3,
        ..one_round(8)
    };
    let (ok, stdout, _) = play("2 3\nkabo\n", options);
    assert!(ok);
    for seat in ["0: YOU (you)", "1: CPU1", "2: CPU2", "3: CPU3"] {
        assert!(stdout.contains(seat), "missing {}", seat);
    }
}

#[test]
#[serial]
fn blank_name_is_rejected() {
    let options = PlayOptions {
        name: "   ".to_string(),
        ..PlayOptions::default()
    };
    let (ok, _, stderr) = play("", options);
    assert!(!ok);
    assert!(stderr.contains("name must not be empty"));
}
