use kabo_ai::baseline::BaselineAI;
use kabo_ai::create_ai;
use kabo_ai::random::RandomAI;
use kabo_engine::game::{Game, GameConfig};
use kabo_engine::protocol::Agent;
use kabo_engine::round::TableAction;
use kabo_engine::rules::IllegalDecisionPolicy;

fn pair(first: (&str, &str, u64), second: (&str, &str, u64)) -> Vec<Box<dyn Agent>> {
    [first, second]
        .into_iter()
        .map(|(kind, name, seed)| create_ai(kind, name, Some(seed)).expect("known kind") as Box<dyn Agent>)
        .collect()
}

fn strict(seed: u64) -> GameConfig {
    // Forfeit on the first illegal answer so one shows up in the action log.
    GameConfig {
        seed: Some(seed),
        illegal_decision: IllegalDecisionPolicy::Forfeit,
        ..GameConfig::default()
    }
}

fn assert_no_forfeits(game: &mut Game<'_>) {
    while !game.is_finished() {
        let report = game.play_round().expect("round");
        assert!(
            !report
                .outcome
                .actions
                .iter()
                .any(|a| matches!(a.action, TableAction::Forfeited { .. })),
            "computer players only answer legally"
        );
    }
}

#[test]
fn baseline_players_finish_a_game_legally() {
    let agents: Vec<Box<dyn Agent>> = (0..4)
        .map(|i| Box::new(BaselineAI::with_seed(format!("CPU{i}"), i)) as Box<dyn Agent>)
        .collect();
    let mut game = Game::new(strict(17), agents).expect("valid game");
    assert_no_forfeits(&mut game);
    let summary = game.summary().expect("finished");
    assert!(summary.rounds_played >= 2);
}

#[test]
fn random_players_finish_a_game_legally() {
    let agents: Vec<Box<dyn Agent>> = (0..3)
        .map(|i| Box::new(RandomAI::with_seed(format!("RND{i}"), i)) as Box<dyn Agent>)
        .collect();
    let mut game = Game::new(strict(23), agents).expect("valid game");
    assert_no_forfeits(&mut game);
}

#[test]
fn seeded_factory_agents_replay_identically() {
    let play = || {
        let agents = pair(("baseline", "A", 5), ("random", "B", 6));
        let mut game = Game::new(strict(8), agents).expect("valid game");
        game.play().expect("game finishes")
    };
    assert_eq!(play(), play());
}

#[test]
fn baseline_beats_random_on_average() {
    let mut baseline_total = 0u64;
    let mut random_total = 0u64;
    for seed in 0..20 {
        let agents = pair(("baseline", "B", seed), ("random", "R", seed + 100));
        let mut game = Game::new(strict(seed), agents).expect("valid game");
        for _ in 0..5 {
            if game.is_finished() {
                break;
            }
            let report = game.play_round().expect("round");
            baseline_total += u64::from(report.outcome.scores[0]);
            random_total += u64::from(report.outcome.scores[1]);
        }
    }
    assert!(baseline_total < random_total);
}
