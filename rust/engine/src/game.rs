use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::deck::Deck;
use crate::errors::GameError;
use crate::player::{PlayerId, PlayerRecord, Seat};
use crate::protocol::Agent;
use crate::round::{Round, RoundOutcome};
use crate::rules::{self, IllegalDecisionPolicy, Rules};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rules: Rules,
    pub illegal_decision: IllegalDecisionPolicy,
    /// Seed for every deal of the game. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// Result of applying the target rule after a round.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TargetCheck {
    pub reprieved: Vec<PlayerId>,
    pub game_over: bool,
}

/// Resets a player who hits the target for the first time; a second hit ends the game.
pub fn apply_target_rule(players: &mut [PlayerRecord], rules: &Rules) -> TargetCheck {
    let mut check = TargetCheck::default();
    for player in players.iter_mut() {
        if player.score < rules.target_point_value {
            continue;
        }
        if player.reprieve_used {
            check.game_over = true;
        } else {
            player.score = rules.point_value_after_hitting_target;
            player.reprieve_used = true;
            check.reprieved.push(player.id);
        }
    }
    check
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Seed the round's deck was shuffled with.
    pub seed: u64,
    pub outcome: RoundOutcome,
    /// Cumulative scores after the target rule.
    pub totals: Vec<u32>,
    pub reprieved: Vec<PlayerId>,
    pub game_over: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub final_scores: Vec<PlayerRecord>,
    /// Lowest total. Ties are all listed.
    pub winners: Vec<PlayerId>,
    /// Highest total. Ties are all listed.
    pub losers: Vec<PlayerId>,
    pub rounds_played: u32,
}

impl GameSummary {
    fn from_players(players: &[PlayerRecord], rounds_played: u32) -> Self {
        let max = players.iter().map(|p| p.score).max().unwrap_or(0);
        let min = players.iter().map(|p| p.score).min().unwrap_or(0);
        Self {
            final_scores: players.to_vec(),
            winners: players
                .iter()
                .filter(|p| p.score == min)
                .map(|p| p.id)
                .collect(),
            losers: players
                .iter()
                .filter(|p| p.score == max)
                .map(|p| p.id)
                .collect(),
            rounds_played,
        }
    }
}

/// Sequences rounds over a fixed list of agents and keeps the cumulative score.
pub struct Game<'a> {
    config: GameConfig,
    players: Vec<PlayerRecord>,
    agents: Vec<Box<dyn Agent + 'a>>,
    rng: ChaCha20Rng,
    rounds_played: u32,
    summary: Option<GameSummary>,
}

impl<'a> Game<'a> {
    pub fn new(config: GameConfig, agents: Vec<Box<dyn Agent + 'a>>) -> Result<Self, GameError> {
        rules::validate_player_count(agents.len())?;
        config.rules.validate()?;
        let players = agents
            .iter()
            .enumerate()
            .map(|(id, agent)| PlayerRecord::new(id, agent.name()))
            .collect();
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_os_rng(),
        };
        Ok(Self {
            config,
            players,
            agents,
            rng,
            rounds_played: 0,
            summary: None,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn is_finished(&self) -> bool {
        self.summary.is_some()
    }

    pub fn summary(&self) -> Option<&GameSummary> {
        self.summary.as_ref()
    }

    /// Puts a new agent in a seat and returns the old one. Name and score stay.
    pub fn replace_agent(
        &mut self,
        player: PlayerId,
        agent: Box<dyn Agent + 'a>,
    ) -> Result<Box<dyn Agent + 'a>, GameError> {
        let slot = self
            .agents
            .get_mut(player)
            .ok_or(GameError::UnknownPlayer(player))?;
        Ok(std::mem::replace(slot, agent))
    }

    /// Plays one round with a freshly shuffled deck and applies its scores.
    /// Every round opens with the first seat.
    ///
    /// If the round fails (for example an agent stops answering) nothing is
    /// scored and the next call replays the same round number.
    pub fn play_round(&mut self) -> Result<RoundReport, GameError> {
        if self.summary.is_some() {
            return Err(GameError::GameFinished);
        }
        let number = self.rounds_played + 1;
        let seed: u64 = self.rng.random();
        let mut deck = Deck::new_with_seed(seed);
        deck.shuffle();
        let seats = self.players.iter().map(Seat::from).collect();
        let mut round = Round::new(
            number,
            seats,
            0,
            deck,
            self.config.rules,
            self.config.illegal_decision,
        )?;
        let outcome = round.play(&mut self.agents)?;

        self.rounds_played = number;
        for (player, score) in self.players.iter_mut().zip(&outcome.scores) {
            player.score += score;
        }
        let check = apply_target_rule(&mut self.players, &self.config.rules);

        let totals: Vec<u32> = self.players.iter().map(|p| p.score).collect();
        info!(
            round = number,
            totals = ?totals,
            reprieved = ?check.reprieved,
            game_over = check.game_over,
            "scores updated"
        );

        if check.game_over {
            let summary = GameSummary::from_players(&self.players, self.rounds_played);
            info!(losers = ?summary.losers, winners = ?summary.winners, "game over");
            for agent in self.agents.iter_mut() {
                agent.game_ended(&summary);
            }
            self.summary = Some(summary);
        }

        Ok(RoundReport {
            seed,
            outcome,
            totals,
            reprieved: check.reprieved,
            game_over: check.game_over,
        })
    }

    /// Plays rounds until the game ends.
    pub fn play(&mut self) -> Result<GameSummary, GameError> {
        loop {
            if let Some(summary) = &self.summary {
                return Ok(summary.clone());
            }
            self.play_round()?;
        }
    }
}

impl std::fmt::Debug for Game<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("config", &self.config)
            .field("players", &self.players)
            .field("rounds_played", &self.rounds_played)
            .field("finished", &self.summary.is_some())
            .finish()
    }
}
