#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use kabo_engine::errors::GameError;
use kabo_engine::game::GameSummary;
use kabo_engine::player::PlayerId;
use kabo_engine::protocol::{
    Agent, CardReveal, CardUse, Decision, DecisionKind, DrawnCard, SpyTarget, SwapTarget,
    TurnAction,
};
use kabo_engine::round::RoundOutcome;
use kabo_engine::view::TableView;

/// Everything an agent was told during a test.
#[derive(Default)]
pub struct Recorder {
    pub views: Vec<TableView>,
    pub reveals: Vec<CardReveal>,
    pub outcomes: Vec<RoundOutcome>,
    pub summaries: Vec<GameSummary>,
    pub asked: Vec<DecisionKind>,
}

impl Recorder {
    /// First view whose log line contains `needle`.
    pub fn view_after(&self, needle: &str) -> Option<&TableView> {
        self.views.iter().find(|v| v.log.contains(needle))
    }
}

/// Answers from a script, falling back to simple legal defaults.
///
/// A scripted answer is used only when its kind matches the question, so a
/// script can skip over decisions the test does not care about.
pub struct ScriptedAgent {
    name: String,
    id: PlayerId,
    script: VecDeque<Decision>,
    recorder: Rc<RefCell<Recorder>>,
    fail_on_turn: Option<GameError>,
}

impl ScriptedAgent {
    pub fn new(name: &str, id: PlayerId) -> (Self, Rc<RefCell<Recorder>>) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        (
            Self {
                name: name.to_string(),
                id,
                script: VecDeque::new(),
                recorder: recorder.clone(),
                fail_on_turn: None,
            },
            recorder,
        )
    }

    pub fn with_script(mut self, decisions: Vec<Decision>) -> Self {
        self.script = decisions.into();
        self
    }

    pub fn failing_on_turn(mut self, error: GameError) -> Self {
        self.fail_on_turn = Some(error);
        self
    }

    fn next(&mut self, kind: DecisionKind) -> Option<Decision> {
        self.recorder.borrow_mut().asked.push(kind);
        if self.script.front().map(Decision::kind) == Some(kind) {
            self.script.pop_front()
        } else {
            None
        }
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_turn_action(&mut self, _view: &TableView) -> Result<TurnAction, GameError> {
        if let Some(error) = self.fail_on_turn.clone() {
            return Err(error);
        }
        match self.next(DecisionKind::ChooseTurnAction) {
            Some(decision) => decision.into_turn_action(),
            None => Ok(TurnAction::DrawFromDeck),
        }
    }

    fn decide_card_use(&mut self, _view: &TableView, _drawn: DrawnCard) -> Result<CardUse, GameError> {
        match self.next(DecisionKind::DecideCardUse) {
            Some(decision) => decision.into_card_use(),
            None => Ok(CardUse::Discard),
        }
    }

    fn choose_exchange_cards(
        &mut self,
        _view: &TableView,
        _drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError> {
        match self.next(DecisionKind::ChooseExchangeCards) {
            Some(decision) => decision.into_exchange_cards(),
            None => Ok(vec![0]),
        }
    }

    fn choose_new_card_slot(&mut self, _view: &TableView, open: &[usize]) -> Result<usize, GameError> {
        match self.next(DecisionKind::ChooseNewCardSlot) {
            Some(decision) => decision.into_new_card_slot(),
            None => Ok(open[0]),
        }
    }

    fn choose_peek_targets(&mut self, _view: &TableView, count: usize) -> Result<Vec<usize>, GameError> {
        match self.next(DecisionKind::ChoosePeekTargets) {
            Some(decision) => decision.into_peek_targets(),
            None => Ok((0..count).collect()),
        }
    }

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError> {
        match self.next(DecisionKind::ChooseSpyTarget) {
            Some(decision) => decision.into_spy_target(),
            None => Ok(SpyTarget {
                player: (self.id + 1) % view.players.len(),
                position: 0,
            }),
        }
    }

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError> {
        match self.next(DecisionKind::ChooseSwapTargets) {
            Some(decision) => decision.into_swap_targets(),
            None => Ok(SwapTarget {
                own_position: 0,
                opponent: (self.id + 1) % view.players.len(),
                opponent_position: 0,
            }),
        }
    }

    fn observe(&mut self, view: &TableView) {
        self.recorder.borrow_mut().views.push(view.clone());
    }

    fn card_revealed(&mut self, reveal: &CardReveal) {
        self.recorder.borrow_mut().reveals.push(*reveal);
    }

    fn round_ended(&mut self, outcome: &RoundOutcome) {
        self.recorder.borrow_mut().outcomes.push(outcome.clone());
    }

    fn game_ended(&mut self, summary: &GameSummary) {
        self.recorder.borrow_mut().summaries.push(summary.clone());
    }
}

pub type Boxed = Box<dyn Agent>;

/// `count` default agents named P0, P1, ... with their recorders.
pub fn default_agents(count: usize) -> (Vec<Boxed>, Vec<Rc<RefCell<Recorder>>>) {
    let mut agents: Vec<Boxed> = Vec::new();
    let mut recorders = Vec::new();
    for id in 0..count {
        let (agent, recorder) = ScriptedAgent::new(&format!("P{id}"), id);
        agents.push(Box::new(agent));
        recorders.push(recorder);
    }
    (agents, recorders)
}
