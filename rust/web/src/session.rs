//! One running game per room, driven on its own thread.
//!
//! The game thread owns the engine state outright. Front ends only ever see
//! redacted snapshots through the event bus and answer through
//! [`SeatHandle`](crate::bridge::SeatHandle)s.

use crate::ai::create_ai;
use crate::bridge::SeatHandle;
use crate::events::{Audience, EventBus, RoomEvent, SeatInfo};
use crate::room::RoomCode;
use crate::settings::UnresponsivePolicy;
use kabo_engine::errors::GameError;
use kabo_engine::game::{Game, GameConfig, GameSummary};
use kabo_engine::protocol::Agent;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Running { rounds_played: u32 },
    Finished { summary: GameSummary },
    Terminated { reason: String },
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Running { .. })
    }
}

/// Everything the game thread needs, gathered by the room before start.
pub struct SessionPlan {
    pub room: RoomCode,
    pub config: GameConfig,
    pub agents: Vec<Box<dyn Agent + Send>>,
    pub seats: Vec<SeatInfo>,
    /// Bridge handles by seat, `None` for computer seats.
    pub handles: Vec<Option<SeatHandle>>,
    pub policy: UnresponsivePolicy,
    pub ai_kind: String,
}

#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    status: Arc<Mutex<SessionStatus>>,
    cancel: Arc<AtomicBool>,
    handles: Vec<Option<SeatHandle>>,
    thread: Option<JoinHandle<()>>,
}

impl GameSession {
    pub fn spawn(plan: SessionPlan, bus: EventBus) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let status = Arc::new(Mutex::new(SessionStatus::Running { rounds_played: 0 }));
        let cancel = Arc::new(AtomicBool::new(false));
        let handles = plan.handles.clone();

        let runner = Runner {
            id,
            plan,
            bus,
            status: Arc::clone(&status),
            cancel: Arc::clone(&cancel),
        };
        let name = format!("kabo-room-{}", runner.plan.room);
        let thread = std::thread::Builder::new()
            .name(name)
            .spawn(move || runner.run())?;

        Ok(Self {
            id,
            status,
            cancel,
            handles,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Asks the game thread to stop. Any seat it is waiting on is disconnected
    /// so the wait ends promptly.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        for handle in self.handles.iter().flatten() {
            handle.disconnect();
        }
    }

    /// Blocks until the game thread exits.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(game_id = %self.id, "game thread panicked");
            }
        }
    }
}

struct Runner {
    id: Uuid,
    plan: SessionPlan,
    bus: EventBus,
    status: Arc<Mutex<SessionStatus>>,
    cancel: Arc<AtomicBool>,
}

impl Runner {
    fn set_status(&self, status: SessionStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    fn publish(&self, event: RoomEvent) {
        self.bus.publish(&self.plan.room, Audience::Everyone, event);
    }

    fn terminate(&self, reason: String) {
        tracing::warn!(room = %self.plan.room, game_id = %self.id, %reason, "game terminated");
        self.publish(RoomEvent::RoomClosed {
            room: self.plan.room.clone(),
            reason: reason.clone(),
        });
        self.set_status(SessionStatus::Terminated { reason });
    }

    fn run(mut self) {
        let room = self.plan.room.clone();
        let agents: Vec<Box<dyn Agent + Send>> = std::mem::take(&mut self.plan.agents);
        let agents: Vec<Box<dyn Agent>> = agents.into_iter().map(|a| a as Box<dyn Agent>).collect();
        let mut game = match Game::new(self.plan.config, agents) {
            Ok(game) => game,
            Err(e) => {
                self.terminate(format!("game could not start: {e}"));
                return;
            }
        };

        tracing::info!(room = %room, game_id = %self.id, seats = self.plan.seats.len(), "game started");
        self.publish(RoomEvent::GameStarted {
            room: room.clone(),
            game_id: self.id,
            seats: self.plan.seats.clone(),
        });

        loop {
            if self.cancel.load(Ordering::Acquire) {
                self.terminate("room closed".to_string());
                return;
            }
            match game.play_round() {
                Ok(report) => {
                    self.set_status(SessionStatus::Running {
                        rounds_played: game.rounds_played(),
                    });
                    self.publish(RoomEvent::RoundEnded {
                        room: room.clone(),
                        outcome: report.outcome,
                        totals: report.totals,
                        reprieved: report.reprieved,
                    });
                    if let Some(summary) = game.summary() {
                        tracing::info!(room = %room, game_id = %self.id, rounds = summary.rounds_played, "game finished");
                        self.publish(RoomEvent::GameEnded {
                            room: room.clone(),
                            summary: summary.clone(),
                        });
                        self.set_status(SessionStatus::Finished {
                            summary: summary.clone(),
                        });
                        return;
                    }
                }
                Err(GameError::AgentUnresponsive { player, reason }) => {
                    if self.cancel.load(Ordering::Acquire) {
                        self.terminate("room closed".to_string());
                        return;
                    }
                    let name = self
                        .plan
                        .seats
                        .get(player)
                        .map(|s| s.name.clone())
                        .unwrap_or_default();
                    match self.plan.policy {
                        UnresponsivePolicy::Terminate => {
                            self.terminate(format!("{name} is unresponsive ({reason})"));
                            return;
                        }
                        UnresponsivePolicy::SubstituteAi => {
                            let seed = self.plan.config.seed.map(|s| s.wrapping_add(player as u64));
                            let ai = create_ai(&self.plan.ai_kind, &name, seed);
                            if let Err(e) = game.replace_agent(player, ai) {
                                self.terminate(format!("seat {player} could not be replaced: {e}"));
                                return;
                            }
                            if let Some(Some(handle)) = self.plan.handles.get(player) {
                                handle.mark_replaced();
                            }
                            tracing::info!(room = %room, player, %reason, "seat handed to a computer player");
                            self.publish(RoomEvent::AgentReplaced {
                                room: room.clone(),
                                player,
                                name,
                                reason,
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(room = %room, game_id = %self.id, error = %e, "round failed");
                    self.terminate(e.to_string());
                    return;
                }
            }
        }
    }
}
