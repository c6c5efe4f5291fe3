//! The match state machine.
//!
//! [`MatchMachine`] owns the game state, the two slots, and the rematch
//! votes. It never touches a clock, a channel, or a socket: each
//! [`MatchInput`] is answered with a list of [`Effect`]s that the caller
//! carries out in order. The room actor executes them against Tokio
//! timers and player channels; [`LocalMatch`](crate::LocalMatch) executes
//! them against a virtual clock.

use std::time::Duration;

use neonpuck_physics::{step, GameState, Side, StepEvent};
use neonpuck_protocol::{ParticipantId, ServerMessage, Snapshot, COUNTDOWN_RESUME};
use tracing::{debug, info};

use crate::{MatchConfig, MatchPhase};

/// One-shot timers a match can have pending. At most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next countdown value is due.
    Countdown,
    /// The pause after a goal is over.
    GoalPause,
    /// The room has been empty for the grace period.
    Cleanup,
}

/// Everything that can happen to a match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchInput {
    Join { participant: ParticipantId },
    Leave { participant: ParticipantId },
    Paddle { participant: ParticipantId, x: f64, y: f64 },
    Rematch { participant: ParticipantId },
    Tick,
    TimerFired(TimerKind),
}

/// Work for the caller, in the order it must be done.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// `participant` now holds `side`. Always the first effect of a join.
    Seated { participant: ParticipantId, side: Side },
    Send(ParticipantId, ServerMessage),
    /// To every seated participant.
    Broadcast(ServerMessage),
    StartTicking,
    StopTicking,
    Schedule(TimerKind, Duration),
    Cancel(TimerKind),
    /// A wall or paddle hit, for presenters that play sounds or shake the
    /// screen. Never sent over the network.
    Impact(StepEvent),
    /// The room is empty and its grace period ran out.
    Destroy,
}

/// Why an input was refused. A refused input changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("both slots are occupied")]
    Full,
    #[error("{0} is already seated")]
    AlreadySeated(ParticipantId),
    #[error("{0} is not seated")]
    NotSeated(ParticipantId),
}

pub struct MatchMachine {
    phase: MatchPhase,
    state: GameState,
    slots: [Option<ParticipantId>; 2],
    votes: Vec<ParticipantId>,
    countdown: i8,
    countdown_step: Duration,
    goal_pause: Duration,
    cleanup_grace: Duration,
}

impl MatchMachine {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            state: GameState::new(),
            slots: [None, None],
            votes: Vec::new(),
            countdown: 0,
            countdown_step: config.countdown_step,
            goal_pause: config.goal_pause,
            cleanup_grace: config.cleanup_grace,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn side_of(&self, participant: ParticipantId) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.slots[side.index()] == Some(participant))
    }

    pub fn occupant(&self, side: Side) -> Option<ParticipantId> {
        self.slots[side.index()]
    }

    pub fn occupants(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants() == 0
    }

    pub fn handle(&mut self, input: MatchInput) -> Result<Vec<Effect>, Refusal> {
        match input {
            MatchInput::Join { participant } => self.join(participant),
            MatchInput::Leave { participant } => self.leave(participant),
            MatchInput::Paddle { participant, x, y } => {
                let side = self
                    .side_of(participant)
                    .ok_or(Refusal::NotSeated(participant))?;
                self.state.paddle_mut(side).move_to(x, y);
                Ok(Vec::new())
            }
            MatchInput::Rematch { participant } => self.rematch(participant),
            MatchInput::Tick => Ok(self.tick()),
            MatchInput::TimerFired(kind) => Ok(self.timer_fired(kind)),
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    fn join(&mut self, participant: ParticipantId) -> Result<Vec<Effect>, Refusal> {
        if self.side_of(participant).is_some() {
            return Err(Refusal::AlreadySeated(participant));
        }
        let side = Side::BOTH
            .into_iter()
            .find(|side| self.slots[side.index()].is_none())
            .ok_or(Refusal::Full)?;

        let was_empty = self.is_empty();
        self.slots[side.index()] = Some(participant);
        info!(%participant, %side, phase = %self.phase, "participant seated");

        let mut effects = vec![Effect::Seated { participant, side }];
        if was_empty {
            effects.push(Effect::Cancel(TimerKind::Cleanup));
        }
        if let Some(other) = self.occupant(side.opponent()) {
            effects.push(Effect::Send(other, ServerMessage::OpponentJoined));
            // Both seats filled: a fresh match, whatever came before.
            self.state.reset_full();
            self.votes.clear();
            self.enter_countdown(&mut effects);
        }
        Ok(effects)
    }

    fn leave(&mut self, participant: ParticipantId) -> Result<Vec<Effect>, Refusal> {
        let side = self
            .side_of(participant)
            .ok_or(Refusal::NotSeated(participant))?;

        // Only a match under way has a driver or match timers to stop.
        let mut effects = Vec::new();
        if self.phase.is_active() {
            effects.extend([
                Effect::StopTicking,
                Effect::Cancel(TimerKind::Countdown),
                Effect::Cancel(TimerKind::GoalPause),
            ]);
        }
        self.slots[side.index()] = None;
        self.votes.clear();

        let next = if self.phase.is_finished() {
            MatchPhase::GameOver
        } else {
            MatchPhase::Waiting
        };
        self.set_phase(next);
        info!(%participant, %side, "participant left");

        if let Some(other) = self.occupant(side.opponent()) {
            effects.push(Effect::Send(other, ServerMessage::OpponentLeft));
        } else {
            effects.push(Effect::Schedule(TimerKind::Cleanup, self.cleanup_grace));
        }
        Ok(effects)
    }

    // -----------------------------------------------------------------------
    // Countdown, play, goals
    // -----------------------------------------------------------------------

    fn enter_countdown(&mut self, effects: &mut Vec<Effect>) {
        self.set_phase(MatchPhase::CountingDown);
        self.countdown = 3;
        effects.push(Effect::Broadcast(ServerMessage::CountdownStep {
            value: self.countdown,
        }));
        effects.push(Effect::Schedule(TimerKind::Countdown, self.countdown_step));
    }

    fn timer_fired(&mut self, kind: TimerKind) -> Vec<Effect> {
        let mut effects = Vec::new();
        match (kind, self.phase) {
            (TimerKind::Countdown, MatchPhase::CountingDown) => {
                self.countdown -= 1;
                effects.push(Effect::Broadcast(ServerMessage::CountdownStep {
                    value: self.countdown,
                }));
                if self.countdown == COUNTDOWN_RESUME {
                    self.set_phase(MatchPhase::Playing);
                    effects.push(Effect::StartTicking);
                } else {
                    effects.push(Effect::Schedule(TimerKind::Countdown, self.countdown_step));
                }
            }
            (TimerKind::GoalPause, MatchPhase::GoalPause) => {
                self.state.reset_puck();
                self.enter_countdown(&mut effects);
            }
            (TimerKind::Cleanup, _) if self.is_empty() => {
                effects.push(Effect::Destroy);
            }
            (kind, phase) => {
                debug!(?kind, %phase, "ignoring timer that no longer applies");
            }
        }
        effects
    }

    fn tick(&mut self) -> Vec<Effect> {
        if self.phase != MatchPhase::Playing {
            return Vec::new();
        }
        let event = step(&mut self.state);
        let scores = self.state.scores;
        // The scoring tick's snapshot goes out ahead of the goal, so
        // clients see the puck in the mouth before the pause.
        let mut effects = vec![Effect::Broadcast(ServerMessage::StateSnapshot(
            Snapshot::from(&self.state),
        ))];

        match event {
            StepEvent::None => {}
            StepEvent::WallHit | StepEvent::PaddleHit => effects.push(Effect::Impact(event)),
            StepEvent::Goal(scorer) => {
                info!(%scorer, ?scores, "goal");
                self.set_phase(MatchPhase::GoalPause);
                effects.extend([
                    Effect::StopTicking,
                    Effect::Broadcast(ServerMessage::Goal { scorer, scores }),
                    Effect::Schedule(TimerKind::GoalPause, self.goal_pause),
                ]);
            }
            StepEvent::Win(winner) => {
                info!(%winner, ?scores, "match won");
                self.set_phase(MatchPhase::GameOver);
                effects.extend([
                    Effect::StopTicking,
                    Effect::Broadcast(ServerMessage::GameOver { winner, scores }),
                ]);
            }
        }
        effects
    }

    // -----------------------------------------------------------------------
    // Rematch
    // -----------------------------------------------------------------------

    fn rematch(&mut self, participant: ParticipantId) -> Result<Vec<Effect>, Refusal> {
        if self.side_of(participant).is_none() {
            return Err(Refusal::NotSeated(participant));
        }
        if !self.phase.is_finished() {
            debug!(%participant, phase = %self.phase, "rematch vote outside game over");
            return Ok(Vec::new());
        }
        if !self.votes.contains(&participant) {
            self.votes.push(participant);
        }

        // An empty slot never votes: a lone participant cannot restart.
        let everyone_voted = self
            .slots
            .iter()
            .all(|slot| slot.is_some_and(|p| self.votes.contains(&p)));
        if !everyone_voted {
            self.set_phase(MatchPhase::AwaitingRematch);
            return Ok(Vec::new());
        }

        self.votes.clear();
        self.state.reset_full();
        let mut effects = vec![Effect::Broadcast(ServerMessage::RematchStart)];
        self.enter_countdown(&mut effects);
        Ok(effects)
    }

    fn set_phase(&mut self, next: MatchPhase) {
        if self.phase != next {
            debug!(from = %self.phase, to = %next, "phase change");
            self.phase = next;
        }
    }
}
