//! Single-device play: both paddles on one screen, no network.
//!
//! [`LocalMatch`] runs the same [`MatchMachine`] as a networked room, but
//! time only moves when the presenter calls [`advance`](LocalMatch::advance),
//! typically once per rendered frame.

use std::time::Duration;

use neonpuck_physics::{GameState, Side, StepEvent};
use neonpuck_protocol::{ParticipantId, ServerMessage};
use tracing::debug;

use crate::machine::{Effect, MatchInput, MatchMachine, TimerKind};
use crate::{MatchConfig, MatchPhase};

const LEFT: ParticipantId = ParticipantId(1);
const RIGHT: ParticipantId = ParticipantId(2);

/// Something the presenter should show or play.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    Message(ServerMessage),
    Impact(StepEvent),
}

pub struct LocalMatch {
    machine: MatchMachine,
    now: Duration,
    tick_duration: Duration,
    next_tick: Option<Duration>,
    timers: Vec<(TimerKind, Duration)>,
    outbox: Vec<LocalEvent>,
}

impl LocalMatch {
    /// Seats both local players; the first countdown starts immediately.
    pub fn new(config: &MatchConfig) -> Self {
        let mut local = Self {
            machine: MatchMachine::new(config),
            now: Duration::ZERO,
            tick_duration: config.tick_duration(),
            next_tick: None,
            timers: Vec::new(),
            outbox: Vec::new(),
        };
        for participant in [LEFT, RIGHT] {
            local.input(MatchInput::Join { participant });
        }
        local
    }

    /// Moves the virtual clock forward by `dt`, firing every timer and
    /// tick that falls due on the way, in time order.
    ///
    /// Returns everything that happened since the previous call.
    pub fn advance(&mut self, dt: Duration) -> Vec<LocalEvent> {
        let until = self.now + dt;
        while let Some((at, due)) = self.next_due(until) {
            self.now = at;
            match due {
                Due::Timer(kind) => {
                    self.timers.retain(|(k, _)| *k != kind);
                    self.input(MatchInput::TimerFired(kind));
                }
                Due::Tick => {
                    self.next_tick = Some(at + self.tick_duration);
                    self.input(MatchInput::Tick);
                }
            }
        }
        self.now = until;
        std::mem::take(&mut self.outbox)
    }

    /// Direct paddle input; clamped like remote input.
    pub fn set_paddle(&mut self, side: Side, x: f64, y: f64) {
        let participant = Self::participant(side);
        self.input(MatchInput::Paddle { participant, x, y });
    }

    /// Starts the next match. Only has an effect once the current one is
    /// over.
    pub fn rematch(&mut self) {
        for participant in [LEFT, RIGHT] {
            self.input(MatchInput::Rematch { participant });
        }
    }

    pub fn state(&self) -> &GameState {
        self.machine.state()
    }

    pub fn phase(&self) -> MatchPhase {
        self.machine.phase()
    }

    /// Virtual time since the match was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    fn participant(side: Side) -> ParticipantId {
        match side {
            Side::Left => LEFT,
            Side::Right => RIGHT,
        }
    }

    /// The earliest timer or tick at or before `until`. Timers win ties.
    fn next_due(&self, until: Duration) -> Option<(Duration, Due)> {
        let timer = self
            .timers
            .iter()
            .min_by_key(|(_, at)| *at)
            .map(|&(kind, at)| (at, Due::Timer(kind)));
        let tick = self.next_tick.map(|at| (at, Due::Tick));
        let next = match (timer, tick) {
            (Some(t), Some(k)) => Some(if k.0 < t.0 { k } else { t }),
            (t, k) => t.or(k),
        };
        next.filter(|(at, _)| *at <= until)
    }

    fn input(&mut self, input: MatchInput) {
        let effects = match self.machine.handle(input) {
            Ok(effects) => effects,
            Err(refusal) => {
                debug!(%refusal, "local input refused");
                return;
            }
        };
        for effect in effects {
            match effect {
                Effect::Send(_, msg) | Effect::Broadcast(msg) => {
                    self.outbox.push(LocalEvent::Message(msg));
                }
                Effect::Impact(event) => self.outbox.push(LocalEvent::Impact(event)),
                Effect::StartTicking => {
                    self.next_tick.get_or_insert(self.now + self.tick_duration);
                }
                Effect::StopTicking => self.next_tick = None,
                Effect::Schedule(kind, after) => {
                    self.timers.retain(|(k, _)| *k != kind);
                    self.timers.push((kind, self.now + after));
                }
                Effect::Cancel(kind) => self.timers.retain(|(k, _)| *k != kind),
                // Both seats are permanent; nobody to greet, nothing to destroy.
                Effect::Seated { .. } | Effect::Destroy => {}
            }
        }
    }

    #[cfg(test)]
    fn machine_mut(&mut self) -> &mut MatchMachine {
        &mut self.machine
    }
}

#[derive(Debug, Clone, Copy)]
enum Due {
    Timer(TimerKind),
    Tick,
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonpuck_physics::consts::{COURT_HEIGHT, COURT_WIDTH, WIN_SCORE};

    fn countdown_values(events: &[LocalEvent]) -> Vec<i8> {
        events
            .iter()
            .filter_map(|e| match e {
                LocalEvent::Message(ServerMessage::CountdownStep { value }) => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn snapshots(events: &[LocalEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, LocalEvent::Message(ServerMessage::StateSnapshot(_))))
            .count()
    }

    fn local_playing() -> LocalMatch {
        let mut local = LocalMatch::new(&MatchConfig::default());
        local.advance(Duration::from_millis(2800));
        assert_eq!(local.phase(), MatchPhase::Playing);
        local
    }

    fn aim_at_right_goal(local: &mut LocalMatch) {
        let puck = &mut local.machine_mut().state_mut().puck;
        puck.x = COURT_WIDTH - 2.0;
        puck.y = COURT_HEIGHT / 2.0;
        puck.vx = 10.0;
        puck.vy = 0.0;
    }

    #[test]
    fn test_new_local_match_counts_down_on_virtual_time() {
        let mut local = LocalMatch::new(&MatchConfig::default());
        assert_eq!(local.phase(), MatchPhase::CountingDown);

        let first = local.advance(Duration::ZERO);
        assert_eq!(countdown_values(&first), vec![3]);

        let later = local.advance(Duration::from_millis(2100));
        assert_eq!(countdown_values(&later), vec![2, 1, 0]);
        assert_eq!(local.phase(), MatchPhase::CountingDown);

        let resume = local.advance(Duration::from_millis(700));
        assert_eq!(countdown_values(&resume), vec![-1]);
        assert_eq!(local.phase(), MatchPhase::Playing);
        assert_eq!(snapshots(&resume), 0);
    }

    #[test]
    fn test_one_second_of_play_is_sixty_ticks() {
        let mut local = local_playing();
        // The puck starts at rest, so nothing interrupts play.
        let events = local.advance(Duration::from_secs(1));
        let n = snapshots(&events);
        assert!((59..=60).contains(&n), "got {n} snapshots");
    }

    #[test]
    fn test_goal_pauses_then_counts_down_again() {
        let mut local = local_playing();
        aim_at_right_goal(&mut local);

        let events = local.advance(Duration::from_millis(20));
        assert!(events.contains(&LocalEvent::Message(ServerMessage::Goal {
            scorer: Side::Left,
            scores: [1, 0],
        })));
        assert_eq!(local.phase(), MatchPhase::GoalPause);

        let paused = local.advance(Duration::from_millis(1000));
        assert_eq!(snapshots(&paused), 0, "no ticks during the goal pause");

        let resumed = local.advance(Duration::from_millis(500));
        assert_eq!(countdown_values(&resumed), vec![3]);
        assert_eq!(local.state().puck.x, COURT_WIDTH / 2.0);
    }

    #[test]
    fn test_paddle_hit_surfaces_as_impact() {
        let mut local = local_playing();
        {
            let puck = &mut local.machine_mut().state_mut().puck;
            puck.x = 195.0;
            puck.y = 200.0;
            puck.vx = -3.0;
        }
        local.set_paddle(Side::Left, 160.0, 200.0);

        let events = local.advance(Duration::from_millis(20));
        assert!(events.contains(&LocalEvent::Impact(StepEvent::PaddleHit)));
    }

    #[test]
    fn test_rematch_after_win() {
        let mut local = local_playing();
        local.machine_mut().state_mut().scores = [WIN_SCORE - 1, 2];
        aim_at_right_goal(&mut local);
        local.advance(Duration::from_millis(20));
        assert_eq!(local.phase(), MatchPhase::GameOver);

        // No ticks, no timers: time passing changes nothing.
        assert!(local.advance(Duration::from_secs(10)).is_empty());

        local.rematch();
        let events = local.advance(Duration::ZERO);
        assert_eq!(
            events,
            vec![
                LocalEvent::Message(ServerMessage::RematchStart),
                LocalEvent::Message(ServerMessage::CountdownStep { value: 3 }),
            ]
        );
        assert_eq!(local.state().scores, [0, 0]);
    }
}
