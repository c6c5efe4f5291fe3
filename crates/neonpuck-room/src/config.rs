//! Match timing and the match phase enum.

use std::fmt;
use std::time::Duration;

use neonpuck_tick::TickConfig;

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Timing for one room. The defaults are the production values.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub tick_rate_hz: u32,
    /// Gap between countdown values.
    pub countdown_step: Duration,
    /// How long play stays frozen after a goal before the next countdown.
    pub goal_pause: Duration,
    /// How long an empty room lives before it is destroyed.
    pub cleanup_grace: Duration,
    /// Capacity of each room actor's command channel.
    pub channel_capacity: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            countdown_step: Duration::from_millis(700),
            goal_pause: Duration::from_millis(1500),
            cleanup_grace: Duration::from_secs(30),
            channel_capacity: 64,
        }
    }
}

impl MatchConfig {
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz)
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_config().validated().tick_duration()
    }
}

// ---------------------------------------------------------------------------
// MatchPhase
// ---------------------------------------------------------------------------

/// Where a match is in its lifecycle.
///
/// ```text
/// Waiting ──second join──▶ CountingDown ──-1──▶ Playing ──goal──▶ GoalPause
///                              ▲                   │                 │
///                              └───────────────────┼─────────────────┘
///                                                  └──win──▶ GameOver ──vote──▶ AwaitingRematch
///                                                                                  │
///                              CountingDown ◀────────────── both voted ────────────┘
/// ```
///
/// A departure collapses the active phases to `Waiting` and the finished
/// phases to `GameOver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Waiting,
    CountingDown,
    Playing,
    GoalPause,
    GameOver,
    AwaitingRematch,
}

impl MatchPhase {
    /// Phases in which a match is under way.
    pub fn is_active(self) -> bool {
        matches!(self, Self::CountingDown | Self::Playing | Self::GoalPause)
    }

    /// Phases that accept rematch votes.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::GameOver | Self::AwaitingRematch)
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::CountingDown => "counting-down",
            Self::Playing => "playing",
            Self::GoalPause => "goal-pause",
            Self::GameOver => "game-over",
            Self::AwaitingRematch => "awaiting-rematch",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_config_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.countdown_step, Duration::from_millis(700));
        assert_eq!(config.goal_pause, Duration::from_millis(1500));
        assert_eq!(config.cleanup_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_match_phase_classes_are_disjoint() {
        use MatchPhase::*;
        for phase in [Waiting, CountingDown, Playing, GoalPause, GameOver, AwaitingRematch] {
            assert!(!(phase.is_active() && phase.is_finished()), "{phase}");
        }
        assert!(!Waiting.is_active() && !Waiting.is_finished());
    }

    #[test]
    fn test_match_phase_display() {
        assert_eq!(MatchPhase::AwaitingRematch.to_string(), "awaiting-rematch");
        assert_eq!(MatchPhase::GoalPause.to_string(), "goal-pause");
    }
}
