//! Game state: puck, paddles, scores.
//!
//! Everything here is plain data. The only code that moves the puck is
//! [`step`](crate::step) and the two reset operations below.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{COURT_HEIGHT, COURT_WIDTH, PADDLE_RADIUS, PADDLE_START_INSET};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which half of the court a paddle (and its owner) defends.
///
/// On the wire a side is the number `1` (left) or `2` (right), matching the
/// player numbers shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, in slot order.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Slot index into `GameState::paddles` and `GameState::scores`.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Player number: 1 for left, 2 for right.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side.number()
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Left),
            2 => Ok(Self::Right),
            other => Err(format!("side must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

// ---------------------------------------------------------------------------
// Puck
// ---------------------------------------------------------------------------

/// The puck. Radius is fixed at [`PUCK_RADIUS`](crate::consts::PUCK_RADIUS).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Puck {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Puck {
    /// A motionless puck at center court.
    pub fn centered() -> Self {
        Self {
            x: COURT_WIDTH / 2.0,
            y: COURT_HEIGHT / 2.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

// ---------------------------------------------------------------------------
// Paddle
// ---------------------------------------------------------------------------

/// A paddle. Radius is fixed at [`PADDLE_RADIUS`].
///
/// `prev_x`/`prev_y` hold the position at the end of the previous tick.
/// Input handling only writes `x`/`y`; the physics step owns the previous
/// position so paddle velocity reflects exactly one tick of motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub x: f64,
    pub y: f64,
    pub prev_x: f64,
    pub prev_y: f64,
    pub side: Side,
}

impl Paddle {
    /// A paddle resting at its starting spot, with no motion history.
    pub fn at_start(side: Side) -> Self {
        let x = match side {
            Side::Left => PADDLE_START_INSET,
            Side::Right => COURT_WIDTH - PADDLE_START_INSET,
        };
        let y = COURT_HEIGHT / 2.0;
        Self {
            x,
            y,
            prev_x: x,
            prev_y: y,
            side,
        }
    }

    /// Moves the paddle toward an input position, clamped to its half.
    ///
    /// Non-finite coordinates leave that axis where it was; everything else
    /// is trusted only after clamping.
    pub fn move_to(&mut self, x: f64, y: f64) {
        if x.is_finite() {
            self.x = x;
        }
        if y.is_finite() {
            self.y = y;
        }
        self.clamp();
    }

    /// Clamps the paddle inside its own half of the court.
    ///
    /// Idempotent: clamping an already-clamped paddle changes nothing.
    pub fn clamp(&mut self) {
        let r = PADDLE_RADIUS;
        let half = COURT_WIDTH / 2.0;
        self.y = self.y.clamp(r, COURT_HEIGHT - r);
        self.x = match self.side {
            Side::Left => self.x.clamp(r, half - r),
            Side::Right => self.x.clamp(half + r, COURT_WIDTH - r),
        };
    }

    /// Displacement since the previous tick.
    pub fn velocity(&self) -> (f64, f64) {
        (self.x - self.prev_x, self.y - self.prev_y)
    }

    pub(crate) fn settle(&mut self) {
        self.prev_x = self.x;
        self.prev_y = self.y;
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Full simulation state for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub puck: Puck,
    /// Indexed by [`Side::index`].
    pub paddles: [Paddle; 2],
    /// Indexed by [`Side::index`]. Never decreases within a match.
    pub scores: [u32; 2],
    /// Who scored most recently; `None` until the first goal of a match.
    pub last_goal_by: Option<Side>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            puck: Puck::centered(),
            paddles: [Paddle::at_start(Side::Left), Paddle::at_start(Side::Right)],
            scores: [0, 0],
            last_goal_by: None,
        }
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        &self.paddles[side.index()]
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        &mut self.paddles[side.index()]
    }

    pub fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    /// Recenters the puck with zero velocity. Paddles and scores stay.
    ///
    /// Used between points of the same match.
    pub fn reset_puck(&mut self) {
        self.puck = Puck::centered();
    }

    /// Returns to the start-of-match layout: puck centered, scores zeroed,
    /// `last_goal_by` cleared, paddles home with no motion history.
    pub fn reset_full(&mut self) {
        self.reset_puck();
        self.scores = [0, 0];
        self.last_goal_by = None;
        for side in Side::BOTH {
            self.paddles[side.index()] = Paddle::at_start(side);
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
