//! Tunable constants. Shared verbatim with every client that runs the
//! simulation locally, so changing any of them is a protocol change.

/// Court width in world units.
pub const COURT_WIDTH: f64 = 800.0;
/// Court height in world units.
pub const COURT_HEIGHT: f64 = 400.0;

pub const PUCK_RADIUS: f64 = 15.0;
pub const PADDLE_RADIUS: f64 = 25.0;

/// Distance from each end wall to a paddle's starting spot.
pub const PADDLE_START_INSET: f64 = 100.0;

/// Per-tick velocity multiplier.
pub const PUCK_FRICTION: f64 = 0.995;
/// Speed cap applied after a paddle impulse.
pub const PUCK_MAX_SPEED: f64 = 15.0;
/// Velocity components smaller than this snap to zero.
pub const REST_EPSILON: f64 = 0.01;

/// Height of the open goal mouth, centered on each end wall.
pub const GOAL_HEIGHT: f64 = 140.0;
pub const GOAL_TOP: f64 = (COURT_HEIGHT - GOAL_HEIGHT) / 2.0;
pub const GOAL_BOTTOM: f64 = GOAL_TOP + GOAL_HEIGHT;

/// Velocity multiplier on wall and post bounces.
pub const WALL_DAMPING: f64 = 0.8;
/// Restitution for paddle hits. Above 1, so paddles add energy.
pub const PADDLE_RESTITUTION: f64 = 1.1;

/// First side to reach this many goals wins the match.
pub const WIN_SCORE: u32 = 7;
