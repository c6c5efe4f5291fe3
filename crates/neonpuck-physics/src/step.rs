//! The fixed-timestep physics step.
//!
//! One call to [`step`] is one tick. The order of operations matters and
//! is part of the protocol: both the server and a single-device client run
//! this exact sequence so their simulations agree.
//!
//! ```text
//! clamp paddles → paddle/puck impulses → integrate + friction
//!     → walls and goal posts → goal check → settle paddle history
//! ```

use crate::consts::{
    COURT_HEIGHT, COURT_WIDTH, GOAL_BOTTOM, GOAL_TOP, PADDLE_RADIUS,
    PADDLE_RESTITUTION, PUCK_FRICTION, PUCK_MAX_SPEED, PUCK_RADIUS,
    REST_EPSILON, WALL_DAMPING, WIN_SCORE,
};
use crate::{GameState, Paddle, Puck, Side};

/// What happened during a tick.
///
/// Exactly one event is reported per tick, by priority:
/// `Goal`/`Win` > `PaddleHit` > `WallHit` > `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Nothing notable.
    None,
    /// The puck touched a wall or a goal post.
    WallHit,
    /// The puck touched a paddle.
    PaddleHit,
    /// `Side` scored; the match continues.
    Goal(Side),
    /// `Side` scored its winning point.
    Win(Side),
}

impl StepEvent {
    /// The scoring side for `Goal` and `Win`.
    pub fn scorer(self) -> Option<Side> {
        match self {
            Self::Goal(side) | Self::Win(side) => Some(side),
            _ => None,
        }
    }
}

/// Advances `state` by one tick and reports what happened.
///
/// Deterministic: the same input state always produces the same output
/// state and event.
pub fn step(state: &mut GameState) -> StepEvent {
    for paddle in &mut state.paddles {
        paddle.clamp();
    }

    let mut paddle_hit = false;
    for paddle in &state.paddles {
        paddle_hit |= resolve_paddle_contact(paddle, &mut state.puck);
    }

    integrate(&mut state.puck);
    let wall_hit = resolve_walls(&mut state.puck);
    let goal = detect_goal(&state.puck);

    // After collisions, so next tick's impulse sees this tick's motion.
    for paddle in &mut state.paddles {
        paddle.settle();
    }

    if let Some(scorer) = goal {
        let tally = &mut state.scores[scorer.index()];
        *tally += 1;
        state.last_goal_by = Some(scorer);
        return if *tally == WIN_SCORE {
            StepEvent::Win(scorer)
        } else {
            StepEvent::Goal(scorer)
        };
    }

    if paddle_hit {
        StepEvent::PaddleHit
    } else if wall_hit {
        StepEvent::WallHit
    } else {
        StepEvent::None
    }
}

/// Circle-circle contact between one paddle and the puck.
///
/// Returns `true` on contact, whether or not an impulse was applied.
fn resolve_paddle_contact(paddle: &Paddle, puck: &mut Puck) -> bool {
    let dx = puck.x - paddle.x;
    let dy = puck.y - paddle.y;
    let dist = dx.hypot(dy);
    let min_dist = PADDLE_RADIUS + PUCK_RADIUS;
    if dist >= min_dist {
        return false;
    }

    // The contact normal points from the paddle center to the puck center.
    // Concentric circles have no such direction: push toward the
    // opponent's half, the way the paddle faces.
    let (nx, ny) = if dist > 0.0 {
        (dx / dist, dy / dist)
    } else {
        match paddle.side {
            Side::Left => (1.0, 0.0),
            Side::Right => (-1.0, 0.0),
        }
    };

    // Separate first so the puck never starts the next tick inside a paddle.
    let overlap = min_dist - dist;
    puck.x += nx * overlap;
    puck.y += ny * overlap;

    let (pvx, pvy) = paddle.velocity();
    let along_normal = (puck.vx - pvx) * nx + (puck.vy - pvy) * ny;
    if along_normal > 0.0 {
        // Already separating.
        return true;
    }

    // Restitution above 1 adds energy on every hit; the cap below bounds it.
    puck.vx -= (1.0 + PADDLE_RESTITUTION) * along_normal * nx;
    puck.vy -= (1.0 + PADDLE_RESTITUTION) * along_normal * ny;

    let speed = puck.speed();
    if speed > PUCK_MAX_SPEED {
        puck.vx = puck.vx / speed * PUCK_MAX_SPEED;
        puck.vy = puck.vy / speed * PUCK_MAX_SPEED;
    }
    true
}

fn integrate(puck: &mut Puck) {
    puck.x += puck.vx;
    puck.y += puck.vy;
    puck.vx *= PUCK_FRICTION;
    puck.vy *= PUCK_FRICTION;
    if puck.vx.abs() < REST_EPSILON {
        puck.vx = 0.0;
    }
    if puck.vy.abs() < REST_EPSILON {
        puck.vy = 0.0;
    }
}

fn in_goal_band(y: f64) -> bool {
    (GOAL_TOP..=GOAL_BOTTOM).contains(&y)
}

/// Goal-mouth corners, treated as zero-radius posts.
const GOAL_POSTS: [(f64, f64); 4] = [
    (0.0, GOAL_TOP),
    (0.0, GOAL_BOTTOM),
    (COURT_WIDTH, GOAL_TOP),
    (COURT_WIDTH, GOAL_BOTTOM),
];

/// Bounces the puck off walls and goal posts. Returns `true` on any contact.
fn resolve_walls(puck: &mut Puck) -> bool {
    let r = PUCK_RADIUS;
    let mut hit = false;

    if puck.y - r <= 0.0 {
        puck.y = r;
        puck.vy = -puck.vy * WALL_DAMPING;
        hit = true;
    }
    if puck.y + r >= COURT_HEIGHT {
        puck.y = COURT_HEIGHT - r;
        puck.vy = -puck.vy * WALL_DAMPING;
        hit = true;
    }
    if puck.x - r <= 0.0 && !in_goal_band(puck.y) {
        puck.x = r;
        puck.vx = -puck.vx * WALL_DAMPING;
        hit = true;
    }
    if puck.x + r >= COURT_WIDTH && !in_goal_band(puck.y) {
        puck.x = COURT_WIDTH - r;
        puck.vx = -puck.vx * WALL_DAMPING;
        hit = true;
    }

    for (post_x, post_y) in GOAL_POSTS {
        let dx = puck.x - post_x;
        let dy = puck.y - post_y;
        let dist = dx.hypot(dy);
        if dist >= r {
            continue;
        }
        // A puck centered exactly on a post goes back into the court.
        let (nx, ny) = if dist > 0.0 {
            (dx / dist, dy / dist)
        } else if post_x == 0.0 {
            (1.0, 0.0)
        } else {
            (-1.0, 0.0)
        };
        puck.x = post_x + nx * r;
        puck.y = post_y + ny * r;
        let dot = puck.vx * nx + puck.vy * ny;
        puck.vx = (puck.vx - 2.0 * dot * nx) * WALL_DAMPING;
        puck.vy = (puck.vy - 2.0 * dot * ny) * WALL_DAMPING;
        hit = true;
    }

    hit
}

/// The side credited with a goal, if the puck has reached a goal mouth.
fn detect_goal(puck: &Puck) -> Option<Side> {
    if !in_goal_band(puck.y) {
        return None;
    }
    if puck.x + PUCK_RADIUS >= COURT_WIDTH {
        Some(Side::Left)
    } else if puck.x - PUCK_RADIUS <= 0.0 {
        Some(Side::Right)
    } else {
        None
    }
}
