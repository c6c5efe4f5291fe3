//! Headless single-device match: two scripted paddles on one court.
//!
//! ```text
//! cargo run -p local-match -- 3          # play three matches
//! RUST_LOG=debug cargo run -p local-match
//! ```

use std::time::Duration;

use neonpuck_physics::consts::{COURT_HEIGHT, COURT_WIDTH, PADDLE_RADIUS, PADDLE_START_INSET};
use neonpuck_physics::{GameState, Side, StepEvent};
use neonpuck_protocol::{ServerMessage, COUNTDOWN_GO};
use neonpuck_room::{LocalEvent, LocalMatch, MatchConfig, MatchPhase};
use tracing::{debug, info, trace, warn};

/// One rendered frame at 60 fps.
const FRAME: Duration = Duration::from_micros(16_667);
/// How far a scripted paddle may move per frame.
const PADDLE_SPEED: f64 = 7.0;
/// Matches longer than this are abandoned (the puck can wedge in a corner).
const MAX_MATCH_TIME: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// Scripted paddles
// ---------------------------------------------------------------------------

/// Where `side` wants its paddle this frame: behind the puck when it is on
/// its half, home otherwise.
fn target(state: &GameState, side: Side) -> (f64, f64) {
    let puck = &state.puck;
    let mid = COURT_WIDTH / 2.0;
    let (own_half, behind, home_x) = match side {
        Side::Left => (puck.x <= mid, -PADDLE_RADIUS, PADDLE_START_INSET),
        Side::Right => (puck.x >= mid, PADDLE_RADIUS, COURT_WIDTH - PADDLE_START_INSET),
    };
    if own_half {
        (puck.x + behind, puck.y)
    } else {
        (home_x, (puck.y + COURT_HEIGHT / 2.0) / 2.0)
    }
}

fn approach(from: (f64, f64), to: (f64, f64)) -> (f64, f64) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let dist = dx.hypot(dy);
    if dist <= PADDLE_SPEED {
        return to;
    }
    let scale = PADDLE_SPEED / dist;
    (from.0 + dx * scale, from.1 + dy * scale)
}

fn drive_paddles(local: &mut LocalMatch) {
    for side in [Side::Left, Side::Right] {
        let paddle = local.state().paddle(side);
        let (x, y) = approach((paddle.x, paddle.y), target(local.state(), side));
        local.set_paddle(side, x, y);
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Logs one event; returns the winner when the match just ended.
fn present(event: &LocalEvent) -> Option<Side> {
    match event {
        LocalEvent::Message(ServerMessage::CountdownStep { value: COUNTDOWN_GO }) => info!("go"),
        LocalEvent::Message(ServerMessage::CountdownStep { value }) => {
            debug!(value, "countdown");
        }
        LocalEvent::Message(ServerMessage::Goal { scorer, scores }) => {
            info!(%scorer, left = scores[0], right = scores[1], "goal");
        }
        LocalEvent::Message(ServerMessage::GameOver { winner, scores }) => {
            info!(%winner, left = scores[0], right = scores[1], "game over");
            return Some(*winner);
        }
        LocalEvent::Message(ServerMessage::RematchStart) => info!("rematch"),
        LocalEvent::Message(ServerMessage::StateSnapshot(_)) => {}
        LocalEvent::Message(other) => debug!(message = ?other, "event"),
        LocalEvent::Impact(StepEvent::WallHit) => trace!("wall"),
        LocalEvent::Impact(StepEvent::PaddleHit) => trace!("paddle"),
        LocalEvent::Impact(other) => trace!(event = ?other, "impact"),
    }
    None
}

fn play_one(local: &mut LocalMatch) -> Option<Side> {
    let started = local.now();
    while local.now() - started < MAX_MATCH_TIME {
        if local.phase() == MatchPhase::Playing {
            drive_paddles(local);
        }
        for event in local.advance(FRAME) {
            if let Some(winner) = present(&event) {
                return Some(winner);
            }
        }
    }
    None
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1);

    let mut local = LocalMatch::new(&MatchConfig::default());
    let mut wins = [0u32; 2];
    for n in 1..=matches {
        if n > 1 {
            local.rematch();
        }
        match play_one(&mut local) {
            Some(winner) => wins[winner.index()] += 1,
            None => {
                warn!(match_no = n, "match abandoned after {MAX_MATCH_TIME:?}");
                break;
            }
        }
    }
    info!(
        left = wins[0],
        right = wins[1],
        virtual_time = ?local.now(),
        "done"
    );
}
