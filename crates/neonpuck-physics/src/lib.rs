//! Deterministic air-hockey physics for Neon Puck.
//!
//! This crate is the single source of truth for how the puck moves. It has
//! no I/O, no clock, and no randomness: [`step`] is a pure function of the
//! [`GameState`] it is given. The server runs it at a fixed 60 Hz for every
//! networked match, and a single-device game runs the same code locally.
//!
//! # Key types
//!
//! - [`GameState`]: puck, both paddles, scores
//! - [`step`] / [`StepEvent`]: advance one tick and report what happened
//! - [`Side`]: left (player 1) or right (player 2)
//! - [`consts`]: court geometry and tuning

pub mod consts;
mod state;
mod step;

pub use state::{GameState, Paddle, Puck, Side};
pub use step::{step, StepEvent};
