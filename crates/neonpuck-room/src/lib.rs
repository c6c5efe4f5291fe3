//! Rooms for Neon Puck.
//!
//! A room is a [`MatchMachine`] driven by its own Tokio task: the actor
//! owns the machine, a tick driver, the match timers, and the outbound
//! channel of each seated participant. The [`RoomRegistry`] maps four-letter
//! codes to running rooms. [`LocalMatch`] runs the same machine on a
//! virtual clock for single-device play.
//!
//! # Key types
//!
//! - [`MatchMachine`]: pure match rules, inputs in, [`Effect`]s out
//! - [`RoomRegistry`]: create, join, destroy by code
//! - [`RoomHandle`]: commands for one running room
//! - [`LocalMatch`]: two local players, no network
//! - [`player_channel`]: the ordered outbox a room writes to

mod config;
mod error;
mod local;
mod machine;
mod outbox;
mod registry;
mod room;

pub use config::{MatchConfig, MatchPhase};
pub use error::RoomError;
pub use local::{LocalEvent, LocalMatch};
pub use machine::{Effect, MatchInput, MatchMachine, Refusal, TimerKind};
pub use outbox::{player_channel, OutboxClosed, PlayerInbox, PlayerSender};
pub use registry::RoomRegistry;
pub use room::{RoomHandle, RoomId, RoomInfo};
