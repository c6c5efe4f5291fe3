//! Time for Neon Puck rooms: a fixed-rate tick driver and a set of named,
//! cancelable one-shot timers.
//!
//! Both are built to be polled from a room actor's `tokio::select!` loop.
//! Neither spawns tasks, so dropping the owner cancels everything:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* ... */ }
//!         _ = scheduler.wait_for_tick() => {
//!             let event = step(&mut state);
//!             scheduler.record_tick_end();
//!         }
//!         kind = timers.expired() => { /* countdown, goal pause, cleanup */ }
//!     }
//! }
//! ```
//!
//! A stopped scheduler and an empty timer set pend forever, which is what
//! lets them sit in `select!` unconditionally.

mod config;
mod scheduler;
mod timers;

pub use config::{TickConfig, TickPolicy};
pub use scheduler::{TickInfo, TickMetrics, TickScheduler};
pub use timers::TimerSet;
