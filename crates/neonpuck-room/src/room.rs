//! Room actor: one Tokio task per room code.
//!
//! The actor owns a [`MatchMachine`], the room's tick driver and timers,
//! and the outbound channel of each seated participant. Everything else
//! talks to it through a [`RoomHandle`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use neonpuck_physics::Side;
use neonpuck_protocol::{ParticipantId, RoomCode, ServerMessage};
use neonpuck_tick::{TickScheduler, TimerSet};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::machine::{Effect, MatchInput, MatchMachine, Refusal, TimerKind};
use crate::outbox::PlayerSender;
use crate::{MatchConfig, MatchPhase, RoomError, RoomRegistry};

static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one room instance. A code can be reused after its room is
/// destroyed; a `RoomId` never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(u64);

impl RoomId {
    fn next() -> Self {
        Self(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

pub(crate) enum RoomCommand {
    Join {
        participant: ParticipantId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Side, RoomError>>,
    },
    Leave {
        participant: ParticipantId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Paddle {
        participant: ParticipantId,
        x: f64,
        y: f64,
    },
    Rematch {
        participant: ParticipantId,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Room metadata, not the game state.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub code: RoomCode,
    pub phase: MatchPhase,
    pub occupants: usize,
    pub scores: [u32; 2],
    /// The tick driver is running.
    pub ticking: bool,
    /// The room is empty and counting down to removal.
    pub cleanup_pending: bool,
}

/// Cheap-to-clone handle to a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Leave { .. } => "Leave",
            Self::Paddle { .. } => "Paddle",
            Self::Rematch { .. } => "Rematch",
            Self::Info { .. } => "Info",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn code(&self) -> RoomCode {
        self.code
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code)
    }

    /// Seats a participant. The room sends it `room-joined` before
    /// anything else.
    pub async fn join(
        &self,
        participant: ParticipantId,
        sender: PlayerSender,
    ) -> Result<Side, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                participant,
                sender,
                reply,
            })
            .await
            .map_err(|_| self.unavailable())?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Frees the participant's slot, exactly as a disconnect would.
    pub async fn leave(&self, participant: ParticipantId) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave { participant, reply })
            .await
            .map_err(|_| self.unavailable())?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Forwards a paddle position. Dropped, not queued, when the room is
    /// backed up: a newer position will follow.
    pub fn paddle(&self, participant: ParticipantId, x: f64, y: f64) -> Result<(), RoomError> {
        match self.sender.try_send(RoomCommand::Paddle { participant, x, y }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(code = %self.code, %participant, "room busy, dropping paddle update");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(self.unavailable()),
        }
    }

    pub async fn rematch(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Rematch { participant })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply })
            .await
            .map_err(|_| self.unavailable())?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Stops the room, canceling its tick driver and every pending timer.
    /// Harmless if the room already stopped.
    pub(crate) async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }
}

struct RoomActor {
    id: RoomId,
    code: RoomCode,
    machine: MatchMachine,
    /// Receives `room-created` instead of `room-joined` on its first seat.
    host: Option<ParticipantId>,
    members: HashMap<ParticipantId, PlayerSender>,
    scheduler: TickScheduler,
    timers: TimerSet<TimerKind>,
    commands: mpsc::Receiver<RoomCommand>,
    registry: RoomRegistry,
}

/// What the actor loop should do after carrying out effects.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl RoomActor {
    async fn run(mut self) {
        info!(code = %self.code, id = %self.id, "room actor started");

        loop {
            // Every branch is cancel safe: `recv` loses no command, and the
            // tick and timer futures change nothing until their sleep ends,
            // so a branch that loses a round fires on the next one.
            let flow = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    // Every handle is gone, including the registry's.
                    None => Flow::Stop,
                },
                _ = self.scheduler.wait_for_tick() => {
                    let flow = self.drive(MatchInput::Tick);
                    self.scheduler.record_tick_end();
                    flow
                }
                kind = self.timers.expired() => self.drive(MatchInput::TimerFired(kind)),
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.scheduler.stop();
        self.timers.cancel_all();
        self.registry.forget(self.code, self.id).await;
        info!(
            code = %self.code,
            id = %self.id,
            ticks = self.scheduler.metrics().total_ticks,
            overruns = self.scheduler.metrics().total_overruns,
            "room destroyed"
        );
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        debug!(code = %self.code, command = ?cmd, "room command");
        match cmd {
            RoomCommand::Join {
                participant,
                sender,
                reply,
            } => {
                let (result, flow) = self.seat(participant, sender);
                let _ = reply.send(result);
                flow
            }
            RoomCommand::Leave { participant, reply } => {
                match self.machine.handle(MatchInput::Leave { participant }) {
                    Ok(effects) => {
                        // Nothing the room says after this reaches the leaver.
                        self.members.remove(&participant);
                        let _ = reply.send(Ok(()));
                        self.apply(effects)
                    }
                    Err(refusal) => {
                        let _ = reply.send(Err(self.refused(refusal)));
                        Flow::Continue
                    }
                }
            }
            RoomCommand::Paddle { participant, x, y } => {
                self.drive(MatchInput::Paddle { participant, x, y })
            }
            RoomCommand::Rematch { participant } => {
                self.drive(MatchInput::Rematch { participant })
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
                Flow::Continue
            }
            RoomCommand::Shutdown => Flow::Stop,
        }
    }

    fn seat(
        &mut self,
        participant: ParticipantId,
        sender: PlayerSender,
    ) -> (Result<Side, RoomError>, Flow) {
        match self.machine.handle(MatchInput::Join { participant }) {
            Ok(effects) => {
                // Inserted before the effects run so the greeting can reach it.
                self.members.insert(participant, sender);
                let side = self
                    .machine
                    .side_of(participant)
                    .ok_or(RoomError::NotInRoom(participant, self.code));
                (side, self.apply(effects))
            }
            Err(refusal) => (Err(self.refused(refusal)), Flow::Continue),
        }
    }

    fn refused(&self, refusal: Refusal) -> RoomError {
        match refusal {
            Refusal::Full => RoomError::RoomFull(self.code),
            Refusal::AlreadySeated(p) => RoomError::AlreadyInRoom(p, self.code),
            Refusal::NotSeated(p) => RoomError::NotInRoom(p, self.code),
        }
    }

    /// Feeds an input whose refusal only needs logging.
    fn drive(&mut self, input: MatchInput) -> Flow {
        match self.machine.handle(input) {
            Ok(effects) => self.apply(effects),
            Err(refusal) => {
                debug!(code = %self.code, %refusal, "input refused");
                Flow::Continue
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Flow {
        for effect in effects {
            match effect {
                Effect::Seated { participant, side } => {
                    let greeting = if self.host.take_if(|host| *host == participant).is_some() {
                        ServerMessage::RoomCreated { code: self.code }
                    } else {
                        ServerMessage::RoomJoined {
                            code: self.code,
                            side,
                        }
                    };
                    info!(code = %self.code, %participant, %side, "participant joined room");
                    self.send_to(participant, greeting);
                }
                Effect::Send(participant, msg) => self.send_to(participant, msg),
                Effect::Broadcast(msg) => {
                    for sender in self.members.values() {
                        let _ = sender.send(msg.clone());
                    }
                }
                Effect::StartTicking => self.scheduler.start(),
                Effect::StopTicking => self.scheduler.stop(),
                Effect::Schedule(kind, after) => self.timers.schedule(kind, after),
                Effect::Cancel(kind) => {
                    self.timers.cancel(kind);
                }
                // Remote clients derive impacts from snapshots.
                Effect::Impact(_) => {}
                Effect::Destroy => {
                    info!(code = %self.code, "room empty past grace period");
                    return Flow::Stop;
                }
            }
        }
        Flow::Continue
    }

    /// Drops silently if the participant's connection is already gone.
    fn send_to(&self, participant: ParticipantId, msg: ServerMessage) {
        match self.members.get(&participant) {
            Some(sender) => {
                let _ = sender.send(msg);
            }
            None => warn!(code = %self.code, %participant, "no channel for participant"),
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            code: self.code,
            phase: self.machine.phase(),
            occupants: self.machine.occupants(),
            scores: self.machine.state().scores,
            ticking: self.scheduler.is_running(),
            cleanup_pending: self.timers.is_scheduled(TimerKind::Cleanup),
        }
    }
}

/// Spawns a room with `host` already in the first slot.
///
/// The host is seated before the task starts, so the room is never
/// observable without its creator. Must be called inside a Tokio runtime.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: &MatchConfig,
    host: ParticipantId,
    host_sender: PlayerSender,
    registry: RoomRegistry,
) -> RoomHandle {
    let id = RoomId::next();
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));

    let mut actor = RoomActor {
        id,
        code,
        machine: MatchMachine::new(config),
        host: Some(host),
        members: HashMap::new(),
        scheduler: TickScheduler::new(config.tick_config()),
        timers: TimerSet::new(),
        commands: rx,
        registry,
    };
    // A fresh machine always has a free slot, so this cannot be refused.
    let _ = actor.seat(host, host_sender);

    tokio::spawn(actor.run());
    RoomHandle {
        id,
        code,
        sender: tx,
    }
}
