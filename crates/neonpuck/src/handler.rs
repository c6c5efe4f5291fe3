//! Per-connection handler: message routing between one socket and at most
//! one room.
//!
//! Each accepted connection gets two Tokio tasks:
//!   1. a writer that drains the participant's outbox, numbers each frame
//!      and sends it on the channel its message type asks for;
//!   2. this handler, which decodes client envelopes and drives the room.
//!
//! Rooms and the handler both write into the same outbox, so a
//! `join-error` is ordered with everything a room says. Snapshots in the
//! outbox coalesce to the newest one; a slow socket delays the game, it
//! never grows the server's memory.

use std::sync::Arc;

use neonpuck_protocol::{ClientMessage, Codec, Envelope, ParticipantId, RoomCode, ServerMessage};
use neonpuck_room::{player_channel, PlayerInbox, PlayerSender, RoomError, RoomHandle};
use neonpuck_transport::{Connection, WebSocketConnection};
use tracing::{debug, info, trace, warn};

use crate::server::ServerState;
use crate::NeonPuckError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), NeonPuckError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let participant = ParticipantId(conn_id.into_inner());
    debug!(%conn_id, %participant, peer = %conn.peer_addr(), "handling new connection");

    let (outbox, inbox) = player_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), inbox));

    let mut session = Session::new(participant, outbox);
    let result = read_loop(&conn, &state, &mut session).await;

    // A closed socket frees the slot exactly like `leave-room`.
    session.leave_room().await;
    writer.abort();
    if let Err(e) = conn.close().await {
        trace!(%conn_id, error = %e, "close after session end");
    }
    info!(%conn_id, %participant, "connection finished");
    result
}

async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    session: &mut Session,
) -> Result<(), NeonPuckError> {
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(participant = %session.participant, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // A frame that fails to decode is skipped; the connection lives on.
        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(participant = %session.participant, error = %e, "failed to decode envelope");
                continue;
            }
        };
        session.dispatch(state, envelope).await;
    }
}

/// Drains the outbox onto the socket until every sender is gone or the
/// socket fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut inbox: PlayerInbox,
) {
    // Server frames are numbered per connection, starting at 1.
    let mut seq: u64 = 0;
    while let Some(msg) = inbox.recv().await {
        seq += 1;
        let envelope = Envelope::wrap(seq, state.uptime_ms(), msg);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(conn_id = %conn.id(), error = %e, "failed to encode server message");
                continue;
            }
        };
        // Unreliable frames are skipped while another send holds the socket;
        // a dropped frame still consumed its `seq`, which is how clients
        // notice the gap.
        let sent = if envelope.channel.is_reliable() {
            conn.send(&bytes).await
        } else {
            conn.send_unreliable(&bytes).await
        };
        if let Err(e) = sent {
            debug!(conn_id = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// What one connection knows about itself.
struct Session {
    participant: ParticipantId,
    outbox: PlayerSender,
    room: Option<RoomHandle>,
    /// Sequence number of the newest paddle update forwarded to the room.
    last_paddle_seq: Option<u64>,
}

impl Session {
    fn new(participant: ParticipantId, outbox: PlayerSender) -> Self {
        Self {
            participant,
            outbox,
            room: None,
            last_paddle_seq: None,
        }
    }

    async fn dispatch<C: Codec>(&mut self, state: &ServerState<C>, envelope: Envelope<ClientMessage>) {
        let seq = envelope.seq;
        match envelope.payload {
            ClientMessage::CreateRoom => self.create_room(state).await,
            ClientMessage::JoinRoom { code } => self.join_room(state, &code).await,
            ClientMessage::PaddleUpdate { x, y } => self.paddle(seq, x, y),
            ClientMessage::Rematch => {
                if let Some(room) = &self.room {
                    if let Err(e) = room.rematch(self.participant).await {
                        debug!(participant = %self.participant, error = %e, "rematch vote lost");
                        self.room = None;
                    }
                }
            }
            ClientMessage::LeaveRoom => self.leave_room().await,
        }
    }

    async fn create_room<C: Codec>(&mut self, state: &ServerState<C>) {
        match state
            .registry
            .create_room(self.participant, self.outbox.clone())
            .await
        {
            Ok(handle) => self.switch_to(handle).await,
            Err(e) => self.reject(&e),
        }
    }

    async fn join_room<C: Codec>(&mut self, state: &ServerState<C>, raw: &str) {
        let code = match RoomCode::parse(raw) {
            Ok(code) => code,
            Err(e) => return self.reject(&RoomError::from(e)),
        };
        if self.room.as_ref().is_some_and(|room| room.code() == code) {
            return self.reject(&RoomError::AlreadyInRoom(self.participant, code));
        }

        // A refused join keeps the participant where it is.
        match state
            .registry
            .join_room(code, self.participant, self.outbox.clone())
            .await
        {
            Ok((handle, _side)) => self.switch_to(handle).await,
            Err(e) => self.reject(&e),
        }
    }

    /// Forwards a paddle position unless a newer one already went through.
    fn paddle(&mut self, seq: u64, x: f64, y: f64) {
        let Some(room) = &self.room else {
            trace!(participant = %self.participant, "paddle update outside a room");
            return;
        };
        // The client's sequence decides, not arrival order: a position
        // older than one already forwarded is never applied.
        if self.last_paddle_seq.is_some_and(|last| seq <= last) {
            trace!(participant = %self.participant, seq, "stale paddle update dropped");
            return;
        }
        self.last_paddle_seq = Some(seq);
        if let Err(e) = room.paddle(self.participant, x, y) {
            debug!(participant = %self.participant, error = %e, "room gone");
            self.room = None;
        }
    }

    async fn leave_room(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };
        // Sequence tracking is per room visit.
        self.last_paddle_seq = None;
        match room.leave(self.participant).await {
            Ok(()) => info!(code = %room.code(), participant = %self.participant, "participant left room"),
            Err(e) => debug!(participant = %self.participant, error = %e, "leave after room ended"),
        }
    }

    /// Leaves the current room, if any, for one that already seated us.
    async fn switch_to(&mut self, handle: RoomHandle) {
        self.leave_room().await;
        self.room = Some(handle);
        self.last_paddle_seq = None;
    }

    /// Reports a failed create or join to this participant only.
    fn reject(&self, err: &RoomError) {
        debug!(participant = %self.participant, error = %err, "room request rejected");
        let _ = self.outbox.send(ServerMessage::JoinError {
            reason: err.reason().to_string(),
        });
    }
}
