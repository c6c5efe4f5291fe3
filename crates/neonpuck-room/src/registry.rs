//! The room registry: which code belongs to which running room.

use std::collections::HashMap;
use std::sync::Arc;

use neonpuck_physics::Side;
use neonpuck_protocol::{ParticipantId, RoomCode};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::info;

use crate::room::{spawn_room, RoomId};
use crate::{MatchConfig, PlayerSender, RoomError, RoomHandle};

/// Random draws before giving up on finding an unused code.
const CODE_ATTEMPTS: usize = 1_000;

/// Shared map from room code to room, cheap to clone.
///
/// Every operation holds the lock only for map access; it never awaits a
/// room while holding it, so a slow room can't stall unrelated creates or
/// joins.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<RoomCode, RoomHandle>>>,
    config: Arc<MatchConfig>,
}

impl RoomRegistry {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Creates a room under a fresh code with `host` already in the first
    /// slot. The host's channel receives `room-created`.
    ///
    /// Drawing the code and inserting the room happen under one lock, so
    /// two concurrent creates can never share a code.
    pub async fn create_room(
        &self,
        host: ParticipantId,
        sender: PlayerSender,
    ) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let mut rng = rand::rng();
        let code = (0..CODE_ATTEMPTS)
            .map(|_| {
                RoomCode::from_indices(std::array::from_fn(|_| {
                    rng.random_range(0..RoomCode::ALPHABET.len())
                }))
            })
            .find(|code| !rooms.contains_key(code))
            .ok_or(RoomError::NoFreeCode)?;

        let handle = spawn_room(code, &self.config, host, sender, self.clone());
        rooms.insert(code, handle.clone());
        info!(%code, id = %handle.id(), %host, rooms = rooms.len(), "room created");
        Ok(handle)
    }

    /// Seats `participant` in the room under `code` and returns its side.
    pub async fn join_room(
        &self,
        code: RoomCode,
        participant: ParticipantId,
        sender: PlayerSender,
    ) -> Result<(RoomHandle, Side), RoomError> {
        let handle = self.find(code).await.ok_or(RoomError::NotFound(code))?;
        match handle.join(participant, sender).await {
            Ok(side) => Ok((handle, side)),
            // Destroyed between lookup and join.
            Err(RoomError::Unavailable(code)) => Err(RoomError::NotFound(code)),
            Err(e) => Err(e),
        }
    }

    pub async fn find(&self, code: RoomCode) -> Option<RoomHandle> {
        self.rooms.lock().await.get(&code).cloned()
    }

    /// Removes a room and stops it, canceling its timers. Returns whether
    /// a room was removed; calling it again is a no-op.
    pub async fn destroy_room(&self, code: RoomCode) -> bool {
        let removed = self.rooms.lock().await.remove(&code);
        match removed {
            Some(handle) => {
                handle.shutdown().await;
                info!(%code, id = %handle.id(), "room removed");
                true
            }
            None => false,
        }
    }

    /// Called by a stopping room. Removes the entry only if it still
    /// belongs to that room instance, since the code may have been reused.
    pub(crate) async fn forget(&self, code: RoomCode, id: RoomId) {
        let mut rooms = self.rooms.lock().await;
        if rooms.get(&code).is_some_and(|h| h.id() == id) {
            rooms.remove(&code);
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn codes(&self) -> Vec<RoomCode> {
        self.rooms.lock().await.keys().copied().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_channel;

    #[tokio::test]
    async fn test_create_room_codes_are_unique_and_valid() {
        let registry = RoomRegistry::default();
        let mut codes = Vec::new();
        for n in 0..50 {
            let (tx, _rx) = player_channel();
            let handle = registry.create_room(ParticipantId(n), tx).await.unwrap();
            codes.push(handle.code());
        }
        let mut unique = codes.clone();
        unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        for code in codes {
            assert!(code.as_str().bytes().all(|b| RoomCode::ALPHABET.contains(&b)));
        }
        assert_eq!(registry.room_count().await, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_never_share_a_code() {
        let registry = RoomRegistry::default();
        let creates: Vec<_> = (0..64)
            .map(|n| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let (tx, _rx) = player_channel();
                    registry.create_room(ParticipantId(n), tx).await.unwrap().code()
                })
            })
            .collect();

        let mut codes = Vec::new();
        for create in creates {
            codes.push(create.await.unwrap());
        }
        codes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        codes.dedup();
        assert_eq!(codes.len(), 64);
        assert_eq!(registry.room_count().await, 64);
    }

    #[tokio::test]
    async fn test_join_unknown_code_is_not_found() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = player_channel();
        let code = RoomCode::parse("ZZZZ").unwrap();
        let err = registry.join_room(code, ParticipantId(1), tx).await.unwrap_err();
        assert!(matches!(err, RoomError::NotFound(c) if c == code));
    }

    #[tokio::test]
    async fn test_destroy_room_is_idempotent() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = player_channel();
        let code = registry.create_room(ParticipantId(1), tx).await.unwrap().code();

        assert!(registry.destroy_room(code).await);
        assert!(!registry.destroy_room(code).await);
        assert_eq!(registry.room_count().await, 0);
    }
}
