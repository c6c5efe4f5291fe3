//! Per-participant outbound queue.
//!
//! Reliable messages queue without bound and arrive in order. Unreliable
//! ones (state snapshots) share a single latest-value slot: a participant
//! whose socket stalls holds at most one pending snapshot, however long
//! the room keeps ticking.
//!
//! Every message carries an order number taken when it was sent, so the
//! inbox hands out a snapshot and a reliable message in the order the
//! room produced them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use neonpuck_protocol::{Delivery, ServerMessage};
use tokio::sync::{mpsc, watch};

type Ordered = (u64, ServerMessage);

/// The receiving side of the participant is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("participant outbox closed")]
pub struct OutboxClosed;

/// Where a room delivers messages for one participant. Cheap to clone;
/// clones feed the same inbox.
#[derive(Debug, Clone)]
pub struct PlayerSender {
    order: Arc<AtomicU64>,
    reliable: mpsc::UnboundedSender<Ordered>,
    latest: Arc<watch::Sender<Option<Ordered>>>,
}

/// Drained by the connection's writer.
#[derive(Debug)]
pub struct PlayerInbox {
    reliable: mpsc::UnboundedReceiver<Ordered>,
    latest: watch::Receiver<Option<Ordered>>,
    held: Option<Ordered>,
    snapshot: Option<Ordered>,
    /// Order number of the newest snapshot already taken from the slot.
    seen: Option<u64>,
    latest_closed: bool,
}

/// Creates a connected sender and inbox.
pub fn player_channel() -> (PlayerSender, PlayerInbox) {
    let (reliable_tx, reliable_rx) = mpsc::unbounded_channel();
    let (latest_tx, latest_rx) = watch::channel(None);
    let sender = PlayerSender {
        order: Arc::new(AtomicU64::new(0)),
        reliable: reliable_tx,
        latest: Arc::new(latest_tx),
    };
    let inbox = PlayerInbox {
        reliable: reliable_rx,
        latest: latest_rx,
        held: None,
        snapshot: None,
        seen: None,
        latest_closed: false,
    };
    (sender, inbox)
}

impl PlayerSender {
    /// Queues a reliable message, or replaces the pending snapshot.
    pub fn send(&self, msg: ServerMessage) -> Result<(), OutboxClosed> {
        if self.reliable.is_closed() {
            return Err(OutboxClosed);
        }
        let n = self.order.fetch_add(1, Ordering::Relaxed);
        if msg.channel().is_reliable() {
            self.reliable.send((n, msg)).map_err(|_| OutboxClosed)
        } else {
            self.latest.send_replace(Some((n, msg)));
            Ok(())
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reliable.is_closed()
    }
}

impl PlayerInbox {
    /// Waits for the next message. `None` once every sender is dropped
    /// and nothing is left to hand out.
    ///
    /// Cancel safe: anything pulled off a channel is kept in `self`.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            if let Some(msg) = self.try_recv() {
                return Some(msg);
            }
            tokio::select! {
                item = self.reliable.recv() => match item {
                    Some(item) => self.held = Some(item),
                    // Both halves are dropped together with the last sender;
                    // a final snapshot may have landed after the check above.
                    None => return self.try_recv(),
                },
                changed = self.latest.changed(), if !self.latest_closed => {
                    if changed.is_err() {
                        self.latest_closed = true;
                    }
                }
            }
        }
    }

    /// The next message if one is ready.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        if self.held.is_none() {
            self.held = self.reliable.try_recv().ok();
        }
        {
            // Read through `borrow` rather than `has_changed`, which reports
            // nothing once the sender is gone.
            let latest = self.latest.borrow_and_update();
            if let Some((n, msg)) = latest.as_ref() {
                if self.seen.is_none_or(|seen| *n > seen) {
                    // A newer snapshot supersedes one still waiting here.
                    self.seen = Some(*n);
                    self.snapshot = Some((*n, msg.clone()));
                }
            }
        }
        let next = match (&self.held, &self.snapshot) {
            (Some((reliable, _)), Some((snapshot, _))) if snapshot < reliable => self.snapshot.take(),
            (Some(_), _) => self.held.take(),
            (None, _) => self.snapshot.take(),
        };
        next.map(|(_, msg)| msg)
    }
}
