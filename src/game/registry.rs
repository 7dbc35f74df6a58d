//! Room lifecycle: live rooms, per-room inboxes and snapshot channels

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::physics::{PhysicsError, PhysicsWorld};

use super::player::UserId;
use super::room::{Room, RoomId};

/// Snapshots buffered per subscriber before it starts lagging
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Work queued for a room, applied at the next tick boundary
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Subscribe { user_id: UserId },
    Unsubscribe { user_id: UserId },
    Message { user_id: UserId, payload: Bytes },
}

/// Handle to a live room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: RoomId,
    inbox_tx: mpsc::UnboundedSender<RoomCommand>,
    snapshot_tx: broadcast::Sender<Bytes>,
    player_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Number of live snapshot receivers
    pub fn subscriber_count(&self) -> usize {
        self.snapshot_tx.receiver_count()
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Bytes> {
        self.snapshot_tx.subscribe()
    }

    /// Publishes one encoded snapshot to every receiver, returning how many got it
    pub(crate) fn broadcast(&self, payload: Bytes) -> usize {
        self.snapshot_tx.send(payload).unwrap_or(0)
    }

    fn enqueue(&self, command: RoomCommand) {
        if self.inbox_tx.send(command).is_err() {
            debug!(room_id = %self.id, "Room inbox closed, command dropped");
        }
    }
}

/// Room state owned by whichever tick currently holds the lock
pub(crate) struct RoomSim<W> {
    pub(crate) room: Room<W>,
    inbox_rx: mpsc::UnboundedReceiver<RoomCommand>,
    /// Last published snapshot timestamp
    pub(crate) last_ts: u64,
}

impl<W: PhysicsWorld> RoomSim<W> {
    /// Applies queued commands in arrival order
    pub(crate) fn drain_inbox(&mut self) -> Result<(), PhysicsError> {
        while let Ok(command) = self.inbox_rx.try_recv() {
            match command {
                RoomCommand::Subscribe { user_id } => {
                    self.room.subscribe_user(&user_id)?;
                }
                RoomCommand::Unsubscribe { user_id } => {
                    self.room.unsubscribe_user(&user_id);
                }
                RoomCommand::Message { user_id, payload } => {
                    self.room.on_message(&user_id, &payload);
                }
            }
        }
        Ok(())
    }
}

pub(crate) struct RoomSlot<W> {
    pub(crate) handle: RoomHandle,
    pub(crate) sim: Mutex<RoomSim<W>>,
    idle_since: Mutex<Option<Instant>>,
}

impl<W: PhysicsWorld> RoomSlot<W> {
    fn new(room: Room<W>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let handle = RoomHandle {
            id: room.id().to_string(),
            inbox_tx,
            snapshot_tx,
            player_count: Arc::new(AtomicUsize::new(0)),
        };

        Self {
            handle,
            sim: Mutex::new(RoomSim {
                room,
                inbox_rx,
                last_ts: 0,
            }),
            idle_since: Mutex::new(None),
        }
    }

    /// Records the population seen by the latest tick
    pub(crate) fn record_population(&self, players: usize) {
        self.handle.player_count.store(players, Ordering::Relaxed);
        let mut idle_since = self.idle_since.lock();
        if players == 0 {
            idle_since.get_or_insert_with(Instant::now);
        } else {
            *idle_since = None;
        }
    }

    fn idle_expired(&self, ttl: Duration) -> bool {
        self.idle_since
            .lock()
            .map_or(false, |since| since.elapsed() >= ttl)
    }
}

/// Registry of all live rooms
pub struct RoomRegistry<W> {
    rooms: DashMap<RoomId, Arc<RoomSlot<W>>>,
    /// How long an empty room survives; `None` keeps rooms forever
    idle_ttl: Option<Duration>,
}

impl<W: PhysicsWorld + Default> RoomRegistry<W> {
    pub fn new(idle_ttl: Option<Duration>) -> Self {
        Self {
            rooms: DashMap::new(),
            idle_ttl,
        }
    }

    /// Returns the room, materializing it with a fresh world the first time an id is seen
    pub fn create_room(&self, room_id: &str) -> RoomHandle {
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(RoomSlot::new(Room::new(room_id.to_string(), W::default()))))
            .handle
            .clone()
    }

    /// Creates the room if needed, queues the spawn and returns a snapshot receiver
    pub fn subscribe_user(&self, room_id: &str, user_id: &str) -> broadcast::Receiver<Bytes> {
        // The entry guard keeps eviction from racing the queued subscription
        let slot = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            Arc::new(RoomSlot::new(Room::new(room_id.to_string(), W::default())))
        });

        *slot.idle_since.lock() = None;
        let snapshots = slot.handle.subscribe_snapshots();
        slot.handle.enqueue(RoomCommand::Subscribe {
            user_id: user_id.to_string(),
        });
        snapshots
    }

    pub fn unsubscribe_user(&self, room_id: &str, user_id: &str) {
        match self.get(room_id) {
            Some(handle) => handle.enqueue(RoomCommand::Unsubscribe {
                user_id: user_id.to_string(),
            }),
            None => debug!(room_id = %room_id, user_id = %user_id, "Unsubscribe for unknown room"),
        }
    }

    /// Queues a raw intent; messages for unknown rooms are dropped
    pub fn on_message(&self, room_id: &str, user_id: &str, payload: Bytes) {
        match self.get(room_id) {
            Some(handle) => handle.enqueue(RoomCommand::Message {
                user_id: user_id.to_string(),
                payload,
            }),
            None => debug!(room_id = %room_id, user_id = %user_id, "Message for unknown room dropped"),
        }
    }
}

impl<W: PhysicsWorld> RoomRegistry<W> {
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|slot| slot.handle.clone())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms
            .iter()
            .map(|slot| slot.handle.player_count())
            .sum()
    }

    /// Users currently tracked by the room, in join order
    pub fn list_subscribers(&self, room_id: &str) -> Vec<UserId> {
        self.inspect(room_id, |room| {
            room.players().iter().map(|p| p.id.clone()).collect()
        })
        .unwrap_or_default()
    }

    /// Runs `f` against the room while holding its tick lock
    pub fn inspect<R>(&self, room_id: &str, f: impl FnOnce(&mut Room<W>) -> R) -> Option<R> {
        let slot = self.rooms.get(room_id).map(|slot| Arc::clone(slot.value()))?;
        let mut sim = slot.sim.lock();
        Some(f(&mut sim.room))
    }

    pub(crate) fn slots(&self) -> Vec<(RoomId, Arc<RoomSlot<W>>)> {
        self.rooms
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Drops a room; its snapshot receivers observe the channel closing
    pub fn remove_room(&self, room_id: &str) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    /// Removes rooms that have been empty longer than the idle TTL
    pub fn evict_idle(&self) -> Vec<RoomId> {
        let Some(ttl) = self.idle_ttl else {
            return Vec::new();
        };

        let candidates: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| entry.value().idle_expired(ttl))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter(|room_id| {
                self.rooms
                    .remove_if(room_id, |_, slot| slot.idle_expired(ttl))
                    .is_some()
            })
            .inspect(|room_id| info!(room_id = %room_id, "Idle room evicted"))
            .collect()
    }
}

impl<W: PhysicsWorld + Default> Default for RoomRegistry<W> {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::fake::FakeWorld;

    fn registry() -> RoomRegistry<FakeWorld> {
        RoomRegistry::new(None)
    }

    fn drain(registry: &RoomRegistry<FakeWorld>, room_id: &str) {
        let slot = registry
            .slots()
            .into_iter()
            .find(|(id, _)| id == room_id)
            .map(|(_, slot)| slot)
            .unwrap();
        slot.sim.lock().drain_inbox().unwrap();
    }

    #[test]
    fn create_room_materializes_once() {
        let registry = registry();

        registry.create_room("r1");
        registry.create_room("r1");

        assert_eq!(registry.active_rooms(), 1);
        let statics = registry.inspect("r1", |room| room.world().statics.len());
        assert_eq!(statics, Some(crate::map::PLATFORMS.len() + 1));
    }

    #[test]
    fn subscriptions_apply_at_tick_boundary() {
        let registry = registry();
        let _rx = registry.subscribe_user("r1", "alice");

        assert!(registry.list_subscribers("r1").is_empty());
        drain(&registry, "r1");
        assert_eq!(registry.list_subscribers("r1"), vec!["alice".to_string()]);
    }

    #[test]
    fn double_subscribe_tracks_one_player() {
        let registry = registry();
        let _a = registry.subscribe_user("r1", "alice");
        let _b = registry.subscribe_user("r1", "alice");
        drain(&registry, "r1");

        assert_eq!(registry.list_subscribers("r1").len(), 1);
        assert_eq!(registry.inspect("r1", |room| room.world().created), Some(2));
    }

    #[test]
    fn messages_for_unknown_rooms_do_not_create_them() {
        let registry = registry();

        registry.on_message("ghost", "alice", Bytes::from_static(br#"{"type":2}"#));
        registry.unsubscribe_user("ghost", "alice");

        assert_eq!(registry.active_rooms(), 0);
        assert!(registry.list_subscribers("ghost").is_empty());
    }

    #[test]
    fn queued_commands_keep_arrival_order() {
        let registry = registry();
        let _rx = registry.subscribe_user("r1", "alice");
        registry.on_message("r1", "alice", Bytes::from_static(br#"{"type":1,"theta":1.5}"#));
        registry.unsubscribe_user("r1", "alice");
        registry.on_message("r1", "alice", Bytes::from_static(br#"{"type":1,"theta":3.0}"#));
        drain(&registry, "r1");

        assert!(registry.list_subscribers("r1").is_empty());
        assert_eq!(registry.inspect("r1", |room| room.world().destroyed), Some(2));
    }

    #[test]
    fn idle_rooms_are_evicted_after_ttl() {
        let registry: RoomRegistry<FakeWorld> = RoomRegistry::new(Some(Duration::ZERO));
        registry.create_room("empty");
        let _rx = registry.subscribe_user("busy", "alice");
        drain(&registry, "busy");

        for (_, slot) in registry.slots() {
            let players = slot.sim.lock().room.player_count();
            slot.record_population(players);
        }

        assert_eq!(registry.evict_idle(), vec!["empty".to_string()]);
        assert_eq!(registry.active_rooms(), 1);
        assert_eq!(registry.total_players(), 1);
    }

    #[test]
    fn rooms_never_evicted_without_ttl() {
        let registry = registry();
        registry.create_room("r1");
        for (_, slot) in registry.slots() {
            slot.record_population(0);
        }

        assert!(registry.evict_idle().is_empty());
        assert_eq!(registry.active_rooms(), 1);
    }
}
