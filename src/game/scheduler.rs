//! Fixed-cadence tick loop: drain inboxes, step rooms, broadcast snapshots

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::physics::{PhysicsError, PhysicsWorld};
use crate::protocol::ServerMessage;
use crate::util::time::unix_millis;

use super::registry::{RoomRegistry, RoomSlot};
use super::room::RoomId;

/// Longest delta a single tick will simulate after a stall
const MAX_TICK_DELTAS: u32 = 4;

/// What happened during one pass over the registry
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub rooms_ticked: usize,
    pub faulted: Vec<RoomId>,
    pub evicted: Vec<RoomId>,
}

/// Drives every room of a registry at a fixed rate
pub struct TickScheduler<W> {
    registry: Arc<RoomRegistry<W>>,
    tick_rate: u32,
}

impl<W: PhysicsWorld + 'static> TickScheduler<W> {
    pub fn new(registry: Arc<RoomRegistry<W>>, tick_rate: u32) -> Self {
        Self {
            registry,
            tick_rate: tick_rate.max(1),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate as u64)
    }

    /// Advances every room once, then evicts faulted and idle rooms.
    /// A physics fault only takes down the room it happened in.
    pub fn tick_once(&self, delta: Duration, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        for (room_id, slot) in self.registry.slots() {
            match advance_room(&slot, delta, now_ms) {
                Ok(()) => report.rooms_ticked += 1,
                Err(e) => {
                    error!(room_id = %room_id, error = %e, "Room physics faulted, removing room");
                    self.registry.remove_room(&room_id);
                    report.faulted.push(room_id);
                }
            }
        }

        report.evicted = self.registry.evict_idle();
        report
    }

    /// Run the authoritative tick loop
    pub async fn run(self) {
        let tick_duration = self.tick_interval();
        info!(tick_rate = self.tick_rate, "Tick scheduler started");

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // First tick fires immediately
        tick_interval.tick().await;
        let mut last_tick = Instant::now();

        loop {
            tick_interval.tick().await;

            let now = Instant::now();
            let mut delta = now - last_tick;
            last_tick = now;

            let max_delta = tick_duration * MAX_TICK_DELTAS;
            if delta > max_delta {
                warn!(
                    delta_ms = delta.as_millis() as u64,
                    "Tick stalled, capping simulated delta"
                );
                delta = max_delta;
            }

            self.tick_once(delta, unix_millis());
        }
    }
}

/// Steps one room and publishes its snapshot. Holds the room's lock for the whole tick.
fn advance_room<W: PhysicsWorld>(
    slot: &RoomSlot<W>,
    delta: Duration,
    now_ms: u64,
) -> Result<(), PhysicsError> {
    let mut sim = slot.sim.lock();

    sim.drain_inbox()?;
    sim.room.tick(delta)?;
    let state = sim.room.snapshot()?;

    let ts = now_ms.max(sim.last_ts);
    sim.last_ts = ts;
    slot.record_population(sim.room.player_count());

    // Encode once so every subscriber gets the same bytes
    match (ServerMessage::StateUpdate { state, ts }).encode() {
        Ok(payload) => {
            slot.handle.broadcast(Bytes::from(payload));
        }
        Err(e) => warn!(room_id = %slot.handle.id, error = %e, "Failed to encode snapshot"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::fake::FakeWorld;
    use tokio::sync::broadcast::error::TryRecvError;

    const TICK: Duration = Duration::from_millis(16);

    fn scheduler(idle_ttl: Option<Duration>) -> (Arc<RoomRegistry<FakeWorld>>, TickScheduler<FakeWorld>) {
        let registry = Arc::new(RoomRegistry::new(idle_ttl));
        let scheduler = TickScheduler::new(registry.clone(), 60);
        (registry, scheduler)
    }

    #[test]
    fn every_subscriber_receives_identical_bytes() {
        let (registry, scheduler) = scheduler(None);
        let mut receivers: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|user| registry.subscribe_user("room", user))
            .collect();

        let report = scheduler.tick_once(TICK, 1_000);
        assert_eq!(report.rooms_ticked, 1);

        let payloads: Vec<Bytes> = receivers
            .iter_mut()
            .map(|rx| rx.try_recv().unwrap())
            .collect();
        assert!(payloads.windows(2).all(|pair| pair[0] == pair[1]));

        let ServerMessage::StateUpdate { state, ts } = ServerMessage::decode(&payloads[0]).unwrap();
        assert_eq!(ts, 1_000);
        let ids: Vec<&str> = state.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn snapshot_timestamps_never_go_backwards() {
        let (registry, scheduler) = scheduler(None);
        let mut rx = registry.subscribe_user("room", "a");

        scheduler.tick_once(TICK, 500);
        scheduler.tick_once(TICK, 400);

        let first = ServerMessage::decode(&rx.try_recv().unwrap()).unwrap();
        let second = ServerMessage::decode(&rx.try_recv().unwrap()).unwrap();
        let (ServerMessage::StateUpdate { ts: t1, .. }, ServerMessage::StateUpdate { ts: t2, .. }) =
            (first, second);
        assert_eq!((t1, t2), (500, 500));
    }

    #[test]
    fn faulted_room_is_removed_without_affecting_others() {
        let (registry, scheduler) = scheduler(None);
        let mut broken = registry.subscribe_user("broken", "a");
        let mut healthy = registry.subscribe_user("healthy", "b");
        registry.inspect("broken", |room| room.world_mut().fail_next_step = true);

        let report = scheduler.tick_once(TICK, 10);

        assert_eq!(report.faulted, vec!["broken".to_string()]);
        assert_eq!(report.rooms_ticked, 1);
        assert!(registry.get("broken").is_none());
        assert_eq!(broken.try_recv(), Err(TryRecvError::Closed));
        assert!(healthy.try_recv().is_ok());

        let report = scheduler.tick_once(TICK, 20);
        assert_eq!(report.rooms_ticked, 1);
        assert!(report.faulted.is_empty());
    }

    #[test]
    fn rooms_stay_alive_at_zero_players_without_ttl() {
        let (registry, scheduler) = scheduler(None);
        let _rx = registry.subscribe_user("room", "a");
        scheduler.tick_once(TICK, 0);
        registry.unsubscribe_user("room", "a");

        let report = scheduler.tick_once(TICK, 16);

        assert!(report.evicted.is_empty());
        assert_eq!(registry.active_rooms(), 1);
        assert_eq!(registry.total_players(), 0);
    }

    #[test]
    fn empty_rooms_are_evicted_once_idle_ttl_passes() {
        let (registry, scheduler) = scheduler(Some(Duration::ZERO));
        let _rx = registry.subscribe_user("room", "a");
        assert!(scheduler.tick_once(TICK, 0).evicted.is_empty());

        registry.unsubscribe_user("room", "a");
        let report = scheduler.tick_once(TICK, 16);

        assert_eq!(report.evicted, vec!["room".to_string()]);
        assert_eq!(registry.active_rooms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_publishes_snapshots() {
        let (registry, scheduler) = scheduler(None);
        let mut rx = registry.subscribe_user("room", "a");

        let task = tokio::spawn(scheduler.run());

        let payload = rx.recv().await.unwrap();
        let ServerMessage::StateUpdate { state, .. } = ServerMessage::decode(&payload).unwrap();
        assert_eq!(state.players.len(), 1);

        task.abort();
    }
}
