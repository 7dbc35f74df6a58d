//! Snapshot buffer that renders a fixed delay behind receipt time and
//! blends the two snapshots bracketing the render target.

use std::collections::VecDeque;

use crate::protocol::{GameState, PlayerView};

/// State that can be blended between two snapshots.
/// `t` is the elapsed fraction in `[0, 1]` from `self` (older) to `newer`.
pub trait Interpolate: Clone {
    fn interpolate(&self, newer: &Self, t: f32) -> Self;
}

impl Interpolate for PlayerView {
    /// Position and theta blend linearly; display fields come from the newer view.
    /// Theta takes the raw linear path, so crossing +-pi sweeps the long way round.
    fn interpolate(&self, newer: &Self, t: f32) -> Self {
        PlayerView {
            position: self.position.lerp(newer.position, t),
            theta: self.theta + (newer.theta - self.theta) * t,
            ..newer.clone()
        }
    }
}

impl Interpolate for GameState {
    /// Players only in the newer snapshot pass through unchanged; players that left are dropped
    fn interpolate(&self, newer: &Self, t: f32) -> Self {
        GameState {
            players: newer
                .players
                .iter()
                .map(|to| match self.player(&to.id) {
                    Some(from) => from.interpolate(to, t),
                    None => to.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<S, E> {
    state: S,
    events: Vec<E>,
    ts: u64,
}

/// Result of one render-time query
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedState<S, E> {
    pub state: S,
    /// Events of every snapshot the render target passed since the previous query
    pub events: Vec<E>,
}

pub struct InterpolationBuffer<S, E = ()> {
    entries: VecDeque<Entry<S, E>>,
    delay_ms: u64,
}

impl<S: Interpolate, E: Clone> InterpolationBuffer<S, E> {
    pub fn new(initial: S, ts: u64, delay_ms: u64) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(Entry {
            state: initial,
            events: Vec::new(),
            ts,
        });
        Self { entries, delay_ms }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffers a snapshot. Snapshots older than the newest buffered one are stale and dropped;
    /// a snapshot with the newest timestamp replaces it.
    pub fn enqueue(&mut self, state: S, events: Vec<E>, ts: u64) {
        if let Some(last) = self.entries.back_mut() {
            if ts < last.ts {
                return;
            }
            if ts == last.ts {
                last.state = state;
                last.events.extend(events);
                return;
            }
        }
        self.entries.push_back(Entry { state, events, ts });
    }

    /// State to draw at `render_time` (same clock as snapshot timestamps)
    pub fn interpolated_state(&mut self, render_time: u64) -> InterpolatedState<S, E> {
        let target = render_time as i64 - self.delay_ms as i64;

        // Entries the target has reached, oldest first
        let passed = self
            .entries
            .iter()
            .take_while(|entry| entry.ts as i64 <= target)
            .count();

        let mut events = Vec::new();
        for entry in self.entries.iter_mut().take(passed) {
            events.append(&mut entry.events);
        }

        if passed == 0 {
            return InterpolatedState {
                state: self.entries[0].state.clone(),
                events,
            };
        }

        // Older bracket becomes the front of the buffer
        self.entries.drain(..passed - 1);

        let older = &self.entries[0];
        let state = match self.entries.get(1) {
            Some(newer) => {
                let span = (newer.ts - older.ts) as f32;
                let t = (target - older.ts as i64) as f32 / span;
                older.state.interpolate(&newer.state, t.clamp(0.0, 1.0))
            }
            None => older.state.clone(),
        };

        InterpolatedState { state, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Animation, Position};

    fn view(id: &str, x: f32, theta: f32) -> PlayerView {
        PlayerView {
            id: id.to_string(),
            position: Position::new(x, 0.0, 0.0),
            theta,
            grounded: false,
            animation: Animation::Fall,
            is_moving: false,
        }
    }

    fn state(players: Vec<PlayerView>) -> GameState {
        GameState { players }
    }

    fn buffer(delay_ms: u64) -> InterpolationBuffer<GameState> {
        let mut buffer = InterpolationBuffer::new(state(vec![view("p", 0.0, 0.0)]), 0, delay_ms);
        buffer.enqueue(state(vec![view("p", 10.0, 0.0)]), Vec::new(), 100);
        buffer
    }

    #[test]
    fn midpoint_between_bracketing_snapshots() {
        let mut buffer = buffer(50);

        let result = buffer.interpolated_state(100);
        assert_eq!(result.state.players[0].position, Position::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn exact_timestamps_return_raw_snapshots() {
        let mut buffer = buffer(0);

        assert_eq!(buffer.interpolated_state(0).state.players[0].position.x, 0.0);
        assert_eq!(buffer.interpolated_state(100).state.players[0].position.x, 10.0);
    }

    #[test]
    fn target_before_first_snapshot_returns_earliest() {
        let mut buffer = buffer(50);

        let result = buffer.interpolated_state(20);
        assert_eq!(result.state, state(vec![view("p", 0.0, 0.0)]));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn target_past_latest_returns_latest() {
        let mut buffer = buffer(50);

        let result = buffer.interpolated_state(10_000);
        assert_eq!(result.state, state(vec![view("p", 10.0, 0.0)]));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn new_players_pass_through_uninterpolated() {
        let mut buffer = InterpolationBuffer::<GameState>::new(state(vec![view("a", 0.0, 0.0)]), 0, 0);
        buffer.enqueue(
            state(vec![view("a", 10.0, 0.0), view("b", 7.0, 1.5)]),
            Vec::new(),
            100,
        );

        let result = buffer.interpolated_state(50);
        assert_eq!(result.state.players[0].position.x, 5.0);
        assert_eq!(result.state.players[1], view("b", 7.0, 1.5));
    }

    #[test]
    fn display_fields_come_from_newer_snapshot() {
        let from = view("p", 0.0, 0.0);
        let mut to = view("p", 4.0, 2.0);
        to.grounded = true;
        to.animation = Animation::Run;
        to.is_moving = true;

        let mid = from.interpolate(&to, 0.25);
        assert!(mid.grounded);
        assert!(mid.is_moving);
        assert_eq!(mid.animation, Animation::Run);
        assert_eq!(mid.position.x, 1.0);
        assert_eq!(mid.theta, 0.5);
    }

    #[test]
    fn theta_is_interpolated_linearly_across_wrap() {
        let from = view("p", 0.0, 3.0);
        let to = view("p", 0.0, -3.0);

        // Naive path passes through zero instead of pi
        assert!(from.interpolate(&to, 0.5).theta.abs() < 1e-6);
    }

    #[test]
    fn stale_snapshots_are_dropped_and_equal_timestamps_replace() {
        let mut buffer = buffer(0);
        buffer.enqueue(state(vec![view("p", 99.0, 0.0)]), Vec::new(), 50);
        assert_eq!(buffer.len(), 2);

        buffer.enqueue(state(vec![view("p", 20.0, 0.0)]), Vec::new(), 100);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.interpolated_state(50).state.players[0].position.x, 10.0);
    }

    #[test]
    fn events_are_delivered_once_when_passed() {
        let mut buffer = InterpolationBuffer::<GameState, &str>::new(GameState::default(), 0, 0);
        buffer.enqueue(GameState::default(), vec!["landed"], 100);
        buffer.enqueue(GameState::default(), vec!["jumped"], 200);

        assert!(buffer.interpolated_state(50).events.is_empty());
        assert_eq!(buffer.interpolated_state(150).events, vec!["landed"]);
        assert!(buffer.interpolated_state(160).events.is_empty());
        assert_eq!(buffer.interpolated_state(250).events, vec!["jumped"]);
    }
}
