//! Consume side of the client: whatever draws the world implements `StateRenderer`

use tracing::info;

use crate::protocol::GameState;

/// Receives one interpolated state per frame
pub trait StateRenderer {
    /// `local_user` is the player the camera follows
    fn render(&mut self, state: &GameState, local_user: &str);
}

/// Headless renderer: logs the local player every `every` frames
#[derive(Debug, Clone)]
pub struct LogRenderer {
    every: u64,
    frames: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl StateRenderer for LogRenderer {
    fn render(&mut self, state: &GameState, local_user: &str) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }

        match state.player(local_user) {
            Some(me) => info!(
                players = state.players.len(),
                x = me.position.x,
                y = me.position.y,
                z = me.position.z,
                theta = me.theta,
                grounded = me.grounded,
                animation = me.animation.name(),
                "Frame"
            ),
            None => info!(players = state.players.len(), "Frame (not spawned yet)"),
        }
    }
}
