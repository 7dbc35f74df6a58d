//! Per-frame client loop state: buffers snapshots, renders, and samples input

use crate::game::UserId;
use crate::protocol::{ClientMessage, GameState, ServerMessage};

use super::input::{InputSampler, KeyState};
use super::interpolation::InterpolationBuffer;
use super::render::StateRenderer;

pub struct ClientSession<R> {
    user_id: UserId,
    delay_ms: u64,
    buffer: Option<InterpolationBuffer<GameState>>,
    sampler: InputSampler,
    renderer: R,
}

impl<R: StateRenderer> ClientSession<R> {
    pub fn new(user_id: UserId, renderer: R, delay_ms: u64) -> Self {
        Self {
            user_id,
            delay_ms,
            buffer: None,
            sampler: InputSampler::new(),
            renderer,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The first snapshot seeds the buffer, later ones are enqueued
    pub fn on_server_message(&mut self, msg: ServerMessage) {
        let ServerMessage::StateUpdate { state, ts } = msg;
        match self.buffer.as_mut() {
            Some(buffer) => buffer.enqueue(state, Vec::new(), ts),
            None => self.buffer = Some(InterpolationBuffer::new(state, ts, self.delay_ms)),
        }
    }

    /// Runs one frame and returns the intents to send.
    /// Nothing is rendered or sent before the first snapshot arrives;
    /// facing is only reported once the local player is in the state.
    pub fn frame(&mut self, now_ms: u64, keys: &KeyState, theta: f32) -> Vec<ClientMessage> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Vec::new();
        };

        let state = buffer.interpolated_state(now_ms).state;
        self.renderer.render(&state, &self.user_id);

        let spawned = state.player(&self.user_id).is_some();
        self.sampler.sample(keys, spawned.then_some(theta))
    }
}
