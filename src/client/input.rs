//! Keyboard sampling into intents with change detection

use std::collections::HashSet;

use crate::protocol::{ClientMessage, Direction};

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
}

impl Key {
    /// Maps a browser-style key name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Key> {
        match name.to_ascii_lowercase().as_str() {
            "w" => Some(Key::W),
            "a" => Some(Key::A),
            "s" => Some(Key::S),
            "d" => Some(Key::D),
            " " | "space" => Some(Key::Space),
            _ => None,
        }
    }
}

/// Currently held keys
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    held: HashSet<Key>,
}

impl KeyState {
    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// `w`/`s` drive z, `a`/`d` drive x. Forward and left win when both keys of an axis are held.
    pub fn direction(&self) -> Direction {
        let z = if self.is_down(Key::W) {
            1.0
        } else if self.is_down(Key::S) {
            -1.0
        } else {
            0.0
        };
        let x = if self.is_down(Key::A) {
            1.0
        } else if self.is_down(Key::D) {
            -1.0
        } else {
            0.0
        };
        Direction::new(x, 0.0, z)
    }
}

/// Turns per-frame input into the intents worth sending.
/// Direction and facing are only sent when they change; jump is sent every frame it is held.
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    prev_direction: Direction,
    prev_theta: f32,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `theta` is the camera facing angle, `None` until the local player exists
    pub fn sample(&mut self, keys: &KeyState, theta: Option<f32>) -> Vec<ClientMessage> {
        let mut intents = Vec::new();

        if keys.is_down(Key::Space) {
            intents.push(ClientMessage::Jump);
        }

        let direction = keys.direction();
        if direction != self.prev_direction {
            self.prev_direction = direction;
            intents.push(ClientMessage::SetDirection { direction });
        }

        if let Some(theta) = theta {
            if theta != self.prev_theta {
                self.prev_theta = theta;
                intents.push(ClientMessage::SetTheta { theta });
            }
        }

        intents
    }
}
