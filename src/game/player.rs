//! Server-internal player record

use crate::physics::{BodyHandle, Vec3};
use crate::protocol::{Animation, Direction, PlayerView};

/// Horizontal move speed, scaled by the tick delta in seconds
pub const PLAYER_MOVE_SPEED: f32 = 200.0;
/// Upward velocity applied by a jump
pub const PLAYER_JUMP_VELOCITY: f32 = 5.0;
/// Facing offset per unit of strafe input (45 degrees)
pub const STRAFE_OFFSET: f32 = 0.785398;

/// Opaque user identifier, unique within a room
pub type UserId = String;

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: UserId,
    pub body: BodyHandle,
    /// Ground-contact sensor locked under `body`
    pub sensor: BodyHandle,
    pub direction: Direction,
    pub theta: f32,
    pub grounded: bool,
    pub animation: Animation,
}

impl Player {
    pub fn new(id: UserId, body: BodyHandle, sensor: BodyHandle) -> Self {
        Self {
            id,
            body,
            sensor,
            direction: Direction::ZERO,
            theta: 0.0,
            grounded: false,
            animation: Animation::Fall,
        }
    }

    /// Horizontal velocity for this tick; strafing rotates the heading, `direction.z` picks the sign
    pub fn horizontal_velocity(&self, delta_secs: f32) -> (f32, f32) {
        let heading = self.theta + STRAFE_OFFSET * self.direction.x;
        let speed = PLAYER_MOVE_SPEED * self.direction.z * delta_secs;
        (heading.sin() * speed, heading.cos() * speed)
    }

    /// Next velocity: horizontal from intent, vertical untouched.
    /// A product that overflows `f32` zeroes the horizontal component.
    pub fn steered_velocity(&self, current: Vec3, delta_secs: f32) -> Vec3 {
        let (x, z) = self.horizontal_velocity(delta_secs);
        if x.is_finite() && z.is_finite() {
            Vec3::new(x, current.y, z)
        } else {
            Vec3::new(0.0, current.y, 0.0)
        }
    }

    pub fn refresh_animation(&mut self) -> Animation {
        self.animation = animation_for(self.direction, self.grounded);
        self.animation
    }

    pub fn view(&self, position: Vec3) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            position: position.into(),
            theta: self.theta,
            grounded: self.grounded,
            animation: self.animation,
            is_moving: self.animation.is_moving(),
        }
    }
}

/// Display animation as a pure function of the latest intent and ground contact
pub fn animation_for(direction: Direction, grounded: bool) -> Animation {
    if !grounded {
        return Animation::Fall;
    }
    if direction.z == 1.0 {
        Animation::Run
    } else if direction.z == -1.0 {
        Animation::RunBackward
    } else {
        Animation::Idle
    }
}
