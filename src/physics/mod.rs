//! Narrow physics capability used by the room simulation
//!
//! The simulation only ever needs to add bodies, set/read velocity, read position, lock two
//! bodies together, watch a sensor for contacts and step the world. Anything satisfying
//! [`PhysicsWorld`] can back a room; [`BoxWorld`] is the built-in implementation.

mod box_world;
#[cfg(test)]
pub mod fake;

pub use box_world::BoxWorld;

use std::ops::{Add, Mul, Sub};

use crate::protocol::Position;

/// Opaque handle to a body owned by a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub(crate) fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub(crate) fn axis_mut(&mut self, axis: usize) -> &mut f32 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Position::new(v.x, v.y, v.z)
    }
}

/// Static, immovable box collider
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpec {
    pub name: String,
    pub center: Vec3,
    /// Full extents
    pub size: Vec3,
}

/// Dynamic body; `sensor` bodies report contacts but never collide
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub name: String,
    pub center: Vec3,
    pub size: Vec3,
    pub sensor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// Contact reported for a watched sensor during a step
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub sensor: BodyHandle,
    /// Name of the other collider
    pub other: String,
    pub phase: ContactPhase,
}

/// Physics errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("Unknown body {0:?}")]
    UnknownBody(BodyHandle),

    #[error("Body `{name}` reached a non-finite state")]
    NonFinite { name: String },

    #[error("Invalid step delta: {0}ms")]
    InvalidDelta(f32),

    #[error("Simulation fault: {0}")]
    Fault(String),
}

/// The capability set a room needs from a physics engine
pub trait PhysicsWorld: Send {
    fn add_static_box(&mut self, spec: BoxSpec) -> BodyHandle;

    fn add_dynamic_body(&mut self, spec: BodySpec) -> BodyHandle;

    /// Removes a body, its constraints and its contact watch. Unknown handles are ignored.
    fn destroy_body(&mut self, body: BodyHandle);

    fn velocity(&self, body: BodyHandle) -> Result<Vec3, PhysicsError>;

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError>;

    fn position(&self, body: BodyHandle) -> Result<Vec3, PhysicsError>;

    /// Rigidly attaches `follower` to `anchor` at their current offset
    fn lock_constraint(&mut self, anchor: BodyHandle, follower: BodyHandle)
        -> Result<(), PhysicsError>;

    /// Starts reporting begin/end contacts of `sensor` from [`PhysicsWorld::step`]
    fn watch_contacts(&mut self, sensor: BodyHandle) -> Result<(), PhysicsError>;

    /// Advances the world by `delta_ms` milliseconds
    fn step(&mut self, delta_ms: f32) -> Result<Vec<ContactEvent>, PhysicsError>;
}
