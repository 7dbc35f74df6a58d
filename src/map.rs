//! Static level layout shared by the server (collision) and clients (rendering)

use serde::{Deserialize, Serialize};

/// Name of the floor collider; every collider whose name contains it counts as ground
pub const GROUND_NAME: &str = "ground";

/// Floor is a GROUND_SIZE x GROUND_THICKNESS x GROUND_SIZE box centered at the origin
pub const GROUND_SIZE: f32 = 40.0;
pub const GROUND_THICKNESS: f32 = 1.0;

/// Axis-aligned static box, `(x, y, z)` is the center and `(w, h, d)` the full extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub h: f32,
    pub d: f32,
}

const fn platform(x: f32, y: f32, z: f32, w: f32, h: f32, d: f32) -> Platform {
    Platform { x, y, z, w, h, d }
}

pub const PLATFORMS: [Platform; 10] = [
    // Stair pillars
    platform(-9.0, 1.0, 10.0, 4.0, 2.0, 4.0),
    platform(-3.0, 1.5, 10.0, 4.0, 3.0, 4.0),
    platform(3.0, 2.0, 10.0, 4.0, 4.0, 4.0),
    platform(9.0, 2.5, 10.0, 4.0, 5.0, 4.0),
    // Floating platforms
    platform(9.0, 5.0, 1.0, 4.0, 1.0, 8.0),
    platform(3.0, 6.0, 1.0, 4.0, 1.0, 4.0),
    platform(3.0, 7.0, -5.0, 4.0, 1.0, 4.0),
    platform(-3.0, 8.0, -5.0, 4.0, 1.0, 4.0),
    platform(-3.0, 9.0, 1.0, 4.0, 1.0, 4.0),
    platform(-3.0, 10.0, 7.0, 4.0, 1.0, 4.0),
];

/// Collider name for the platform at `index`
pub fn platform_name(index: usize) -> String {
    format!("{}_{}", GROUND_NAME, index)
}

pub fn is_ground(collider_name: &str) -> bool {
    collider_name.contains(GROUND_NAME)
}
