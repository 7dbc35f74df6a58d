//! Headless client: room connection, intent sampling and snapshot interpolation

pub mod api;
pub mod connection;
pub mod input;
pub mod interpolation;
pub mod render;
pub mod session;

pub use api::{ApiClient, ApiError, Session};
pub use connection::{ConnectionError, RoomConnection};
pub use input::{InputSampler, Key, KeyState};
pub use interpolation::{Interpolate, InterpolatedState, InterpolationBuffer};
pub use render::{LogRenderer, StateRenderer};
pub use session::ClientSession;
