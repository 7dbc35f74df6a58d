//! Authoritative room simulation: players, rooms, the room registry and the tick loop

pub mod player;
pub mod registry;
pub mod room;
pub mod scheduler;

pub use player::{Player, UserId};
pub use registry::{RoomCommand, RoomHandle, RoomRegistry};
pub use room::{Room, RoomId};
pub use scheduler::{TickReport, TickScheduler};
