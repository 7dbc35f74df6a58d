//! Authoritative room server for a 3D multiplayer platformer, plus the
//! headless client pieces (interpolation buffer, input sampling, room connection).

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod map;
pub mod physics;
pub mod protocol;
pub mod util;
pub mod ws;
