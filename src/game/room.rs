//! Room simulation: one physics world and player roster per room

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::map::{self, GROUND_NAME, GROUND_SIZE, GROUND_THICKNESS, PLATFORMS};
use crate::physics::{
    BodyHandle, BodySpec, BoxSpec, ContactEvent, ContactPhase, PhysicsError, PhysicsWorld, Vec3,
};
use crate::protocol::{ClientMessage, GameState};

use super::player::{Player, PLAYER_JUMP_VELOCITY};

/// Opaque room identifier
pub type RoomId = String;

/// Spawn point above the floor
pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
pub const PLAYER_SIZE: Vec3 = Vec3::new(0.5, 1.0, 0.5);
pub const SENSOR_SIZE: Vec3 = Vec3::new(0.2, 0.2, 0.2);

/// The authoritative simulation of one room
pub struct Room<W> {
    id: RoomId,
    world: W,
    platforms: Vec<BodyHandle>,
    /// Join order
    players: Vec<Player>,
}

impl<W: PhysicsWorld> Room<W> {
    /// Materializes the floor and platform colliders into `world`
    pub fn new(id: RoomId, mut world: W) -> Self {
        let mut platforms = Vec::with_capacity(PLATFORMS.len() + 1);

        platforms.push(world.add_static_box(BoxSpec {
            name: GROUND_NAME.to_string(),
            center: Vec3::ZERO,
            size: Vec3::new(GROUND_SIZE, GROUND_THICKNESS, GROUND_SIZE),
        }));

        for (i, platform) in PLATFORMS.iter().enumerate() {
            platforms.push(world.add_static_box(BoxSpec {
                name: map::platform_name(i),
                center: Vec3::new(platform.x, platform.y, platform.z),
                size: Vec3::new(platform.w, platform.h, platform.d),
            }));
        }

        info!(room_id = %id, colliders = platforms.len(), "Room created");

        Self {
            id,
            world,
            platforms,
            players: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn platforms(&self) -> &[BodyHandle] {
        &self.platforms
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == user_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Spawns a player. Returns `false` if the user is already in the room.
    pub fn subscribe_user(&mut self, user_id: &str) -> Result<bool, PhysicsError> {
        if self.player(user_id).is_some() {
            debug!(room_id = %self.id, user_id = %user_id, "Player already in room");
            return Ok(false);
        }

        let body = self.world.add_dynamic_body(BodySpec {
            name: format!("player_{}", user_id),
            center: SPAWN_POSITION,
            size: PLAYER_SIZE,
            sensor: false,
        });
        let sensor = self.world.add_dynamic_body(BodySpec {
            name: format!("sensor_{}", user_id),
            center: SPAWN_POSITION - Vec3::new(0.0, PLAYER_SIZE.y * 0.5, 0.0),
            size: SENSOR_SIZE,
            sensor: true,
        });

        let attached = self
            .world
            .lock_constraint(body, sensor)
            .and_then(|_| self.world.watch_contacts(sensor));
        if let Err(e) = attached {
            self.world.destroy_body(sensor);
            self.world.destroy_body(body);
            return Err(e);
        }

        self.players
            .push(Player::new(user_id.to_string(), body, sensor));

        info!(
            room_id = %self.id,
            user_id = %user_id,
            player_count = self.players.len(),
            "Player joined room"
        );
        Ok(true)
    }

    /// Removes a player and releases its bodies. Returns `false` if the user was not in the room.
    pub fn unsubscribe_user(&mut self, user_id: &str) -> bool {
        let Some(idx) = self.players.iter().position(|p| p.id == user_id) else {
            return false;
        };

        let player = self.players.remove(idx);
        self.world.destroy_body(player.sensor);
        self.world.destroy_body(player.body);

        info!(
            room_id = %self.id,
            user_id = %user_id,
            player_count = self.players.len(),
            "Player left room"
        );
        true
    }

    /// Decodes and applies one intent. Unknown players and undecodable payloads are dropped.
    pub fn on_message(&mut self, user_id: &str, payload: &[u8]) {
        if self.player(user_id).is_none() {
            debug!(room_id = %self.id, user_id = %user_id, "Message for unknown player dropped");
            return;
        }

        match ClientMessage::decode(payload) {
            Ok(msg) => self.apply_intent(user_id, msg),
            Err(e) => {
                debug!(room_id = %self.id, user_id = %user_id, error = %e, "Undecodable message dropped");
            }
        }
    }

    pub fn apply_intent(&mut self, user_id: &str, msg: ClientMessage) {
        let Some(player) = self.players.iter_mut().find(|p| p.id == user_id) else {
            return;
        };

        match msg {
            ClientMessage::SetDirection { direction } => {
                player.direction = direction;
            }
            ClientMessage::SetTheta { theta } => {
                player.theta = theta;
            }
            ClientMessage::Jump => {
                if !player.grounded {
                    return;
                }
                let body = player.body;
                let jumped = self.world.velocity(body).and_then(|v| {
                    self.world
                        .set_velocity(body, Vec3::new(v.x, PLAYER_JUMP_VELOCITY, v.z))
                });
                if let Err(e) = jumped {
                    warn!(room_id = %self.id, user_id = %user_id, error = %e, "Jump failed");
                }
            }
        }
    }

    /// Steers every player, refreshes display state, then steps the world once
    pub fn tick(&mut self, delta: Duration) -> Result<(), PhysicsError> {
        let delta_secs = delta.as_secs_f32();

        for player in &mut self.players {
            let current = self.world.velocity(player.body)?;
            self.world
                .set_velocity(player.body, player.steered_velocity(current, delta_secs))?;
            player.refresh_animation();
        }

        let contacts = self.world.step(delta_secs * 1000.0)?;
        self.apply_contacts(contacts);
        Ok(())
    }

    fn apply_contacts(&mut self, contacts: Vec<ContactEvent>) {
        for contact in contacts {
            if !map::is_ground(&contact.other) {
                continue;
            }
            if let Some(player) = self.players.iter_mut().find(|p| p.sensor == contact.sensor) {
                player.grounded = contact.phase == ContactPhase::Begin;
            }
        }
    }

    /// Public projection of the roster, in join order
    pub fn snapshot(&self) -> Result<GameState, PhysicsError> {
        let players = self
            .players
            .iter()
            .map(|p| self.world.position(p.body).map(|position| p.view(position)))
            .collect::<Result<Vec<_>, PhysicsError>>()?;
        Ok(GameState { players })
    }
}
