//! Wire protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every message is a UTF-8 JSON object carried in a binary frame. The `type` field is an
//! integer discriminant shared by both ends:
//! - client → server: `0` = SetDirection, `1` = SetTheta, `2` = Jump
//! - server → client: `0` = StateUpdate

use serde::{Deserialize, Serialize};

const SET_DIRECTION: u8 = 0;
const SET_THETA: u8 = 1;
const JUMP: u8 = 2;

const STATE_UPDATE: u8 = 0;

/// Movement intent, each component in {-1, 0, 1}
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    /// Strafe: 1 = left, -1 = right
    pub x: f32,
    pub y: f32,
    /// Forward (1) / backward (-1)
    pub z: f32,
}

impl Direction {
    pub const ZERO: Direction = Direction {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// World-space position of a player
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise linear interpolation
    pub fn lerp(self, to: Position, t: f32) -> Position {
        Position {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            z: self.z + (to.z - self.z) * t,
        }
    }
}

/// Display animation derived from direction and grounded state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Animation {
    #[serde(rename = "Idle")]
    Idle,
    #[serde(rename = "Slow Run")]
    Run,
    #[serde(rename = "Running Backward")]
    RunBackward,
    #[default]
    #[serde(rename = "Falling Idle")]
    Fall,
}

impl Animation {
    pub fn is_moving(self) -> bool {
        matches!(self, Animation::Run | Animation::RunBackward)
    }

    pub fn name(self) -> &'static str {
        match self {
            Animation::Idle => "Idle",
            Animation::Run => "Slow Run",
            Animation::RunBackward => "Running Backward",
            Animation::Fall => "Falling Idle",
        }
    }
}

/// Public view of one player inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub position: Position,
    /// Facing angle in radians
    pub theta: f32,
    pub grounded: bool,
    pub animation: Animation,
    pub is_moving: bool,
}

/// Full public state of a room at one tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Players in join order
    pub players: Vec<PlayerView>,
}

impl GameState {
    pub fn player(&self, id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// Wire (de)serialization errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message type {0}")]
    UnknownType(u8),

    #[error("Message type {kind} is missing field `{field}`")]
    MissingField { kind: u8, field: &'static str },

    /// Out-of-range JSON numbers decode to `inf` in `f32`
    #[error("Message type {kind} has a non-finite `{field}`")]
    NonFinite { kind: u8, field: &'static str },
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClientMessage", into = "RawClientMessage")]
pub enum ClientMessage {
    /// Replace the stored movement intent
    SetDirection { direction: Direction },
    /// Replace the stored facing angle
    SetTheta { theta: f32 },
    /// Jump, honored only while grounded
    Jump,
}

impl ClientMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Serialize, Deserialize)]
struct RawClientMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theta: Option<f32>,
}

impl TryFrom<RawClientMessage> for ClientMessage {
    type Error = WireError;

    fn try_from(raw: RawClientMessage) -> Result<Self, Self::Error> {
        match raw.kind {
            SET_DIRECTION => {
                let direction = raw.direction.ok_or(WireError::MissingField {
                    kind: raw.kind,
                    field: "direction",
                })?;
                if !direction.is_finite() {
                    return Err(WireError::NonFinite {
                        kind: raw.kind,
                        field: "direction",
                    });
                }
                Ok(ClientMessage::SetDirection { direction })
            }
            SET_THETA => {
                let theta = raw.theta.ok_or(WireError::MissingField {
                    kind: raw.kind,
                    field: "theta",
                })?;
                if !theta.is_finite() {
                    return Err(WireError::NonFinite {
                        kind: raw.kind,
                        field: "theta",
                    });
                }
                Ok(ClientMessage::SetTheta { theta })
            }
            JUMP => Ok(ClientMessage::Jump),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

impl From<ClientMessage> for RawClientMessage {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::SetDirection { direction } => Self {
                kind: SET_DIRECTION,
                direction: Some(direction),
                theta: None,
            },
            ClientMessage::SetTheta { theta } => Self {
                kind: SET_THETA,
                direction: None,
                theta: Some(theta),
            },
            ClientMessage::Jump => Self {
                kind: JUMP,
                direction: None,
                theta: None,
            },
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawServerMessage", into = "RawServerMessage")]
pub enum ServerMessage {
    /// Full room snapshot, `ts` is wall-clock epoch milliseconds
    StateUpdate { state: GameState, ts: u64 },
}

impl ServerMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Serialize, Deserialize)]
struct RawServerMessage {
    #[serde(rename = "type")]
    kind: u8,
    state: GameState,
    ts: u64,
}

impl TryFrom<RawServerMessage> for ServerMessage {
    type Error = WireError;

    fn try_from(raw: RawServerMessage) -> Result<Self, Self::Error> {
        match raw.kind {
            STATE_UPDATE => Ok(ServerMessage::StateUpdate {
                state: raw.state,
                ts: raw.ts,
            }),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

impl From<ServerMessage> for RawServerMessage {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::StateUpdate { state, ts } => Self {
                kind: STATE_UPDATE,
                state,
                ts,
            },
        }
    }
}
