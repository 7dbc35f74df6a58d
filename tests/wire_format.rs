//! Byte-level wire shapes shared with browser clients

use serde_json::{json, Value};

use platformer_server::protocol::{
    Animation, ClientMessage, Direction, GameState, PlayerView, Position, ServerMessage,
};

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[test]
fn client_intents_use_integer_tags() {
    let set_direction = ClientMessage::SetDirection {
        direction: Direction::new(1.0, 0.0, -1.0),
    };
    assert_eq!(
        as_json(&set_direction.encode().unwrap()),
        json!({"type": 0, "direction": {"x": 1.0, "y": 0.0, "z": -1.0}})
    );

    let set_theta = ClientMessage::SetTheta { theta: 0.5 };
    assert_eq!(
        as_json(&set_theta.encode().unwrap()),
        json!({"type": 1, "theta": 0.5})
    );

    assert_eq!(
        as_json(&ClientMessage::Jump.encode().unwrap()),
        json!({"type": 2})
    );
}

#[test]
fn browser_payloads_decode() {
    let msg = ClientMessage::decode(br#"{"type":0,"direction":{"x":0,"y":0,"z":1}}"#).unwrap();
    assert_eq!(
        msg,
        ClientMessage::SetDirection {
            direction: Direction::new(0.0, 0.0, 1.0)
        }
    );

    assert!(ClientMessage::decode(br#"{"type":9}"#).is_err());
    assert!(ClientMessage::decode(br#"{"type":1}"#).is_err());
    assert!(ClientMessage::decode(&[0xff, 0xfe]).is_err());
}

#[test]
fn state_update_shape() {
    let update = ServerMessage::StateUpdate {
        state: GameState {
            players: vec![PlayerView {
                id: "u1".to_string(),
                position: Position::new(1.0, 2.0, 3.0),
                theta: 0.25,
                grounded: true,
                animation: Animation::RunBackward,
                is_moving: true,
            }],
        },
        ts: 1_700_000_000_000,
    };

    assert_eq!(
        as_json(&update.encode().unwrap()),
        json!({
            "type": 0,
            "state": {
                "players": [{
                    "id": "u1",
                    "position": {"x": 1.0, "y": 2.0, "z": 3.0},
                    "theta": 0.25,
                    "grounded": true,
                    "animation": "Running Backward",
                    "isMoving": true
                }]
            },
            "ts": 1_700_000_000_000u64
        })
    );
}
