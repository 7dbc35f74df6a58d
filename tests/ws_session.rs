//! WebSocket sessions against a live router and tick loop

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use platformer_server::app::AppState;
use platformer_server::auth::issue_token;
use platformer_server::config::Config;
use platformer_server::game::TickScheduler;
use platformer_server::http::build_router;
use platformer_server::protocol::{ClientMessage, Direction, GameState, ServerMessage};

const SECRET: &str = "ws-secret";
const WAIT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let config = Config::from_lookup(|key| match key {
        "APP_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(config);

    tokio::spawn(TickScheduler::new(state.registry.clone(), 60).run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state.clone());
    tokio::spawn(async move { axum::serve(listener, router).await });

    (addr, state)
}

fn ws_url(addr: SocketAddr, room_id: &str, token: &str) -> String {
    format!("ws://{}/rooms/{}/ws?token={}", addr, room_id, token)
}

async fn connect(addr: SocketAddr, room_id: &str, user_id: &str) -> Client {
    let token = issue_token(user_id, SECRET, Duration::from_secs(60)).unwrap();
    let (ws, _) = connect_async(ws_url(addr, room_id, &token)).await.unwrap();
    ws
}

/// Reads snapshots until one satisfies `accept`; every snapshot must arrive as a binary frame
async fn wait_for_state(ws: &mut Client, accept: impl Fn(&GameState) -> bool) -> GameState {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(payload))) => {
                    let ServerMessage::StateUpdate { state, .. } =
                        ServerMessage::decode(&payload).unwrap();
                    if accept(&state) {
                        return state;
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    })
    .await
    .expect("no matching snapshot")
}

#[tokio::test]
async fn upgrade_with_bad_token_is_rejected() {
    let (addr, state) = spawn_server().await;

    let err = connect_async(ws_url(addr, "lobby", "not-a-token"))
        .await
        .unwrap_err();

    match err {
        WsError::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP rejection, got {:?}", other),
    }
    assert_eq!(state.registry.active_rooms(), 0);
}

#[tokio::test]
async fn session_streams_snapshots_and_forwards_intents() {
    let (addr, state) = spawn_server().await;
    let mut ws = connect(addr, "lobby", "alice").await;

    let snapshot = wait_for_state(&mut ws, |s| s.player("alice").is_some()).await;
    assert_eq!(snapshot.players.len(), 1);

    let theta = String::from_utf8(ClientMessage::SetTheta { theta: 1.25 }.encode().unwrap()).unwrap();
    ws.send(Message::Text(theta)).await.unwrap();
    let direction = ClientMessage::SetDirection {
        direction: Direction::new(0.0, 0.0, 1.0),
    };
    ws.send(Message::Binary(direction.encode().unwrap()))
        .await
        .unwrap();

    let snapshot = wait_for_state(&mut ws, |s| {
        s.player("alice").map_or(false, |p| p.theta == 1.25)
    })
    .await;
    assert_eq!(snapshot.player("alice").unwrap().theta, 1.25);

    let direction = state
        .registry
        .inspect("lobby", |room| room.player("alice").map(|p| p.direction))
        .flatten();
    assert_eq!(direction, Some(Direction::new(0.0, 0.0, 1.0)));

    ws.close(None).await.unwrap();
    drop(ws);

    let deadline = Instant::now() + WAIT;
    while !state.registry.list_subscribers("lobby").is_empty() {
        assert!(Instant::now() < deadline, "player was never unsubscribed");
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn session_ends_when_room_is_removed() {
    let (addr, state) = spawn_server().await;
    let mut ws = connect(addr, "doomed", "alice").await;
    wait_for_state(&mut ws, |s| s.player("alice").is_some()).await;

    assert!(state.registry.remove_room("doomed"));

    let ended = timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(_))) => continue,
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "session outlived its room");
}
