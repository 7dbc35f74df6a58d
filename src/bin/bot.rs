//! Headless bot: logs in anonymously, joins (or creates) a room and wanders around.
//!
//! Usage: `bot [room_id]`. `SERVER_URL` (default http://127.0.0.1:4000) and
//! `BOT_DURATION_SECS` (default 30) are read from the environment.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use platformer_server::client::{ApiClient, ClientSession, Key, KeyState, LogRenderer, RoomConnection};
use platformer_server::protocol::ServerMessage;
use platformer_server::util::time::{unix_millis, DEFAULT_INTERPOLATION_DELAY_MS};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Frames between scripted input changes
const INPUT_HOLD_FRAMES: u32 = 45;
const MOVEMENT_KEYS: [Key; 4] = [Key::W, Key::A, Key::S, Key::D];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let server_url =
        std::env::var("SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:4000".to_string());
    let duration_secs: u64 = std::env::var("BOT_DURATION_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let api = ApiClient::new(&server_url);
    let session = api.login_anonymous().await?;
    info!(user_id = %session.user_id, "Logged in");

    let room_id = match std::env::args().nth(1) {
        Some(room_id) => room_id,
        None => api.create_room(&session.token).await?,
    };
    info!(room_id = %room_id, "Joining room");

    let connection =
        RoomConnection::connect(&api.room_ws_url(&room_id, &session.token), &room_id).await?;

    // Hand snapshots from the reader task to the frame loop
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<ServerMessage>();
    connection.add_listener(move |msg| {
        let _ = update_tx.send(msg.clone());
    });

    let mut client = ClientSession::new(
        session.user_id.clone(),
        LogRenderer::new(60),
        DEFAULT_INTERPOLATION_DELAY_MS,
    );
    let mut keys = KeyState::default();
    let mut theta = 0.0_f32;
    let mut rng = rand::thread_rng();

    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    let mut frames = interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame_count: u32 = 0;

    while Instant::now() < deadline {
        frames.tick().await;

        while let Ok(msg) = update_rx.try_recv() {
            client.on_server_message(msg);
        }

        if frame_count % INPUT_HOLD_FRAMES == 0 {
            keys = KeyState::default();
            let key = MOVEMENT_KEYS[rng.gen_range(0..MOVEMENT_KEYS.len())];
            keys.press(key);
            if rng.gen_bool(0.3) {
                keys.press(Key::Space);
            }
            theta = rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        }
        frame_count = frame_count.wrapping_add(1);

        for intent in client.frame(unix_millis(), &keys, theta) {
            connection.send_message(&intent)?;
        }

        if !connection.is_connected() {
            warn!(room_id = %room_id, "Lost connection to room");
            break;
        }
    }

    info!(
        frames_rendered = client.renderer().frames(),
        "Bot finished"
    );
    connection.disconnect();
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
