//! WebSocket connection to one room

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::game::RoomId;
use crate::protocol::{ClientMessage, ServerMessage, WireError};

/// Called from the connection's reader task for every decoded server message
pub type UpdateListener = Box<dyn FnMut(&ServerMessage) + Send>;

type Listeners = Arc<Mutex<Vec<UpdateListener>>>;

pub struct RoomConnection {
    room_id: RoomId,
    outbound: mpsc::UnboundedSender<Message>,
    listeners: Listeners,
    reader: JoinHandle<()>,
}

impl RoomConnection {
    /// Open the room socket at `url` (see `ApiClient::room_ws_url`)
    pub async fn connect(url: &str, room_id: &str) -> Result<Self, ConnectionError> {
        let (socket, _response) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();
        info!(room_id = %room_id, "Connected to room");

        // Writer task: queued frames -> socket
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    debug!(error = %e, "Room socket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader task: socket -> listeners
        let listeners: Listeners = Arc::new(Mutex::new(Vec::new()));
        let reader_listeners = listeners.clone();
        let reader_room = room_id.to_string();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Binary(data)) => dispatch(&reader_listeners, &data),
                    Ok(Message::Text(text)) => dispatch(&reader_listeners, text.as_bytes()),
                    Ok(Message::Close(frame)) => {
                        warn!(room_id = %reader_room, close = ?frame, "Room connection closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(room_id = %reader_room, error = %e, "Room connection error");
                        break;
                    }
                }
            }
            info!(room_id = %reader_room, "Disconnected from room");
        });

        Ok(Self {
            room_id: room_id.to_string(),
            outbound,
            listeners,
            reader,
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnMut(&ServerMessage) + Send + 'static,
    {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Fire-and-forget: queues the intent as a binary JSON frame
    pub fn send_message(&self, msg: &ClientMessage) -> Result<(), ConnectionError> {
        let frame = Message::Binary(msg.encode()?);
        self.outbound
            .send(frame)
            .map_err(|_| ConnectionError::Closed)
    }

    pub fn is_connected(&self) -> bool {
        !self.reader.is_finished() && !self.outbound.is_closed()
    }

    pub fn disconnect(self) {
        self.listeners.lock().clear();
        let _ = self.outbound.send(Message::Close(None));
        info!(room_id = %self.room_id, "Leaving room");
    }
}

fn dispatch(listeners: &Listeners, data: &[u8]) {
    match ServerMessage::decode(data) {
        Ok(msg) => {
            for listener in listeners.lock().iter_mut() {
                listener(&msg);
            }
        }
        Err(e) => debug!(error = %e, "Dropping undecodable server message"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("Connection closed")]
    Closed,
}
