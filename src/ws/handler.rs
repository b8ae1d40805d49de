//! WebSocket upgrade handler - the session gateway
//!
//! Each connection runs in its own task: a reader validates intents and
//! forwards them to the game server, a writer forwards broadcasts and direct
//! replies. Nothing here touches game state.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::collision::Point;
use crate::game::Command;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, Intent, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    state.sessions.open(connection_id);
    let (ws_sink, ws_stream) = socket.split();
    let broadcast_rx = state.game.subscribe();

    run_session(connection_id, &state, ws_sink, ws_stream, broadcast_rx).await;

    // Disconnect removes the player right away, ahead of the next tick
    if state
        .game
        .send(Command::Disconnect { connection_id })
        .await
        .is_err()
    {
        debug!(connection_id = %connection_id, "Game server gone during disconnect");
    }
    if let Some(session) = state.sessions.close(connection_id) {
        info!(
            connection_id = %connection_id,
            joined = session.joined,
            duration_ms = unix_millis().saturating_sub(session.connected_at),
            "WebSocket connection closed"
        );
    }
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMsg>(16);

    // Writer task: broadcasts and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                broadcast = broadcast_rx.recv() => match broadcast {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            connection_id = %connection_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(connection_id = %connection_id, "Broadcast channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> game server
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited input message");
                    continue;
                }

                let Some(command) = decode_command(connection_id, &text, &reply_tx) else {
                    continue;
                };
                if matches!(command, Command::Join { .. }) {
                    state.sessions.mark_joined(connection_id);
                }
                if state.game.send(command).await.is_err() {
                    debug!(connection_id = %connection_id, "Game server stopped");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Parse and validate one text frame into a game command.
/// Malformed frames and fields are logged and dropped.
fn decode_command(
    connection_id: Uuid,
    text: &str,
    reply_tx: &mpsc::Sender<ServerMsg>,
) -> Option<Command> {
    let msg = match serde_json::from_str::<ClientMsg>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
            return None;
        }
    };

    let intent = match Intent::try_from(msg) {
        Ok(intent) => intent,
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "Dropping malformed intent");
            return None;
        }
    };

    Some(match intent {
        Intent::Join { nickname } => Command::Join {
            connection_id,
            nickname,
            reply: reply_tx.clone(),
        },
        Intent::Move { x, y } => Command::Move {
            connection_id,
            target: Point::new(x, y),
        },
        Intent::Shoot { heading } => Command::Shoot {
            connection_id,
            heading,
        },
    })
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_frames() {
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();

        let join = decode_command(id, r#"{"type":"join","nickname":"kim"}"#, &tx);
        assert!(matches!(join, Some(Command::Join { ref nickname, .. }) if nickname == "kim"));

        let mv = decode_command(id, r#"{"type":"move","x":12,"y":34}"#, &tx);
        assert!(matches!(
            mv,
            Some(Command::Move { target, .. }) if target == Point::new(12.0, 34.0)
        ));

        let shoot = decode_command(id, r#"{"type":"shoot","x":1,"y":2,"angle":0.5}"#, &tx);
        assert!(matches!(shoot, Some(Command::Shoot { heading, .. }) if heading == 0.5));
    }

    #[test]
    fn drops_garbage_and_malformed_fields() {
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();

        assert!(decode_command(id, "not json", &tx).is_none());
        assert!(decode_command(id, r#"{"type":"teleport"}"#, &tx).is_none());
        assert!(decode_command(id, r#"{"type":"move","x":"left","y":3}"#, &tx).is_none());
        assert!(decode_command(id, r#"{"type":"shoot","angle":null}"#, &tx).is_none());
    }
}
