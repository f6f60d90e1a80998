//! WebSocket upgrade handler and per-player session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::MatchInput;
use crate::http::middleware::verify_jwt;
use crate::matchmaking::{MatchAssignment, Pairing};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT token for authentication
    pub token: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Verify the identity token before upgrading; an invalid credential
    // never reaches the matchmaker.
    match verify_jwt(&query.token, &state.config.auth_jwt_secret) {
        Ok(claims) => {
            info!(player_id = %claims.sub, "WebSocket upgrade for authenticated player");
            ws.on_upgrade(move |socket| handle_socket(socket, claims.sub, state))
        }
        Err(e) => {
            error!(error = %e, "WebSocket auth failed");
            Response::builder()
                .status(401)
                .body("Unauthorized".into())
                .unwrap()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: Uuid, state: AppState) {
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let assignment = match state.matchmaker.enqueue_or_pair(player_id) {
        Pairing::Matched(assignment) => assignment,
        Pairing::Queued(assign_rx) => {
            match wait_for_opponent(player_id, assign_rx, &mut ws_stream, &state).await {
                Some(assignment) => assignment,
                None => {
                    info!(player_id = %player_id, "Disconnected while waiting for an opponent");
                    return;
                }
            }
        }
    };

    let announce = ServerMsg::MatchFound {
        room: assignment.match_id,
        role: assignment.side,
    };
    if let Err(e) = send_msg(&mut ws_sink, &announce).await {
        // Peer vanished between pairing and the announcement
        warn!(player_id = %player_id, error = %e, "Failed to announce match");
        let _ = assignment
            .input_tx
            .send(MatchInput::Disconnect {
                side: assignment.side,
            })
            .await;
        return;
    }

    run_session(player_id, assignment, ws_sink, ws_stream).await;

    // Covers the pairing/disconnect race: the ticket may still be queued
    state.matchmaker.cancel(player_id);

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Park the connection until the matchmaker delivers an assignment.
/// Returns None if the player disconnects first (the ticket is removed, no
/// event owed since no opponent ever existed).
async fn wait_for_opponent(
    player_id: Uuid,
    mut assign_rx: tokio::sync::oneshot::Receiver<MatchAssignment>,
    ws_stream: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Option<MatchAssignment> {
    loop {
        tokio::select! {
            assignment = &mut assign_rx => {
                return assignment.ok();
            }
            frame = ws_stream.next() => {
                match frame {
                    // No match exists yet, inbound gameplay frames mean nothing
                    Some(Ok(Message::Text(_) | Message::Binary(_) | Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        state.matchmaker.cancel(player_id);
                        return None;
                    }
                    Some(Err(e)) => {
                        debug!(player_id = %player_id, error = %e, "WebSocket error while queued");
                        state.matchmaker.cancel(player_id);
                        return None;
                    }
                }
            }
        }
    }
}

/// Relay loop for a bound connection: match events out, paddle moves in.
/// A single loop owns the sink so parse errors can be answered on the same
/// socket without racing the event forwarder.
async fn run_session(
    player_id: Uuid,
    mut assignment: MatchAssignment,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    let rate_limiter = PlayerRateLimiter::new();
    let side = assignment.side;

    loop {
        tokio::select! {
            event = assignment.events.recv() => {
                match event {
                    Ok(msg) => {
                        let terminal = matches!(msg, ServerMsg::MatchEnd { .. });
                        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                            break;
                        }
                        if terminal {
                            // The match is over; nothing further to relay
                            let _ = ws_sink.send(Message::Close(None)).await;
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(player_id = %player_id, lagged_count = n, "Client lagged, skipping {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Match task is gone; the terminal event was already
                        // drained from the buffer or never owed
                        return;
                    }
                }
            }
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !rate_limiter.check_input() {
                            warn!(player_id = %player_id, "Rate limited input message");
                            continue;
                        }

                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(ClientMsg::Move { y_position }) => {
                                let input = MatchInput::Move { side, y_position };
                                // A closed channel means the match already
                                // finished; late inputs are no-ops
                                if assignment.input_tx.send(input).await.is_err() {
                                    debug!(player_id = %player_id, "Input for finished match dropped");
                                }
                            }
                            Err(e) => {
                                warn!(player_id = %player_id, error = %e, "Malformed client message");
                                let err = ServerMsg::Error {
                                    message: "Malformed message".to_string(),
                                };
                                if send_msg(&mut ws_sink, &err).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!(player_id = %player_id, "Received binary message, ignoring");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        info!(player_id = %player_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        error!(player_id = %player_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    // Transport dropped mid-match: the match treats it as a forfeit
    let _ = assignment
        .input_tx
        .send(MatchInput::Disconnect { side })
        .await;
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
