use crate::alerts::AlertHub;
use crate::api::rest::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Upgrade a monitoring client onto the live alert stream. The session is
/// registered before the upgrade so a full registry rejects the connection
/// instead of accepting and closing it.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    match state.hub.register().await {
        Ok((session_id, rx)) => {
            let hub = Arc::clone(&state.hub);
            ws.on_upgrade(move |socket| handle_socket(socket, hub, session_id, rx))
        }
        Err(e) => {
            warn!("Rejecting monitoring connection: {}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Handle one monitoring connection
async fn handle_socket(
    socket: WebSocket,
    hub: Arc<AlertHub>,
    session_id: Uuid,
    mut rx: mpsc::Receiver<String>,
) {
    info!("Monitoring session {} connected", session_id);

    // Split the socket into sender and receiver
    let (sender, mut receiver) = socket.split();

    // Create a Mutex-wrapped sender to share between tasks
    let sender = Arc::new(tokio::sync::Mutex::new(sender));
    let sender_clone = sender.clone();

    // Task to forward hub alerts to the client
    let send_task = tokio::spawn(async move {
        while let Some(alert) = rx.recv().await {
            if let Err(e) = sender_clone.lock().await.send(Message::Text(alert)).await {
                debug!("Failed to write alert to client: {}", e);
                break;
            }
        }
    });

    // Task to watch the client side; alerts flow one way, so only pings
    // and teardown matter here
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Ping(ping) => {
                    // Respond to ping with pong
                    if let Err(e) = sender.lock().await.send(Message::Pong(ping)).await {
                        error!("Failed to send pong: {}", e);
                        break;
                    }
                }
                Message::Close(_) => {
                    info!("Client closed the connection");
                    break;
                }
                Message::Text(_) | Message::Binary(_) => {
                    warn!("Unexpected message from monitoring client");
                }
                Message::Pong(_) => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = send_task => debug!("Alert forward task completed"),
        _ = recv_task => debug!("Client receive task completed"),
    }

    // Dropping the registration closes the session's queue; the send task
    // then drains out on its own
    hub.unregister(&session_id).await;

    info!("Monitoring session {} closed", session_id);
}
