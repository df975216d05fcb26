use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::task::spawn_blocking;
use tracing::{info, warn};
use uuid::Uuid;

use tackboard_db::Database;
use tackboard_types::events::{GatewayCommand, GatewayEvent, Room};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How many chat messages are replayed to a connection joining a room.
const CHAT_REPLAY_LIMIT: u32 = 50;

/// Handle a pre-authenticated WebSocket connection. The token was already
/// validated at the HTTP upgrade layer, so we go straight to Ready and the
/// event loop.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
    nickname: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to gateway", nickname, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        nickname: nickname.clone(),
    };
    let Ok(ready_text) = serde_json::to_string(&ready) else {
        return;
    };
    if sender.send(Message::Text(ready_text.into())).await.is_err() {
        return;
    }

    // Register the per-user targeted channel; everything room-addressed for
    // this user flows through it.
    let (conn_id, mut user_rx) = dispatcher.register(user_id).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward dispatched events -> client, with heartbeat.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = user_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client.
    let dispatcher_recv = dispatcher.clone();
    let nickname_recv = nickname.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&dispatcher_recv, &db, user_id, &nickname_recv, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            nickname_recv,
                            user_id,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.disconnect(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", nickname, user_id);
}

async fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    user_id: Uuid,
    nickname: &str,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::Join { project_id } => {
            let member = {
                let db = db.clone();
                spawn_blocking(move || db.is_project_member(project_id, user_id)).await
            };
            match member {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    notice(dispatcher, user_id, "no access to this project", project_id).await;
                    return;
                }
                Ok(Err(e)) => {
                    warn!("{} ({}) join check failed: {}", nickname, user_id, e);
                    notice(dispatcher, user_id, "could not join room", project_id).await;
                    return;
                }
                Err(e) => {
                    warn!("spawn_blocking join error: {}", e);
                    return;
                }
            }

            dispatcher.join_room(project_id, user_id).await;

            // Replay recent chat to this connection only, oldest first.
            let replay = {
                let db = db.clone();
                spawn_blocking(move || db.recent_chat_messages(project_id, CHAT_REPLAY_LIMIT))
                    .await
            };
            match replay {
                Ok(Ok(messages)) => {
                    dispatcher
                        .publish(Room::User(user_id), GatewayEvent::ChatHistory(messages))
                        .await;
                }
                Ok(Err(e)) => {
                    warn!("{} ({}) chat replay failed: {}", nickname, user_id, e);
                }
                Err(e) => warn!("spawn_blocking join error: {}", e),
            }

            dispatcher
                .publish(
                    Room::Project(project_id),
                    GatewayEvent::Notice {
                        msg: format!("{} joined", nickname),
                        project_id: Some(project_id),
                    },
                )
                .await;
        }

        GatewayCommand::Leave { project_id } => {
            // Presence notices are symmetric: the leaver sees their own
            // departure because the notice goes out before unsubscribe.
            dispatcher
                .publish(
                    Room::Project(project_id),
                    GatewayEvent::Notice {
                        msg: format!("{} left", nickname),
                        project_id: Some(project_id),
                    },
                )
                .await;
            dispatcher.leave_room(project_id, user_id).await;
        }

        GatewayCommand::SendMessage {
            project_id,
            message,
        } => {
            let posted = {
                let db = db.clone();
                let nickname = nickname.to_string();
                spawn_blocking(move || {
                    db.post_chat_message(project_id, user_id, &nickname, &message)
                })
                .await
            };
            match posted {
                Ok(Ok(chat_message)) => {
                    dispatcher
                        .publish(Room::Project(project_id), GatewayEvent::Message(chat_message))
                        .await;
                }
                Ok(Err(e)) => {
                    notice(dispatcher, user_id, &e.to_string(), project_id).await;
                }
                Err(e) => warn!("spawn_blocking join error: {}", e),
            }
        }
    }
}

async fn notice(dispatcher: &Dispatcher, user_id: Uuid, msg: &str, project_id: Uuid) {
    dispatcher
        .publish(
            Room::User(user_id),
            GatewayEvent::Notice {
                msg: msg.to_string(),
                project_id: Some(project_id),
            },
        )
        .await;
}
