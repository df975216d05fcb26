use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use tackboard_types::events::{GatewayEvent, Room};

/// Routes committed domain events to connected clients. Holds the room
/// registry (project id -> subscribed users) and one targeted channel per
/// user; publishing is fire-and-forget, so a dead or absent subscriber
/// never affects the mutation that triggered the event.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,

    /// Room membership: project_id -> subscribed user ids
    rooms: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                user_channels: RwLock::new(HashMap::new()),
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection's targeted channel. A second connection for
    /// the same user takes the channel over; the conn_id lets the old
    /// connection's teardown recognize it no longer owns anything.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Tear down a connection, but only if conn_id still owns the user's
    /// channel — a newer connection may have taken over.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) {
        let is_current = {
            let channels = self.inner.user_channels.read().await;
            channels
                .get(&user_id)
                .is_some_and(|(current, _)| *current == conn_id)
        };
        if !is_current {
            return;
        }

        {
            let mut rooms = self.inner.rooms.write().await;
            rooms.retain(|_, members| {
                members.remove(&user_id);
                !members.is_empty()
            });
        }

        let mut channels = self.inner.user_channels.write().await;
        if channels
            .get(&user_id)
            .is_some_and(|(current, _)| *current == conn_id)
        {
            channels.remove(&user_id);
        }
    }

    /// Subscribe a user to a project room. Membership checks happen before
    /// this is called.
    pub async fn join_room(&self, project_id: Uuid, user_id: Uuid) {
        self.inner
            .rooms
            .write()
            .await
            .entry(project_id)
            .or_default()
            .insert(user_id);
    }

    pub async fn leave_room(&self, project_id: Uuid, user_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(members) = rooms.get_mut(&project_id) {
            members.remove(&user_id);
            if members.is_empty() {
                rooms.remove(&project_id);
            }
        }
    }

    /// Deliver an event to everyone in a room. At-most-once: with no
    /// subscribers the event is simply dropped.
    pub async fn publish(&self, room: Room, event: GatewayEvent) {
        match room {
            Room::User(user_id) => {
                self.send_to_user(user_id, event).await;
            }
            Room::Project(project_id) => {
                let members: Vec<Uuid> = {
                    let rooms = self.inner.rooms.read().await;
                    match rooms.get(&project_id) {
                        Some(members) => members.iter().copied().collect(),
                        None => return,
                    }
                };

                let channels = self.inner.user_channels.read().await;
                for user_id in members {
                    if let Some((_, tx)) = channels.get(&user_id) {
                        let _ = tx.send(event.clone());
                    }
                }
            }
        }
    }

    async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tackboard_types::models::ChatMessage;

    fn message_in(project_id: Uuid, user_id: Uuid) -> GatewayEvent {
        GatewayEvent::Message(ChatMessage {
            project_id,
            user_id,
            nickname: "u1".into(),
            message: "hi".into(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn room_events_reach_only_joined_users() {
        let dispatcher = Dispatcher::new();
        let project = Uuid::new_v4();
        let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let (_, mut rx1) = dispatcher.register(u1).await;
        let (_, mut rx2) = dispatcher.register(u2).await;
        let (_, mut rx3) = dispatcher.register(u3).await;

        dispatcher.join_room(project, u1).await;
        dispatcher.join_room(project, u2).await;

        dispatcher
            .publish(Room::Project(project), message_in(project, u1))
            .await;

        assert!(matches!(rx1.try_recv(), Ok(GatewayEvent::Message(_))));
        assert!(
            matches!(rx2.try_recv(), Ok(GatewayEvent::Message(m)) if m.message == "hi"),
        );
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_room_targets_one_user() {
        let dispatcher = Dispatcher::new();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        let (_, mut rx1) = dispatcher.register(u1).await;
        let (_, mut rx2) = dispatcher.register(u2).await;

        dispatcher
            .publish(
                Room::User(u2),
                GatewayEvent::Notice {
                    msg: "for you".into(),
                    project_id: None,
                },
            )
            .await;

        assert!(rx1.try_recv().is_err());
        assert!(matches!(rx2.try_recv(), Ok(GatewayEvent::Notice { .. })));
    }

    #[tokio::test]
    async fn leaving_a_room_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let project = Uuid::new_v4();
        let u1 = Uuid::new_v4();

        let (_, mut rx1) = dispatcher.register(u1).await;
        dispatcher.join_room(project, u1).await;
        dispatcher.leave_room(project, u1).await;

        dispatcher
            .publish(Room::Project(project), message_in(project, u1))
            .await;

        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_connection_cannot_tear_down_a_takeover() {
        let dispatcher = Dispatcher::new();
        let project = Uuid::new_v4();
        let u1 = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register(u1).await;
        let (_new_conn, mut new_rx) = dispatcher.register(u1).await;
        dispatcher.join_room(project, u1).await;

        // The old connection's teardown must not disturb the new one.
        dispatcher.disconnect(u1, old_conn).await;

        dispatcher
            .publish(Room::Project(project), message_in(project, u1))
            .await;
        assert!(matches!(new_rx.try_recv(), Ok(GatewayEvent::Message(_))));
    }
}
