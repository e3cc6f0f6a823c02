//! Presence registry: live connections and room occupancy.
//!
//! Process-local state only; it is rebuilt from nothing on restart
//! (reconnecting clients simply rejoin). All mutation goes through the
//! operations below, which are pure in-memory map updates guarded by a
//! single short-lived mutex. The lock is never held across store or
//! generator awaits; per-room serialization of whole events is the
//! coordinator's job (`RoomLocks`), not this registry's.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, RoomId, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// What the registry knows about one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub username: Username,
    /// `None` until a join completes.
    pub room_id: Option<RoomId>,
}

#[derive(Default)]
struct PresenceState {
    connections: HashMap<ConnectionId, ConnectionInfo>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl PresenceState {
    /// Detach a connection from its current room, evicting the room
    /// entry if it becomes empty. Returns the room left, if any.
    fn detach_from_room(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        let info = self.connections.get_mut(connection_id)?;
        let room_id = info.room_id.take()?;
        if let Some(members) = self.rooms.get_mut(&room_id) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
        Some(room_id)
    }
}

/// Owned registry of live connections, created at process start and
/// torn down at shutdown.
pub struct PresenceRegistry {
    state: Mutex<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PresenceState::default()),
        }
    }

    /// Register a connection with no room. Idempotent per connection
    /// identifier: re-registering an existing connection is a no-op.
    pub async fn register(&self, connection_id: ConnectionId, user_id: UserId, username: Username) {
        let mut state = self.state.lock().await;
        state.connections.entry(connection_id).or_insert(ConnectionInfo {
            user_id,
            username,
            room_id: None,
        });
    }

    /// Move a connection into a room. A connection belongs to at most
    /// one room at a time, so any previous room association is dropped.
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), PresenceError> {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&connection_id) {
            return Err(PresenceError::UnknownConnection(connection_id));
        }
        let _ = state.detach_from_room(&connection_id);
        if let Some(info) = state.connections.get_mut(&connection_id) {
            info.room_id = Some(room_id.clone());
        }
        state.rooms.entry(room_id).or_default().insert(connection_id);
        Ok(())
    }

    /// Remove a connection from its current room. No-op if the
    /// connection is not in a room. Returns the room left, if any.
    pub async fn leave_room(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        let mut state = self.state.lock().await;
        state.detach_from_room(connection_id)
    }

    /// Full teardown: leave the current room and deregister. Called on
    /// disconnect; idempotent.
    pub async fn remove(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        let mut state = self.state.lock().await;
        let _ = state.detach_from_room(connection_id);
        state.connections.remove(connection_id)
    }

    /// Snapshot of the live connections of a room, used for broadcast
    /// fan-out. Empty if the room has no live connections.
    pub async fn live_connections(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Look up a connection's identity and current room.
    pub async fn who_is(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        let state = self.state.lock().await;
        state.connections.get(connection_id).cloned()
    }

    /// Snapshot of every room's live-connection set, for diagnostics.
    pub async fn rooms_snapshot(&self) -> Vec<(RoomId, Vec<ConnectionId>)> {
        let state = self.state.lock().await;
        state
            .rooms
            .iter()
            .map(|(room_id, members)| (room_id.clone(), members.iter().copied().collect()))
            .collect()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity(name: &str) -> (UserId, Username) {
        (
            UserId::new(format!("{name}-id")).unwrap(),
            Username::new(name).unwrap(),
        )
    }

    async fn registered(registry: &PresenceRegistry, name: &str) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        let (user_id, username) = test_identity(name);
        registry.register(connection_id, user_id, username).await;
        connection_id
    }

    #[tokio::test]
    async fn test_register_starts_without_room() {
        // テスト項目: 登録直後の接続はどのルームにも属していない
        // given (前提条件):
        let registry = PresenceRegistry::new();

        // when (操作):
        let connection_id = registered(&registry, "alice").await;

        // then (期待する結果):
        let info = registry.who_is(&connection_id).await.unwrap();
        assert_eq!(info.username.as_str(), "alice");
        assert_eq!(info.room_id, None);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        // テスト項目: 同じ接続 ID の再登録は no-op になる
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let connection_id = registered(&registry, "alice").await;
        let room_id = RoomId::new("r1").unwrap();
        registry.join_room(connection_id, room_id.clone()).await.unwrap();

        // when (操作): 同じ接続を再登録
        let (user_id, username) = test_identity("alice");
        registry.register(connection_id, user_id, username).await;

        // then (期待する結果): ルーム割り当ては保持される
        let info = registry.who_is(&connection_id).await.unwrap();
        assert_eq!(info.room_id, Some(room_id));
    }

    #[tokio::test]
    async fn test_join_room_unknown_connection() {
        // テスト項目: 未登録の接続の join はエラーになる
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let connection_id = ConnectionId::generate();

        // when (操作):
        let result = registry
            .join_room(connection_id, RoomId::new("r1").unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(PresenceError::UnknownConnection(connection_id)));
    }

    #[tokio::test]
    async fn test_join_room_replaces_previous_room() {
        // テスト項目: 別ルームへの join で以前のルームから外れる
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let connection_id = registered(&registry, "alice").await;
        let first = RoomId::new("r1").unwrap();
        let second = RoomId::new("r2").unwrap();
        registry.join_room(connection_id, first.clone()).await.unwrap();

        // when (操作):
        registry.join_room(connection_id, second.clone()).await.unwrap();

        // then (期待する結果):
        assert!(registry.live_connections(&first).await.is_empty());
        assert_eq!(registry.live_connections(&second).await, vec![connection_id]);
        let info = registry.who_is(&connection_id).await.unwrap();
        assert_eq!(info.room_id, Some(second));
    }

    #[tokio::test]
    async fn test_leave_room_without_room_is_noop() {
        // テスト項目: ルームに居ない接続の leave は no-op になる
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let connection_id = registered(&registry, "alice").await;

        // when (操作):
        let left = registry.leave_room(&connection_id).await;

        // then (期待する結果):
        assert_eq!(left, None);
        assert!(registry.who_is(&connection_id).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_cleans_up_empty_room() {
        // テスト項目: 最後の接続が切断されるとルームのエントリが消える
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let connection_id = registered(&registry, "alice").await;
        let room_id = RoomId::new("r1").unwrap();
        registry.join_room(connection_id, room_id.clone()).await.unwrap();

        // when (操作):
        let removed = registry.remove(&connection_id).await;

        // then (期待する結果):
        assert!(removed.is_some());
        assert!(registry.live_connections(&room_id).await.is_empty());
        assert!(registry.rooms_snapshot().await.is_empty());
        assert_eq!(registry.who_is(&connection_id).await, None);
    }

    #[tokio::test]
    async fn test_live_connections_only_contains_room_members() {
        // テスト項目: live_connections が対象ルームの接続だけを返す
        // given (前提条件):
        let registry = PresenceRegistry::new();
        let alice = registered(&registry, "alice").await;
        let bob = registered(&registry, "bob").await;
        let r1 = RoomId::new("r1").unwrap();
        let r2 = RoomId::new("r2").unwrap();
        registry.join_room(alice, r1.clone()).await.unwrap();
        registry.join_room(bob, r2.clone()).await.unwrap();

        // when (操作):
        let members = registry.live_connections(&r1).await;

        // then (期待する結果):
        assert_eq!(members, vec![alice]);
    }
}
