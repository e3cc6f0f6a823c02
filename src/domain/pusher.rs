//! Message pusher trait.
//!
//! ドメイン層が必要とするメッセージ通知のインターフェースを定義します。
//! 具体的な実装（WebSocket など）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Per-connection channel used to queue outbound frames.
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),
    #[error("failed to push message: {0}")]
    SendFailed(String),
}

/// Outbound delivery seam. Pushing enqueues the frame on the target
/// connection's channel; actual socket writes happen on that
/// connection's own task.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register a connection's outbound channel.
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Remove a connection's outbound channel.
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// Push a frame to a single connection.
    async fn push_to(&self, connection_id: &ConnectionId, content: &str) -> Result<(), PushError>;

    /// Push a frame to every target connection. Individual delivery
    /// failures are tolerated and logged, not propagated.
    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> Result<(), PushError>;
}
