//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{ChannelError, ConnectionId};

/// プレゼンスセッションのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// ルーム退出後の操作
    #[error("Connection {0} has already left the room")]
    AlreadyLeft(ConnectionId),

    /// RoomChannel のエラー
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
