//! UseCase: ローカルプレゼンスの保持と送信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PresenceStore::update_local_presence() メソッド
//! - 浅いマージとブロードキャスト（1 回の更新につき 1 回、差分ではなく全体を送る）
//!
//! ### なぜこのテストが必要か
//! - 後から届いた全体スナップショットが古い（欠落・順序入れ替わりの）更新を上書きできることの前提
//! - 退出後に送信が止まることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：cursor: null → cursor: {x, y} の連続更新
//! - 異常系：送信失敗（ログのみで処理を継続）
//! - エッジケース：退出後の更新、二重退出、退出通知の失敗と再試行

use std::sync::Arc;

use crate::domain::{ConnectionId, Presence, PresencePatch, RoomChannel};

use super::error::SessionError;

/// ルームへの参加状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Joined,
    /// 送信は停止済み、トランスポートへの退出通知が未完了
    Leaving,
    Left,
}

/// ローカル参加者のプレゼンス
///
/// ローカルのイベントハンドラからのみ変更され、リモートの入力で変更されることはない。
pub struct PresenceStore {
    /// 現在のプレゼンス（参加時は cursor: null）
    presence: Presence,
    /// RoomChannel（送信の抽象化）
    channel: Arc<dyn RoomChannel>,
    membership: Membership,
}

impl PresenceStore {
    /// 新しい PresenceStore を作成
    pub fn new(channel: Arc<dyn RoomChannel>) -> Self {
        Self {
            presence: Presence::default(),
            channel,
            membership: Membership::Joined,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.channel.connection_id()
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// 退出を開始したかどうか（以降の送信は行われない）
    pub fn has_left(&self) -> bool {
        self.membership != Membership::Joined
    }

    /// ローカルプレゼンスを更新してブロードキャスト
    ///
    /// # Arguments
    ///
    /// * `patch` - マージする部分プレゼンス
    ///
    /// # Returns
    ///
    /// * `Ok(&Presence)` - マージ後のプレゼンス
    /// * `Err(SessionError::AlreadyLeft)` - 退出済み
    ///
    /// 送信失敗はトランスポート側の責務なので、ログに残すだけでエラーにはしない。
    pub async fn update_local_presence(
        &mut self,
        patch: PresencePatch,
    ) -> Result<&Presence, SessionError> {
        if self.has_left() {
            return Err(SessionError::AlreadyLeft(self.connection_id()));
        }

        self.presence.merge(patch);

        if let Err(e) = self.channel.broadcast(&self.presence).await {
            tracing::warn!(
                "Failed to broadcast presence of {}: {}",
                self.connection_id(),
                e
            );
        } else {
            tracing::debug!(
                "Broadcasted presence of {}: {:?}",
                self.connection_id(),
                self.presence
            );
        }

        Ok(&self.presence)
    }

    /// ルームから退出し、以降の送信を止める
    ///
    /// 送信停止はトランスポートの結果を待たずに反映する。
    /// トランスポートへの退出通知が失敗した場合は `Err` を返し、再度呼び出せば通知を再試行する。
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 退出通知が完了
    /// * `Err(SessionError::Channel)` - 退出通知の失敗（再試行可能）
    /// * `Err(SessionError::AlreadyLeft)` - 退出通知は完了済み
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        if self.membership == Membership::Left {
            return Err(SessionError::AlreadyLeft(self.connection_id()));
        }

        self.membership = Membership::Leaving;
        self.presence = Presence::default();
        if let Err(e) = self.channel.leave().await {
            tracing::warn!(
                "Failed to announce leave of {}, can be retried: {}",
                self.connection_id(),
                e
            );
            return Err(e.into());
        }
        self.membership = Membership::Left;

        tracing::info!("Connection {} left the room", self.connection_id());
        Ok(())
    }
}
