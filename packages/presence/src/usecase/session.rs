//! UseCase: 参加者ごとのプレゼンスセッション
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PresenceSession::handle_local() / handle_remote() / leave() / run()
//! - ローカルイベント（ポインタ移動・離脱・キー入力・テキスト変更）からプレゼンス更新への変換
//! - リモートイベントのレジストリへの反映
//!
//! ### なぜこのテストが必要か
//! - 入力モードとメッセージの関係（Editing 中のみメッセージが付く）を保証
//! - 退出後にローカル送信が止まることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：移動 → Enter → 入力 → 移動 → Escape
//! - エッジケース：カーソルなしでの入力、Idle 中の入力、未知の参加者の退出

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    ConnectionId, Cursor, InputMode, InputModeController, Key, KeyBindings, ModeTransition,
    Palette, Presence, PresencePatch, RemoteCursor, RemotePresenceRegistry, RoomChannel,
    RoomEvent, RoomSubscription,
};

use super::{error::SessionError, presence_store::PresenceStore};

/// ローカル参加者のイベント
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    /// ポインタ移動（ビューポート座標、丸め前）
    PointerMove { x: f64, y: f64 },
    /// ポインタがルーム外に出た
    PointerLeave,
    /// キー押下（"Enter", "Escape", "a" など）
    KeyDown(String),
    /// メッセージ入力欄の内容変更
    TextChange(String),
}

/// 参加者 1 人分のプレゼンスセッション
///
/// ローカルプレゼンス、入力モード、他の参加者のレジストリをまとめて所有する。
/// すべてのハンドラは 1 つの実行コンテキストから順番に呼ばれる前提で、ロックを持たない。
pub struct PresenceSession {
    store: PresenceStore,
    controller: InputModeController,
    registry: RemotePresenceRegistry,
    palette: Palette,
}

impl PresenceSession {
    /// 新しい PresenceSession を作成
    ///
    /// # Arguments
    ///
    /// * `channel` - ルームへの送信チャンネル（ConnectionId はトランスポートが採番済み）
    /// * `palette` - カーソルの色を決めるパレット
    pub fn new(channel: Arc<dyn RoomChannel>, palette: Palette) -> Self {
        Self::with_bindings(channel, palette, KeyBindings::default())
    }

    /// キー割り当てを指定して PresenceSession を作成
    pub fn with_bindings(
        channel: Arc<dyn RoomChannel>,
        palette: Palette,
        bindings: KeyBindings,
    ) -> Self {
        let registry = RemotePresenceRegistry::new(channel.connection_id());
        Self {
            store: PresenceStore::new(channel),
            controller: InputModeController::with_bindings(bindings),
            registry,
            palette,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.store.connection_id()
    }

    pub fn presence(&self) -> &Presence {
        self.store.presence()
    }

    pub fn mode(&self) -> InputMode {
        self.controller.mode()
    }

    pub fn registry(&self) -> &RemotePresenceRegistry {
        &self.registry
    }

    pub fn has_left(&self) -> bool {
        self.store.has_left()
    }

    /// 描画対象のリモートカーソル（cursor: null の参加者は含まない）
    pub fn visible_cursors(&self) -> impl Iterator<Item = RemoteCursor<'_>> + '_ {
        self.registry.visible_cursors(&self.palette)
    }

    /// ローカルイベントを処理
    ///
    /// 1 イベントにつき最大 1 回のプレゼンス更新（= 1 回のブロードキャスト）を行う。
    pub async fn handle_local(&mut self, event: LocalEvent) -> Result<(), SessionError> {
        if self.store.has_left() {
            return Err(SessionError::AlreadyLeft(self.connection_id()));
        }

        match event {
            LocalEvent::PointerMove { x, y } => {
                let cursor =
                    Cursor::from_pointer(x, y).with_message(self.controller.active_message());
                self.store
                    .update_local_presence(PresencePatch::cursor(Some(cursor)))
                    .await?;
            }
            LocalEvent::PointerLeave => {
                self.store
                    .update_local_presence(PresencePatch::cursor(None))
                    .await?;
            }
            LocalEvent::KeyDown(identifier) => {
                let transition = self.controller.on_key(&Key::from_identifier(&identifier));
                tracing::debug!(
                    "Key '{}' on {}: {:?} (mode: {:?})",
                    identifier,
                    self.connection_id(),
                    transition,
                    self.controller.mode()
                );
                if transition == ModeTransition::Cancelled {
                    self.detach_message().await?;
                }
            }
            LocalEvent::TextChange(text) => {
                if !self.controller.on_text_change(&text) {
                    tracing::debug!(
                        "Ignoring text change on {} while not editing",
                        self.connection_id()
                    );
                    return Ok(());
                }
                let Some(cursor) = self.store.presence().cursor.clone() else {
                    tracing::debug!(
                        "Keeping draft on {} without broadcasting: no cursor",
                        self.connection_id()
                    );
                    return Ok(());
                };
                let cursor = cursor.with_message(self.controller.active_message());
                self.store
                    .update_local_presence(PresencePatch::cursor(Some(cursor)))
                    .await?;
            }
        }

        Ok(())
    }

    /// 編集終了時にカーソルからメッセージを外す（メッセージがあった場合のみ送信）
    async fn detach_message(&mut self) -> Result<(), SessionError> {
        let Some(cursor) = self.store.presence().cursor.as_ref() else {
            return Ok(());
        };
        if !cursor.has_message() {
            return Ok(());
        }
        let cursor = Cursor::new(cursor.x, cursor.y);
        self.store
            .update_local_presence(PresencePatch::cursor(Some(cursor)))
            .await?;
        Ok(())
    }

    /// リモートイベントをレジストリに反映
    ///
    /// ブロックせず、順序の検証もしない（到着順で後勝ち）。
    pub fn handle_remote(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Update {
                connection_id,
                presence,
            } => {
                if self.registry.apply_update(connection_id, presence) {
                    tracing::debug!(
                        "{} received presence of {}",
                        self.connection_id(),
                        connection_id
                    );
                }
            }
            RoomEvent::Leave { connection_id } => {
                if self.registry.apply_leave(connection_id).is_some() {
                    tracing::debug!("{} removed {} from registry", self.connection_id(), connection_id);
                } else {
                    tracing::debug!(
                        "{} ignored leave of unknown connection {}",
                        self.connection_id(),
                        connection_id
                    );
                }
            }
        }
    }

    /// 配送済みのリモートイベントを待たずにすべて反映
    ///
    /// # Returns
    ///
    /// 反映したイベント数
    pub fn pump<S: RoomSubscription + ?Sized>(&mut self, subscription: &mut S) -> usize {
        let mut applied = 0;
        while let Some(event) = subscription.try_next_event() {
            self.handle_remote(event);
            applied += 1;
        }
        applied
    }

    /// ルームから退出
    ///
    /// 以降のローカル送信は即座に止まり、他の参加者にはトランスポート経由で退出が通知される。
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        self.store.leave().await
    }

    /// イベントループを実行
    ///
    /// ローカルイベントのキューとリモートイベントの購読を 1 つのタスクで交互に処理する。
    /// ローカルのキューが閉じるか、購読が終了したらルームから退出してセッションを返す。
    pub async fn run<S: RoomSubscription>(
        mut self,
        mut local_events: mpsc::UnboundedReceiver<LocalEvent>,
        mut subscription: S,
    ) -> Self {
        loop {
            tokio::select! {
                event = local_events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_local(event).await {
                            tracing::warn!("Stopping session {}: {}", self.connection_id(), e);
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("Local event queue of {} closed", self.connection_id());
                        break;
                    }
                },
                event = subscription.next_event() => match event {
                    Some(event) => self.handle_remote(event),
                    None => {
                        tracing::info!("Room subscription of {} closed", self.connection_id());
                        break;
                    }
                },
            }
        }

        // ローカルのキューに残っているイベントは退出前に捨てる
        if !self.store.has_left()
            && let Err(e) = self.leave().await
        {
            tracing::warn!("Failed to leave room as {}: {}", self.connection_id(), e);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockRoomChannel;
    use std::sync::Mutex;

    const LOCAL: ConnectionId = ConnectionId::new(1);

    /// 送信されたプレゼンスを記録するモック
    fn recording_channel() -> (MockRoomChannel, Arc<Mutex<Vec<Presence>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut channel = MockRoomChannel::new();
        channel.expect_connection_id().return_const(LOCAL);
        let sent_clone = sent.clone();
        channel.expect_broadcast().returning(move |p: &Presence| {
            sent_clone.lock().unwrap().push(p.clone());
            Ok(())
        });
        channel.expect_leave().returning(|| Ok(()));
        (channel, sent)
    }

    fn create_test_session() -> (PresenceSession, Arc<Mutex<Vec<Presence>>>) {
        let (channel, sent) = recording_channel();
        (
            PresenceSession::new(Arc::new(channel), Palette::default()),
            sent,
        )
    }

    fn cursor_with(x: i32, y: i32, message: &str) -> Presence {
        Presence::pointing(Cursor::new(x, y).with_message(Some(message)))
    }

    #[tokio::test]
    async fn test_pointer_move_and_leave() {
        // テスト項目: ポインタ移動で座標が、離脱で cursor: null が送信される
        // given (前提条件):
        let (mut session, sent) = create_test_session();

        // when (操作):
        session
            .handle_local(LocalEvent::PointerMove { x: 10.4, y: 19.6 })
            .await
            .unwrap();
        session.handle_local(LocalEvent::PointerLeave).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            *sent.lock().unwrap(),
            vec![Presence::pointing(Cursor::new(10, 20)), Presence::default()]
        );
        assert_eq!(*session.presence(), Presence::default());
    }

    #[tokio::test]
    async fn test_message_editing_flow() {
        // テスト項目: Enter → 入力 → 移動 → Escape でメッセージが付与・維持・除去される
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session
            .handle_local(LocalEvent::PointerMove { x: 5.0, y: 5.0 })
            .await
            .unwrap();

        // when (操作):
        session
            .handle_local(LocalEvent::KeyDown("Enter".to_string()))
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::TextChange("h".to_string()))
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::TextChange("hi".to_string()))
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::PointerMove { x: 8.0, y: 9.0 })
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::KeyDown("Escape".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        // Enter 自体は送信しない。入力 2 回、移動 1 回、Escape 1 回
        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                Presence::pointing(Cursor::new(5, 5)),
                cursor_with(5, 5, "h"),
                cursor_with(5, 5, "hi"),
                cursor_with(8, 9, "hi"),
                Presence::pointing(Cursor::new(8, 9)),
            ]
        );
        assert_eq!(session.mode(), InputMode::Idle);
    }

    #[tokio::test]
    async fn test_clearing_field_broadcasts_no_message() {
        // テスト項目: 入力欄を空にすると、メッセージなしのカーソルが送信される
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session
            .handle_local(LocalEvent::PointerMove { x: 1.0, y: 1.0 })
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::KeyDown("Enter".to_string()))
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::TextChange("a".to_string()))
            .await
            .unwrap();

        // when (操作):
        session
            .handle_local(LocalEvent::TextChange(String::new()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&Presence::pointing(Cursor::new(1, 1)))
        );
        assert_eq!(session.mode(), InputMode::Editing);
    }

    #[tokio::test]
    async fn test_text_change_while_idle_is_not_broadcast() {
        // テスト項目: Idle 中の入力変更は送信されない
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session
            .handle_local(LocalEvent::PointerMove { x: 1.0, y: 1.0 })
            .await
            .unwrap();

        // when (操作):
        session
            .handle_local(LocalEvent::TextChange("ignored".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_text_change_without_cursor_keeps_draft() {
        // テスト項目: カーソルなしで入力した下書きは、次のポインタ移動で送信される
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session
            .handle_local(LocalEvent::KeyDown("Enter".to_string()))
            .await
            .unwrap();

        // when (操作):
        session
            .handle_local(LocalEvent::TextChange("later".to_string()))
            .await
            .unwrap();
        let sent_before_move = sent.lock().unwrap().len();
        session
            .handle_local(LocalEvent::PointerMove { x: 2.0, y: 3.0 })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(sent_before_move, 0);
        assert_eq!(*sent.lock().unwrap(), vec![cursor_with(2, 3, "later")]);
    }

    #[tokio::test]
    async fn test_escape_without_message_sends_nothing() {
        // テスト項目: メッセージがない状態での Escape は送信しない
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session
            .handle_local(LocalEvent::PointerMove { x: 1.0, y: 1.0 })
            .await
            .unwrap();
        session
            .handle_local(LocalEvent::KeyDown("Enter".to_string()))
            .await
            .unwrap();

        // when (操作):
        session
            .handle_local(LocalEvent::KeyDown("Escape".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(sent.lock().unwrap().len(), 1);
        assert_eq!(session.mode(), InputMode::Idle);
    }

    #[tokio::test]
    async fn test_handle_remote_updates_registry() {
        // テスト項目: リモートの更新・退出がレジストリに反映され、自分の ID は無視される
        // given (前提条件):
        let (mut session, _sent) = create_test_session();
        let alice = ConnectionId::new(2);
        let bob = ConnectionId::new(3);

        // when (操作):
        session.handle_remote(RoomEvent::Update {
            connection_id: alice,
            presence: Presence::pointing(Cursor::new(10, 20)),
        });
        session.handle_remote(RoomEvent::Update {
            connection_id: bob,
            presence: Presence::default(),
        });
        session.handle_remote(RoomEvent::Update {
            connection_id: LOCAL,
            presence: Presence::pointing(Cursor::new(0, 0)),
        });
        session.handle_remote(RoomEvent::Leave { connection_id: bob });
        session.handle_remote(RoomEvent::Leave {
            connection_id: ConnectionId::new(99),
        });

        // then (期待する結果):
        assert_eq!(session.registry().len(), 1);
        assert_eq!(
            session.registry().get(alice),
            Some(&Presence::pointing(Cursor::new(10, 20)))
        );
        let cursors: Vec<_> = session.visible_cursors().collect();
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].color, Palette::default().color_of(alice));
    }

    #[tokio::test]
    async fn test_local_events_rejected_after_leave() {
        // テスト項目: 退出後のローカルイベントはエラーになり、送信されない
        // given (前提条件):
        let (mut session, sent) = create_test_session();
        session.leave().await.unwrap();

        // when (操作):
        let result = session
            .handle_local(LocalEvent::PointerMove { x: 1.0, y: 1.0 })
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SessionError::AlreadyLeft(LOCAL)));
        assert!(sent.lock().unwrap().is_empty());
        assert!(session.has_left());
    }
}
