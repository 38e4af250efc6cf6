//! In-process room hub.
//!
//! ## 責務
//!
//! - ConnectionId の採番（0 から単調増加、再利用しない）
//! - 各接続の `UnboundedSender` の管理
//! - 送信者以外の全接続へのプレゼンス JSON の配送（push / broadcast）
//! - 退出の通知（1 接続につき 1 回）
//! - 切断の検出（チャンネルの破棄、受信側の破棄）と退出としての通知
//!
//! ## 設計ノート
//!
//! 各接続の最新プレゼンス JSON を保持し、新規参加者にはそれを再送します。
//! 新規参加者自身の初期プレゼンス（cursor: null）は既存の参加者に通知されます。
//! これにより、レジストリのエントリと接続中の参加者が参加直後から一致します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use hiroba_shared::time::{Clock, SystemClock};
use tokio::sync::{Mutex, mpsc};

use crate::{
    domain::{ChannelError, ConnectionId, Presence, RoomChannel, RoomEvent, RoomId, RoomSubscription},
    infrastructure::dto::{decode_room_message, encode_participant_left, encode_presence_updated},
};

/// 接続ごとの送信チャンネル
type PeerChannel = mpsc::UnboundedSender<String>;

struct Peer {
    sender: PeerChannel,
    /// 最後に配送した presence-updated メッセージ（新規参加者への再送用）
    latest: String,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    peers: HashMap<ConnectionId, Peer>,
}

impl HubState {
    /// 接続を取り除き、残りの参加者に退出を通知する
    ///
    /// 通知の送信に失敗した参加者も切断済みとして同様に取り除く。
    /// 既に取り除かれた接続は何もしない（退出通知は 1 接続につき 1 回）。
    fn evict(&mut self, room_id: RoomId, connection_ids: Vec<ConnectionId>) {
        let mut pending = connection_ids;
        while let Some(connection_id) = pending.pop() {
            if self.peers.remove(&connection_id).is_none() {
                tracing::debug!("Connection {} already left room {}", connection_id, room_id);
                continue;
            }

            match encode_participant_left(connection_id) {
                Ok(json) => {
                    for (id, peer) in self.peers.iter() {
                        if let Err(e) = peer.sender.send(json.clone()) {
                            tracing::warn!(
                                "Failed to push leave of {} to {}: {}",
                                connection_id,
                                id,
                                e
                            );
                            pending.push(*id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to encode leave of {}: {}", connection_id, e);
                }
            }

            tracing::info!(
                "Connection {} left room {} ({} connected)",
                connection_id,
                room_id,
                self.peers.len()
            );
        }
    }
}

/// インメモリのルームハブ
///
/// ## 使用例
///
/// ```ignore
/// let hub = InMemoryRoomHub::new(RoomId::generate());
/// let alice = hub.join().await?;
/// let bob = hub.join().await?;
///
/// alice.channel.broadcast(&presence).await?;
/// let event = bob.subscription.next_event().await;
/// ```
#[derive(Clone)]
pub struct InMemoryRoomHub {
    room_id: RoomId,
    state: Arc<Mutex<HubState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomHub {
    /// 新しい InMemoryRoomHub を作成
    pub fn new(room_id: RoomId) -> Self {
        Self::with_clock(room_id, Arc::new(SystemClock))
    }

    /// 参加時刻の取得に使う Clock を指定して作成
    pub fn with_clock(room_id: RoomId, clock: Arc<dyn Clock>) -> Self {
        Self {
            room_id,
            state: Arc::new(Mutex::new(HubState::default())),
            clock,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// ルームに参加
    ///
    /// # Returns
    ///
    /// * `Ok(RoomMembership)` - 採番された ConnectionId と送受信の両端
    /// * `Err(ChannelError::Encode)` - 初期プレゼンスのシリアライズ失敗
    pub async fn join(&self) -> Result<RoomMembership, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;

        let connection_id = ConnectionId::new(state.next_id);
        let initial = encode_presence_updated(connection_id, &Presence::default())
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        state.next_id += 1;

        let mut unreachable = Vec::new();
        for (id, peer) in state.peers.iter() {
            // 新規参加者の初期プレゼンスを既存参加者へ
            if let Err(e) = peer.sender.send(initial.clone()) {
                tracing::warn!("Failed to push join of {} to {}: {}", connection_id, id, e);
                unreachable.push(*id);
                continue;
            }
            // 既存参加者の最新プレゼンスを新規参加者へ
            if tx.send(peer.latest.clone()).is_err() {
                tracing::warn!("Failed to replay presence of {} to {}", id, connection_id);
            }
        }

        state.peers.insert(
            connection_id,
            Peer {
                sender: tx,
                latest: initial,
            },
        );
        tracing::info!(
            "Connection {} joined room {} ({} connected)",
            connection_id,
            self.room_id,
            state.peers.len()
        );
        // 受信側が破棄された参加者は切断済みとして扱う
        state.evict(self.room_id, unreachable);

        Ok(RoomMembership {
            connection_id,
            joined_at: self.clock.now_millis(),
            channel: Arc::new(InMemoryRoomChannel {
                hub: self.clone(),
                connection_id,
            }),
            subscription: InMemorySubscription { receiver: rx },
        })
    }

    /// 接続中の全ての ConnectionId を取得（昇順）
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let mut ids: Vec<ConnectionId> = state.peers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// 接続数を取得
    pub async fn count_connections(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// 1 つの接続に生のペイロードを配送する（エンコードを経由しない）
    pub async fn push_raw(&self, to: ConnectionId, payload: String) -> Result<(), ChannelError> {
        let state = self.state.lock().await;
        let peer = state.peers.get(&to).ok_or(ChannelError::Closed(to))?;
        peer.sender
            .send(payload)
            .map_err(|e| ChannelError::PushFailed(e.to_string()))
    }

    async fn publish(&self, from: ConnectionId, presence: &Presence) -> Result<(), ChannelError> {
        let json = encode_presence_updated(from, presence)
            .map_err(|e| ChannelError::Encode(e.to_string()))?;

        let mut state = self.state.lock().await;
        let peer = state.peers.get_mut(&from).ok_or(ChannelError::Closed(from))?;
        peer.latest = json.clone();

        let mut unreachable = Vec::new();
        for (id, peer) in state.peers.iter().filter(|(id, _)| **id != from) {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = peer.sender.send(json.clone()) {
                tracing::warn!("Failed to push presence of {} to {}: {}", from, id, e);
                unreachable.push(*id);
            }
        }
        // 受信側が破棄された参加者は切断済みとして扱う
        state.evict(self.room_id, unreachable);
        Ok(())
    }

    async fn remove(&self, connection_id: ConnectionId) {
        self.state
            .lock()
            .await
            .evict(self.room_id, vec![connection_id]);
    }
}

/// ルーム参加の結果
pub struct RoomMembership {
    pub connection_id: ConnectionId,
    /// 参加時刻（Unix ミリ秒）
    pub joined_at: i64,
    pub channel: Arc<InMemoryRoomChannel>,
    pub subscription: InMemorySubscription,
}

/// 送信側（RoomChannel の実装）
pub struct InMemoryRoomChannel {
    hub: InMemoryRoomHub,
    connection_id: ConnectionId,
}

#[async_trait]
impl RoomChannel for InMemoryRoomChannel {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    async fn broadcast(&self, presence: &Presence) -> Result<(), ChannelError> {
        self.hub.publish(self.connection_id, presence).await
    }

    async fn leave(&self) -> Result<(), ChannelError> {
        self.hub.remove(self.connection_id).await;
        Ok(())
    }
}

/// 明示的に退出せずに破棄された接続も退出として通知する
impl Drop for InMemoryRoomChannel {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        match self.hub.state.try_lock() {
            Ok(mut state) => state.evict(self.hub.room_id, vec![connection_id]),
            Err(_) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let hub = self.hub.clone();
                    handle.spawn(async move { hub.remove(connection_id).await });
                }
                Err(_) => tracing::warn!(
                    "Could not remove dropped connection {} from room {}",
                    connection_id,
                    self.hub.room_id
                ),
            },
        }
    }
}

/// 受信側（RoomSubscription の実装）
///
/// 解釈できないメッセージはログに残して読み飛ばす。
pub struct InMemorySubscription {
    receiver: mpsc::UnboundedReceiver<String>,
}

impl InMemorySubscription {
    fn decode(raw: &str) -> Option<RoomEvent> {
        match decode_room_message(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Dropping undecodable room message: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl RoomSubscription for InMemorySubscription {
    async fn next_event(&mut self) -> Option<RoomEvent> {
        loop {
            let raw = self.receiver.recv().await?;
            if let Some(event) = Self::decode(&raw) {
                return Some(event);
            }
        }
    }

    fn try_next_event(&mut self) -> Option<RoomEvent> {
        loop {
            let raw = self.receiver.try_recv().ok()?;
            if let Some(event) = Self::decode(&raw) {
                return Some(event);
            }
        }
    }
}
