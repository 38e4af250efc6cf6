//! In-process room simulator: several presence sessions sharing one hub.

use std::{collections::BTreeMap, sync::Arc};

use hiroba_presence::{
    domain::{ChannelError, ConnectionId, Palette, RemoteCursor, RoomId},
    infrastructure::channel::{InMemoryRoomHub, InMemorySubscription},
    usecase::{LocalEvent, PresenceSession, SessionError},
};
use hiroba_shared::time::{Clock, SystemClock};
use thiserror::Error;

use crate::{command::Command, formatter::RoomFormatter};

/// Simulator errors (reported to the user, the simulator keeps running)
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("No participant {0} in the room")]
    UnknownParticipant(ConnectionId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to print (may be empty)
    Output(String),
    Quit,
}

struct Participant {
    session: PresenceSession,
    subscription: InMemorySubscription,
    joined_at: i64,
}

pub struct RoomSimulator {
    hub: InMemoryRoomHub,
    palette: Palette,
    clock: Arc<dyn Clock>,
    participants: BTreeMap<ConnectionId, Participant>,
}

impl RoomSimulator {
    /// 新しい RoomSimulator を作成（新しいルームを生成）
    pub fn new(palette: Palette) -> Self {
        Self::with_clock(palette, Arc::new(SystemClock))
    }

    /// Clock を指定して作成
    pub fn with_clock(palette: Palette, clock: Arc<dyn Clock>) -> Self {
        Self {
            hub: InMemoryRoomHub::with_clock(RoomId::generate(), clock.clone()),
            palette,
            clock,
            participants: BTreeMap::new(),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.hub.room_id()
    }

    /// 参加中の ConnectionId（昇順）
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.participants.keys().copied().collect()
    }

    /// 新しい参加者をルームに参加させる
    pub async fn join(&mut self) -> Result<ConnectionId, SimulatorError> {
        let membership = self.hub.join().await?;
        let connection_id = membership.connection_id;
        self.participants.insert(
            connection_id,
            Participant {
                session: PresenceSession::new(membership.channel, self.palette.clone()),
                subscription: membership.subscription,
                joined_at: membership.joined_at,
            },
        );
        self.pump_all();
        Ok(connection_id)
    }

    /// コマンドを 1 つ実行し、配送済みのリモートイベントを全参加者に反映する
    pub async fn execute(&mut self, command: Command) -> Result<Outcome, SimulatorError> {
        let output = match command {
            Command::Join => {
                let connection_id = self.join().await?;
                let joined_at = self.participant(connection_id)?.joined_at;
                RoomFormatter::format_joined(connection_id, joined_at)
            }
            Command::Move { id, x, y } => {
                self.send(id, LocalEvent::PointerMove { x, y }).await?;
                String::new()
            }
            Command::Out { id } => {
                self.send(id, LocalEvent::PointerLeave).await?;
                String::new()
            }
            Command::Key { id, key } => {
                self.send(id, LocalEvent::KeyDown(key)).await?;
                String::new()
            }
            Command::Type { id, text } => {
                self.send(id, LocalEvent::TextChange(text)).await?;
                String::new()
            }
            Command::Leave { id } => {
                let mut participant = self
                    .participants
                    .remove(&id)
                    .ok_or(SimulatorError::UnknownParticipant(id))?;
                participant.session.leave().await?;
                RoomFormatter::format_left(id, self.clock.now_millis())
            }
            Command::Show { id } => self.view(id)?,
            Command::List => {
                let participants: Vec<(ConnectionId, i64)> = self
                    .participants
                    .iter()
                    .map(|(id, p)| (*id, p.joined_at))
                    .collect();
                RoomFormatter::format_participants(&participants)
            }
            Command::Help => RoomFormatter::format_help(),
            Command::Quit => return Ok(Outcome::Quit),
        };

        self.pump_all();
        Ok(Outcome::Output(output))
    }

    /// 全参加者を退出させる
    pub async fn shutdown(&mut self) {
        let participants = std::mem::take(&mut self.participants);
        for (id, mut participant) in participants {
            if let Err(e) = participant.session.leave().await {
                tracing::warn!("Failed to leave room as {}: {}", id, e);
            }
        }
        tracing::info!("Room {} closed", self.hub.room_id());
    }

    /// 参加者のセッションを取得
    pub fn session(&self, id: ConnectionId) -> Option<&PresenceSession> {
        self.participants.get(&id).map(|p| &p.session)
    }

    fn participant(&self, id: ConnectionId) -> Result<&Participant, SimulatorError> {
        self.participants
            .get(&id)
            .ok_or(SimulatorError::UnknownParticipant(id))
    }

    async fn send(&mut self, id: ConnectionId, event: LocalEvent) -> Result<(), SimulatorError> {
        let participant = self
            .participants
            .get_mut(&id)
            .ok_or(SimulatorError::UnknownParticipant(id))?;
        participant.session.handle_local(event).await?;
        Ok(())
    }

    fn pump_all(&mut self) {
        for participant in self.participants.values_mut() {
            participant.session.pump(&mut participant.subscription);
        }
    }

    fn view(&self, id: ConnectionId) -> Result<String, SimulatorError> {
        let session = &self.participant(id)?.session;

        let mut cursors: Vec<RemoteCursor<'_>> = session.visible_cursors().collect();
        cursors.sort_by_key(|c| c.connection_id);
        let mut not_pointing: Vec<ConnectionId> = session
            .registry()
            .snapshot()
            .into_iter()
            .filter(|(_, presence)| !presence.is_pointing())
            .map(|(id, _)| id)
            .collect();
        not_pointing.sort();

        Ok(RoomFormatter::format_view(
            id,
            session.mode(),
            session.presence(),
            &cursors,
            &not_pointing,
        ))
    }
}
