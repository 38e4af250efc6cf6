//! UseCase 層
//!
//! ドメインモデルと RoomChannel trait を組み合わせて、参加者ごとのプレゼンス同期を実現します。
//!
//! - `presence_store`: ローカル参加者のプレゼンス保持と送信
//! - `session`: ローカルイベントとリモートイベントの処理

mod error;
mod presence_store;
mod session;

pub use error::SessionError;
pub use presence_store::PresenceStore;
pub use session::{LocalEvent, PresenceSession};
