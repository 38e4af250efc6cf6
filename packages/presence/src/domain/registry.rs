//! Latest known presence of every other participant in the room.

use std::{
    collections::{HashMap, hash_map},
    iter::Map,
};

use super::{Color, ConnectionId, Palette, Presence};

/// Map from remote connection to its latest presence.
///
/// Updates are applied in arrival order with no ordering check: a late delivery of
/// an older update overwrites a newer one until the next update arrives. The local
/// connection never has an entry.
#[derive(Debug, Clone)]
pub struct RemotePresenceRegistry {
    local_id: ConnectionId,
    entries: HashMap<ConnectionId, Presence>,
}

impl RemotePresenceRegistry {
    pub fn new(local_id: ConnectionId) -> Self {
        Self {
            local_id,
            entries: HashMap::new(),
        }
    }

    /// Insert or replace the presence of `connection_id`.
    ///
    /// Returns `false` (and changes nothing) for the local connection.
    pub fn apply_update(&mut self, connection_id: ConnectionId, presence: Presence) -> bool {
        if connection_id == self.local_id {
            tracing::debug!("Ignoring remote update for local connection {}", connection_id);
            return false;
        }
        self.entries.insert(connection_id, presence);
        true
    }

    /// Remove the entry of `connection_id`. Removing an unknown id is a no-op.
    pub fn apply_leave(&mut self, connection_id: ConnectionId) -> Option<Presence> {
        self.entries.remove(&connection_id)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Presence> {
        self.entries.get(&connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.entries.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrowed view over all entries, iterable any number of times.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            entries: &self.entries,
        }
    }

    /// Cursors to draw, with their colors. Entries with `cursor: null` are skipped.
    pub fn visible_cursors<'a>(
        &'a self,
        palette: &'a Palette,
    ) -> impl Iterator<Item = RemoteCursor<'a>> + 'a {
        self.snapshot().into_iter().filter_map(move |(connection_id, presence)| {
            presence.cursor.as_ref().map(|cursor| RemoteCursor {
                connection_id,
                x: cursor.x,
                y: cursor.y,
                message: cursor.message(),
                color: palette.color_of(connection_id),
            })
        })
    }
}

/// Lazy, restartable view of the registry. Iteration order is unspecified.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    entries: &'a HashMap<ConnectionId, Presence>,
}

type EntryFn<'a> = fn((&'a ConnectionId, &'a Presence)) -> (ConnectionId, &'a Presence);

fn copy_id<'a>((id, presence): (&'a ConnectionId, &'a Presence)) -> (ConnectionId, &'a Presence) {
    (*id, presence)
}

impl<'a> Snapshot<'a> {
    pub fn iter(&self) -> Map<hash_map::Iter<'a, ConnectionId, Presence>, EntryFn<'a>> {
        self.entries.iter().map(copy_id as EntryFn<'a>)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for Snapshot<'a> {
    type Item = (ConnectionId, &'a Presence);
    type IntoIter = Map<hash_map::Iter<'a, ConnectionId, Presence>, EntryFn<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One remote cursor ready to be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCursor<'a> {
    pub connection_id: ConnectionId,
    pub x: i32,
    pub y: i32,
    pub message: Option<&'a str>,
    pub color: Color,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cursor;

    const LOCAL: ConnectionId = ConnectionId::new(0);

    fn pointing(x: i32, y: i32) -> Presence {
        Presence::pointing(Cursor::new(x, y))
    }

    #[test]
    fn test_apply_update_inserts_and_replaces() {
        // テスト項目: 同じ ID への更新は最後の値で置き換えられる
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        let alice = ConnectionId::new(1);

        // when (操作):
        registry.apply_update(alice, pointing(1, 1));
        registry.apply_update(alice, pointing(10, 20));

        // then (期待する結果):
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(alice), Some(&pointing(10, 20)));
    }

    #[test]
    fn test_apply_update_ignores_local_connection() {
        // テスト項目: 自分自身の ConnectionId はレジストリに登録されない
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);

        // when (操作):
        let applied = registry.apply_update(LOCAL, pointing(1, 1));

        // then (期待する結果):
        assert!(!applied);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_apply_leave_removes_entry() {
        // テスト項目: 退出した参加者のエントリが削除される
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        let alice = ConnectionId::new(1);
        registry.apply_update(alice, pointing(1, 1));

        // when (操作):
        let removed = registry.apply_leave(alice);

        // then (期待する結果):
        assert_eq!(removed, Some(pointing(1, 1)));
        assert!(!registry.contains(alice));
    }

    #[test]
    fn test_apply_leave_unknown_is_no_op() {
        // テスト項目: 存在しない ID の退出は何も変更しない（冪等性）
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        registry.apply_update(ConnectionId::new(1), pointing(1, 1));

        // when (操作):
        let removed = registry.apply_leave(ConnectionId::new(99));
        let removed_again = registry.apply_leave(ConnectionId::new(99));

        // then (期待する結果):
        assert_eq!(removed, None);
        assert_eq!(removed_again, None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ConnectionId::new(1)), Some(&pointing(1, 1)));
    }

    #[test]
    fn test_replay_keeps_only_ids_whose_last_operation_was_update() {
        // テスト項目: 操作列を再生すると、最後の操作が更新だった ID だけが最後の値で残る
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        let ops: Vec<(u64, Option<Presence>)> = vec![
            (1, Some(pointing(1, 1))),
            (2, Some(pointing(2, 2))),
            (1, None),
            (3, Some(Presence::default())),
            (2, Some(pointing(22, 22))),
            (4, None),
            (1, Some(pointing(11, 11))),
            (3, None),
        ];

        // when (操作):
        for (id, op) in ops {
            match op {
                Some(presence) => {
                    registry.apply_update(ConnectionId::new(id), presence);
                }
                None => {
                    registry.apply_leave(ConnectionId::new(id));
                }
            }
        }

        // then (期待する結果):
        let mut entries: Vec<(ConnectionId, Presence)> = registry
            .snapshot()
            .iter()
            .map(|(id, p)| (id, p.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        assert_eq!(
            entries,
            vec![
                (ConnectionId::new(1), pointing(11, 11)),
                (ConnectionId::new(2), pointing(22, 22)),
            ]
        );
    }

    #[test]
    fn test_snapshot_is_restartable() {
        // テスト項目: スナップショットは何度でも最初から反復できる
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        registry.apply_update(ConnectionId::new(1), pointing(1, 1));
        registry.apply_update(ConnectionId::new(2), Presence::default());
        let snapshot = registry.snapshot();

        // when (操作):
        let first = snapshot.iter().count();
        let second = snapshot.into_iter().count();

        // then (期待する結果):
        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_visible_cursors_skip_null_cursor() {
        // テスト項目: cursor が null の参加者は描画対象から外れるがレジストリには残る
        // given (前提条件):
        let mut registry = RemotePresenceRegistry::new(LOCAL);
        let palette = Palette::default();
        let alice = ConnectionId::new(1);
        let bob = ConnectionId::new(2);
        registry.apply_update(
            alice,
            Presence::pointing(Cursor::new(10, 20).with_message(Some("hi"))),
        );
        registry.apply_update(bob, Presence::default());

        // when (操作):
        let cursors: Vec<RemoteCursor<'_>> = registry.visible_cursors(&palette).collect();

        // then (期待する結果):
        assert_eq!(
            cursors,
            vec![RemoteCursor {
                connection_id: alice,
                x: 10,
                y: 20,
                message: Some("hi"),
                color: palette.color_of(alice),
            }]
        );
        assert!(registry.contains(bob));
    }
}
