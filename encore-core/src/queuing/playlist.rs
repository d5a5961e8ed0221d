use log::debug;
use serde::Serialize;

use crate::{
    Broadcaster, EntryId, EntrySnapshot, PlaylistEntry, QueueError, QueueEvent, QueueItem,
    Subscription,
};

/// The ordered queue of a party, with a cursor pointing at the entry that is playing.
///
/// Everything after the cursor is the votable tail. Votes move entries forward within
/// the tail, and never touch what is playing or has been played.
pub struct Playlist<T> {
    entries: Vec<PlaylistEntry<T>>,
    current_index: Option<usize>,
    next_sequence: u64,
    events: Broadcaster<QueueEvent<T>>,
}

/// A read-only copy of the playlist order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSnapshot<T> {
    pub current_index: Option<usize>,
    pub entries: Vec<EntrySnapshot<T>>,
}

impl<T> Playlist<T>
where
    T: QueueItem,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            current_index: None,
            next_sequence: 0,
            events: Broadcaster::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_entry(&self) -> Option<&PlaylistEntry<T>> {
        self.current_index.and_then(|index| self.entries.get(index))
    }

    pub fn entries(&self) -> &[PlaylistEntry<T>] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&PlaylistEntry<T>> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    /// The position of the first entry that can still be voted for.
    pub fn votable_start(&self) -> usize {
        self.current_index.map_or(0, |index| index + 1)
    }

    /// Returns the position of the entry if it exists and is after the cursor.
    pub fn check_votable(&self, id: EntryId) -> Result<usize, QueueError> {
        let position = self.position_of(id).ok_or(QueueError::UnknownEntry(id))?;

        if position < self.votable_start() {
            return Err(QueueError::NotVotable(id));
        }

        Ok(position)
    }

    /// Receive every change made to the playlist from now on.
    pub fn subscribe(&self) -> Subscription<QueueEvent<T>> {
        self.events.subscribe()
    }

    /// Appends items to the end of the playlist.
    pub fn add<I>(&mut self, items: I) -> Vec<EntryId>
    where
        I: IntoIterator<Item = T>,
    {
        let mut ids = Vec::new();

        for item in items {
            let entry = self.create_entry(item);
            let snapshot = entry.snapshot();

            ids.push(entry.id());
            self.entries.push(entry);
            self.events.send(QueueEvent::EntryAdded { entry: snapshot });
        }

        ids
    }

    /// Inserts an item on behalf of a guest. The entry starts with one vote and
    /// is placed in the tail as if that vote had been cast for it.
    pub fn insert_shadow_voted(&mut self, item: T) -> EntryId {
        let mut entry = self.create_entry(item);
        entry.shadow_vote();

        let id = entry.id();
        let position = self.priority_position(&entry);

        self.entries.insert(position, entry);
        self.renumber();

        self.events.send(QueueEvent::EntryAdded {
            entry: self.entries[position].snapshot(),
        });

        if position + 1 != self.entries.len() {
            self.emit_reordered();
        }

        id
    }

    /// Counts a vote for the entry and moves it up the tail accordingly.
    /// Returns the new position of the entry.
    pub fn vote(&mut self, id: EntryId) -> Result<usize, QueueError> {
        let position = self.check_votable(id)?;

        let mut entry = self.entries.remove(position);
        entry.vote();

        let target = self.priority_position(&entry);

        debug!(
            "{} now has {} vote(s), moving from {} to {}",
            entry.item().describe(),
            entry.votes(),
            position,
            target
        );

        self.entries.insert(target, entry);
        self.renumber();
        self.emit_reordered();

        Ok(target)
    }

    /// Removes entries. Fails without removing anything if any of them isn't in the playlist.
    ///
    /// The cursor keeps pointing at the same entry. If that entry is removed, the cursor is
    /// cleared and the played entries rejoin the votable tail.
    pub fn remove(&mut self, ids: &[EntryId]) -> Result<Vec<PlaylistEntry<T>>, QueueError> {
        if let Some(missing) = ids.iter().find(|id| self.position_of(**id).is_none()) {
            return Err(QueueError::UnknownEntry(*missing));
        }

        let current_id = self.current_entry().map(|entry| entry.id());
        let kept_head = self.entries[..self.votable_start()]
            .iter()
            .filter(|entry| !ids.contains(&entry.id()))
            .count();

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| ids.contains(&entry.id()));

        self.entries = kept;
        self.renumber();

        for entry in &removed {
            self.events.send(QueueEvent::EntryRemoved {
                entry: entry.snapshot(),
            });
        }

        let new_current = current_id.and_then(|id| self.position_of(id));
        self.update_current(new_current);

        if self.settle_reentered(kept_head) {
            self.emit_reordered();
        }

        Ok(removed)
    }

    /// Moves an entry by hand. The cursor follows the entry that is playing.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), QueueError> {
        let len = self.len();

        if let Some(index) = [from, to].into_iter().find(|index| *index >= len) {
            return Err(QueueError::IndexOutOfRange { index, len });
        }

        let current_id = self.current_entry().map(|entry| entry.id());

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.renumber();

        let new_current = current_id.and_then(|id| self.position_of(id));
        self.update_current(new_current);
        self.emit_reordered();

        Ok(())
    }

    /// Removes every entry. Returns the ids that were removed.
    pub fn clear(&mut self) -> Vec<EntryId> {
        let removed = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|entry| entry.id())
            .collect();

        self.current_index = None;
        self.events.send(QueueEvent::Cleared);

        removed
    }

    /// Moves the cursor. Every entry at or before the new cursor has its votes reset.
    /// Entries the cursor moves back over rejoin the votable tail in priority order.
    ///
    /// Returns the entries whose votes were reset.
    pub fn set_current_index(&mut self, index: Option<usize>) -> Result<Vec<EntryId>, QueueError> {
        if let Some(index) = index {
            if index >= self.len() {
                return Err(QueueError::IndexOutOfRange {
                    index,
                    len: self.len(),
                });
            }
        }

        let previous_start = self.votable_start();
        self.update_current(index);

        let reset: Vec<_> = match index {
            Some(index) => self.entries[..=index]
                .iter_mut()
                .filter_map(|entry| entry.reset_votes().then(|| entry.id()))
                .collect(),
            None => Vec::new(),
        };

        if !reset.is_empty() {
            self.events.send(QueueEvent::VotesReset {
                entries: reset.clone(),
            });
        }

        if self.settle_reentered(previous_start) {
            self.emit_reordered();
        }

        Ok(reset)
    }

    pub fn snapshot(&self) -> PlaylistSnapshot<T> {
        PlaylistSnapshot {
            current_index: self.current_index,
            entries: self.entries.iter().map(|entry| entry.snapshot()).collect(),
        }
    }

    /// The entries after the cursor, in order.
    pub fn tail(&self) -> Vec<EntrySnapshot<T>> {
        self.entries[self.votable_start()..]
            .iter()
            .map(|entry| entry.snapshot())
            .collect()
    }

    fn create_entry(&mut self, item: T) -> PlaylistEntry<T> {
        let entry = PlaylistEntry::new(item, self.entries.len(), self.next_sequence);
        self.next_sequence += 1;

        entry
    }

    /// The first position in the tail whose occupant ranks below the given entry,
    /// or the end of the playlist if there is none.
    fn priority_position(&self, entry: &PlaylistEntry<T>) -> usize {
        let start = self.votable_start();

        self.entries[start..]
            .iter()
            .position(|other| entry.ranks_above(other))
            .map_or(self.entries.len(), |offset| start + offset)
    }

    /// Places the entries between the cursor and `previous_start` back into the tail by priority,
    /// leaving the rest of the tail in its order. Returns whether anything moved.
    fn settle_reentered(&mut self, previous_start: usize) -> bool {
        let start = self.votable_start();

        if previous_start <= start {
            return false;
        }

        let before: Vec<_> = self.entries.iter().map(|entry| entry.id()).collect();
        let reentered: Vec<_> = self.entries.drain(start..previous_start).collect();

        for entry in reentered {
            let position = self.priority_position(&entry);
            self.entries.insert(position, entry);
        }

        self.renumber();

        self.entries
            .iter()
            .map(|entry| entry.id())
            .ne(before.into_iter())
    }

    fn renumber(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.set_index(index);
        }
    }

    fn update_current(&mut self, index: Option<usize>) {
        if self.current_index != index {
            self.current_index = index;
            self.events.send(QueueEvent::CurrentIndexChanged { index });
        }
    }

    fn emit_reordered(&self) {
        self.events.send(QueueEvent::Reordered {
            start: self.votable_start(),
            tail: self.tail(),
        });
    }
}

impl<T> Default for Playlist<T>
where
    T: QueueItem,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist_of(count: usize) -> (Playlist<String>, Vec<EntryId>) {
        let mut playlist = Playlist::new();
        let ids = playlist.add((0..count).map(|i| format!("song {i}")));

        (playlist, ids)
    }

    fn order(playlist: &Playlist<String>, ids: &[EntryId]) -> Vec<usize> {
        playlist
            .entries()
            .iter()
            .map(|entry| ids.iter().position(|id| *id == entry.id()).unwrap())
            .collect()
    }

    fn votes(playlist: &Playlist<String>) -> Vec<u32> {
        playlist.entries().iter().map(|entry| entry.votes()).collect()
    }

    #[test]
    fn test_vote_moves_entry_ahead_of_lower_counts() {
        let (mut playlist, ids) = playlist_of(4);

        let position = playlist.vote(ids[2]).unwrap();

        assert_eq!(position, 0, "a single vote should beat unvoted entries");
        assert_eq!(order(&playlist, &ids), vec![2, 0, 1, 3]);

        for (index, entry) in playlist.entries().iter().enumerate() {
            assert_eq!(entry.index(), index, "indexes should be renumbered");
        }
    }

    #[test]
    fn test_equal_votes_keep_insertion_order() {
        let (mut playlist, ids) = playlist_of(4);
        playlist.set_current_index(Some(1)).unwrap();

        playlist.vote(ids[3]).unwrap();
        assert_eq!(order(&playlist, &ids), vec![0, 1, 3, 2]);

        playlist.vote(ids[2]).unwrap();
        assert_eq!(
            order(&playlist, &ids),
            vec![0, 1, 2, 3],
            "a tie should fall back to insertion order"
        );
        assert_eq!(votes(&playlist), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_higher_count_overtakes_earlier_entry() {
        let (mut playlist, ids) = playlist_of(3);

        playlist.vote(ids[0]).unwrap();
        playlist.vote(ids[2]).unwrap();
        playlist.vote(ids[2]).unwrap();

        assert_eq!(order(&playlist, &ids), vec![2, 0, 1]);
        assert_eq!(votes(&playlist), vec![2, 1, 0]);
    }

    #[test]
    fn test_cannot_vote_for_played_entries() {
        let (mut playlist, ids) = playlist_of(3);
        playlist.set_current_index(Some(1)).unwrap();

        assert_eq!(playlist.vote(ids[0]), Err(QueueError::NotVotable(ids[0])));
        assert_eq!(playlist.vote(ids[1]), Err(QueueError::NotVotable(ids[1])));
        assert_eq!(votes(&playlist), vec![0, 0, 0], "votes should be unchanged");

        assert_eq!(playlist.vote(ids[2]), Ok(2));
        assert_eq!(votes(&playlist), vec![0, 0, 1]);
    }

    #[test]
    fn test_vote_for_unknown_entry() {
        let (mut playlist, _) = playlist_of(2);
        let stranger = EntryId::new();

        assert_eq!(
            playlist.vote(stranger),
            Err(QueueError::UnknownEntry(stranger))
        );
    }

    #[test]
    fn test_cursor_resets_votes_up_to_and_including_it() {
        let (mut playlist, ids) = playlist_of(4);

        playlist.vote(ids[1]).unwrap();
        playlist.vote(ids[3]).unwrap();
        // Order is now [1, 3, 0, 2]
        assert_eq!(order(&playlist, &ids), vec![1, 3, 0, 2]);

        let reset = playlist.set_current_index(Some(0)).unwrap();

        assert_eq!(reset, vec![ids[1]]);
        assert_eq!(votes(&playlist), vec![0, 1, 0, 0]);

        let reset = playlist.set_current_index(Some(2)).unwrap();

        assert_eq!(reset, vec![ids[3]]);
        assert_eq!(votes(&playlist), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_cursor_bounds() {
        let mut playlist: Playlist<String> = Playlist::new();

        assert_eq!(
            playlist.set_current_index(Some(0)),
            Err(QueueError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert_eq!(playlist.set_current_index(None), Ok(vec![]));

        playlist.add(["a".to_string(), "b".to_string(), "c".to_string()]);

        assert_eq!(
            playlist.set_current_index(Some(3)),
            Err(QueueError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(playlist.current_index(), None, "a failed move changes nothing");
        assert!(playlist.set_current_index(Some(2)).is_ok());
    }

    #[test]
    fn test_moving_cursor_back_keeps_tail_ordered() {
        let (mut playlist, ids) = playlist_of(4);
        playlist.set_current_index(Some(1)).unwrap();
        playlist.vote(ids[3]).unwrap();

        let events = playlist.subscribe();
        playlist.set_current_index(Some(0)).unwrap();

        assert_eq!(
            order(&playlist, &ids),
            vec![0, 3, 1, 2],
            "the entry that rejoins the tail goes behind the voted one"
        );
        assert_eq!(votes(&playlist), vec![0, 1, 0, 0]);

        let received = events.drain();
        assert!(
            matches!(received.last(), Some(QueueEvent::Reordered { start: 1, .. })),
            "a settled tail is announced"
        );
    }

    #[test]
    fn test_clearing_cursor_returns_played_entries_to_tail() {
        let (mut playlist, ids) = playlist_of(3);
        playlist.set_current_index(Some(1)).unwrap();
        playlist.vote(ids[2]).unwrap();

        playlist.set_current_index(None).unwrap();

        assert_eq!(order(&playlist, &ids), vec![2, 0, 1]);
    }

    #[test]
    fn test_removing_current_entry_returns_played_entries_to_tail() {
        let (mut playlist, ids) = playlist_of(4);
        playlist.set_current_index(Some(2)).unwrap();
        playlist.vote(ids[3]).unwrap();

        playlist.remove(&[ids[2]]).unwrap();

        assert_eq!(playlist.current_index(), None);
        assert_eq!(order(&playlist, &ids), vec![3, 0, 1]);
        assert_eq!(votes(&playlist), vec![1, 0, 0]);
    }

    #[test]
    fn test_shadow_voted_entry_is_placed_by_priority() {
        let (mut playlist, ids) = playlist_of(2);
        playlist.vote(ids[1]).unwrap();

        let guest = playlist.insert_shadow_voted("guest song".to_string());
        let entry = playlist.get(guest).unwrap();

        assert!(entry.is_shadow_voted());
        assert_eq!(entry.votes(), 1);
        assert_eq!(
            entry.index(),
            1,
            "the guest entry ties with the voted one and was inserted later"
        );
        assert_eq!(playlist.entries()[2].id(), ids[0]);
    }

    #[test]
    fn test_reset_clears_shadow_flag() {
        let (mut playlist, _) = playlist_of(1);
        let guest = playlist.insert_shadow_voted("guest song".to_string());
        let position = playlist.position_of(guest).unwrap();

        let reset = playlist.set_current_index(Some(position)).unwrap();
        let entry = playlist.get(guest).unwrap();

        assert_eq!(reset, vec![guest]);
        assert!(!entry.is_shadow_voted());
        assert_eq!(entry.votes(), 0);
    }

    #[test]
    fn test_remove_keeps_cursor_on_current_entry() {
        let (mut playlist, ids) = playlist_of(4);
        playlist.set_current_index(Some(2)).unwrap();

        let removed = playlist.remove(&[ids[0]]).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(playlist.current_index(), Some(1));
        assert_eq!(playlist.current_entry().unwrap().id(), ids[2]);

        playlist.remove(&[ids[2]]).unwrap();
        assert_eq!(
            playlist.current_index(),
            None,
            "removing the current entry clears the cursor"
        );
    }

    #[test]
    fn test_remove_is_all_or_nothing() {
        let (mut playlist, ids) = playlist_of(2);
        let stranger = EntryId::new();

        let result = playlist.remove(&[ids[0], stranger]);

        assert!(matches!(result, Err(QueueError::UnknownEntry(id)) if id == stranger));
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn test_move_entry_follows_current() {
        let (mut playlist, ids) = playlist_of(4);
        playlist.set_current_index(Some(1)).unwrap();

        playlist.move_entry(3, 0).unwrap();

        assert_eq!(order(&playlist, &ids), vec![3, 0, 1, 2]);
        assert_eq!(playlist.current_index(), Some(2));
        assert_eq!(
            playlist.move_entry(0, 4),
            Err(QueueError::IndexOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let (mut playlist, ids) = playlist_of(3);
        let events = playlist.subscribe();

        playlist.set_current_index(Some(0)).unwrap();
        playlist.vote(ids[2]).unwrap();

        let received = events.drain();

        assert_eq!(received.len(), 2);
        assert_eq!(
            received[0],
            QueueEvent::CurrentIndexChanged { index: Some(0) }
        );

        match &received[1] {
            QueueEvent::Reordered { start, tail } => {
                assert_eq!(*start, 1);

                let tail_ids: Vec<_> = tail.iter().map(|entry| entry.id).collect();
                assert_eq!(tail_ids, vec![ids[2], ids[1]]);
            }
            other => panic!("expected a reorder, got {other:?}"),
        }
    }

    #[test]
    fn test_clear() {
        let (mut playlist, ids) = playlist_of(2);
        playlist.set_current_index(Some(0)).unwrap();

        assert_eq!(playlist.clear(), ids);
        assert!(playlist.is_empty());
        assert_eq!(playlist.current_index(), None);
        assert!(playlist.tail().is_empty());
    }
}
