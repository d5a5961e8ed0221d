use serde::Serialize;

use crate::Id;

/// Marker for [EntryId].
#[derive(Debug)]
pub enum Entry {}

pub type EntryId = Id<Entry>;

/// A single entry in a [Playlist](crate::Playlist).
#[derive(Debug, Clone)]
pub struct PlaylistEntry<T> {
    id: EntryId,
    /// Position in the playlist, renumbered whenever entries move or are removed.
    index: usize,
    /// Insertion order, never renumbered. Breaks ties between equal vote counts.
    sequence: u64,
    votes: u32,
    /// Added by a guest outside the voting path, and already counted as one vote.
    shadow_voted: bool,
    item: T,
}

/// A read-only copy of an entry, handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot<T> {
    pub id: EntryId,
    pub index: usize,
    pub votes: u32,
    pub shadow_voted: bool,
    pub item: T,
}

impl<T> PlaylistEntry<T> {
    pub(crate) fn new(item: T, index: usize, sequence: u64) -> Self {
        Self {
            id: EntryId::new(),
            index,
            sequence,
            votes: 0,
            shadow_voted: false,
            item,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn votes(&self) -> u32 {
        self.votes
    }

    pub fn is_shadow_voted(&self) -> bool {
        self.shadow_voted
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    /// Whether this entry belongs before `other` in the votable tail.
    pub fn ranks_above(&self, other: &Self) -> bool {
        self.votes > other.votes || (self.votes == other.votes && self.sequence < other.sequence)
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn vote(&mut self) {
        self.votes += 1;
    }

    pub(crate) fn shadow_vote(&mut self) {
        self.shadow_voted = true;
        self.votes += 1;
    }

    /// Clears votes and the shadow flag. Returns whether there was anything to clear.
    pub(crate) fn reset_votes(&mut self) -> bool {
        let had_votes = self.votes > 0 || self.shadow_voted;

        self.votes = 0;
        self.shadow_voted = false;

        had_votes
    }
}

impl<T> PlaylistEntry<T>
where
    T: Clone,
{
    pub fn snapshot(&self) -> EntrySnapshot<T> {
        EntrySnapshot {
            id: self.id,
            index: self.index,
            votes: self.votes,
            shadow_voted: self.shadow_voted,
            item: self.item.clone(),
        }
    }
}
