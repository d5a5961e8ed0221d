use serde::Serialize;

use crate::{EntryId, EntrySnapshot};

/// Describes the changes a [Playlist](crate::Playlist) announces to its observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum QueueEvent<T> {
    /// An entry was appended or inserted.
    EntryAdded { entry: EntrySnapshot<T> },
    /// An entry was removed.
    EntryRemoved { entry: EntrySnapshot<T> },
    /// The votable tail changed order or vote counts.
    Reordered {
        /// The position of the first entry in `tail`.
        start: usize,
        /// The new order of every entry after the current one.
        tail: Vec<EntrySnapshot<T>>,
    },
    /// The currently playing entry changed.
    CurrentIndexChanged { index: Option<usize> },
    /// The cursor passed these entries, so their votes were cleared.
    VotesReset { entries: Vec<EntryId> },
    /// Every entry was removed.
    Cleared,
}
