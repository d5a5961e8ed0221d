mod entry;
mod playlist;
mod queue_item;

pub use entry::*;
pub use playlist::*;
pub use queue_item::*;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Index {index} is out of range for a queue of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Entry {0} is not in the queue")]
    UnknownEntry(EntryId),
    /// The entry is playing or has already been played.
    #[error("Entry {0} is not in the votable part of the queue")]
    NotVotable(EntryId),
}
