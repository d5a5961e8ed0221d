use std::fmt::Debug;

/// Represents something that can be put in a [Playlist](crate::Playlist).
pub trait QueueItem
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// A short human readable description, used in logs.
    fn describe(&self) -> String;
}

impl QueueItem for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl QueueItem for &'static str {
    fn describe(&self) -> String {
        self.to_string()
    }
}
