//! Building blocks for a shared party playlist: typed ids, live signals,
//! session settings, and the playlist with its vote-driven reordering.

mod config;
mod events;
mod queuing;
mod signal;
mod util;

pub use config::*;
pub use events::*;
pub use queuing::*;
pub use signal::*;
pub use util::*;
