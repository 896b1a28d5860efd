mod controller;
mod entry;
mod fallback;
mod sync;
mod timeline;
mod typing;

#[cfg(test)]
mod test_support;

pub use controller::ChatController;
pub use entry::{EntryId, EntryStatus, MessageEntry, Sender};
pub use sync::SendOutcome;
pub use timeline::{ChatTimeline, TimelineSignal};
