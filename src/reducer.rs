//! Stream reducer
//!
//! Folds the records of a specialist turn stream into the chat state: a list
//! of finalized messages plus at most one in-progress preview.

mod event;
mod state;
mod store;
mod transition;

#[cfg(test)]
mod proptests;

pub use event::StreamEvent;
pub use state::{ChatState, ChatUpdate, StreamingMessage};
pub use store::{ChatStore, DEFAULT_SAFETY_TIMEOUT};
pub use transition::{transition, Transition, TurnContext, UNATTRIBUTED};
