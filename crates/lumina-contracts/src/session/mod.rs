//! Session state machine.
//!
//! Every user action and every gateway completion goes through the pure
//! [`transition`] function, which returns the next session plus the effects
//! the runtime should perform. Completions carry the session generation they
//! were issued under so results for a replaced or cleared image are dropped.

mod action;
mod effect;
mod state;
mod transition;

pub use action::{Action, Completion};
pub use effect::{Effect, PreviewTicket};
pub use state::{
    HistoryEntry, Preview, Session, SessionPhase, StyleSuggestion, DEFAULT_PROMPT,
};
pub use transition::{transition, Disposition, Transition};
