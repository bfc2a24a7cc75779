//! Conversation context — persisted history and its derived views.
//!
//! Two explicit views, per the engine's design:
//!
//! - [`ContextStore`] — the persisted, append-only conversation history
//!   with cached token counts, pruning, and summary state
//! - [`render_prompt`] — the per-request view sent to the model, built
//!   fresh each call from history + summary + retrieved context, never
//!   stored

pub mod render;
pub mod store;
pub mod summarizer;
pub mod token;

pub use render::render_prompt;
pub use store::{ContextStore, HistoryEntry};
