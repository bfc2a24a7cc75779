//! Model backend implementations for Sidekick.
//!
//! The engine talks to whatever inference server the user runs locally
//! (LM Studio, Ollama, vLLM) or a remote provider — all through the
//! OpenAI-compatible chat completions API. The [`BackendRouter`] holds
//! the registered backends and resolves the active one per turn.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatBackend;
pub use router::{BackendRouter, build_from_config};
