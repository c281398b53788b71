//! # w3a-model
//!
//! [`Llm`](w3a_core::Llm) implementations for the Web3 agent.
//!
//! - [`GeminiModel`] talks to the Gemini `generateContent` REST API
//! - [`MockLlm`] replays scripted responses in tests

pub mod gemini;
pub mod mock;
pub mod retry;

pub use gemini::{DEFAULT_MODEL, GeminiModel};
pub use mock::MockLlm;
pub use retry::RetryConfig;
