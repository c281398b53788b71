//! Gemini REST client (`generateContent` / `streamGenerateContent`).

mod client;
mod convert;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiModel};
