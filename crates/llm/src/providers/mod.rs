//! Provider adapters. Every real provider in the priority chain speaks the
//! OpenAI-compatible chat-completions wire format except Gemini, which gets
//! its own adapter.

pub mod gemini;
pub mod openai_compat;
pub mod stub;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use stub::StubProvider;
