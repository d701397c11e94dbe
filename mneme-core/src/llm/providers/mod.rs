//! Text-completion provider implementations

pub mod groq;
pub mod openai;

pub use groq::GroqProvider;
pub use openai::OpenAiProvider;
