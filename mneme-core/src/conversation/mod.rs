//! Multi-turn conversation management
//!
//! The conversation layer owns the message model, the interchangeable memory
//! policies that shape each outgoing view, the summarizer they delegate to,
//! and the session orchestration around one turn.
//!
//! # Example
//!
//! ```rust,ignore
//! use mneme_core::conversation::{ConversationSession, MemoryPolicy};
//!
//! let session = ConversationSession::builder("session-1", store, llm)
//!     .policy(MemoryPolicy::Trimming { window_size: 8 })
//!     .build()?;
//! session.start().await?;
//! let answer = session.ask("Hello!").await?;
//! ```

mod message;
mod policy;
mod session;
mod summarizer;

pub use message::{render_transcript, Message, MessageRole};
pub use policy::{MemoryPolicy, OutgoingView};
pub use session::{generate_session_id, ConversationSession, SessionBuilder, SessionState};
pub use summarizer::Summarizer;
