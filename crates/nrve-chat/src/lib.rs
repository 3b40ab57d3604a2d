pub mod context;
pub mod gemini;
pub mod prompt;
pub mod service;

pub use context::{select_context, ContextLimits, ContextSource, JournalContext};
pub use gemini::GeminiModel;
pub use service::{ChatReply, ChatService, ChatSettings};
