pub mod entry;
pub mod error;
pub mod model;
pub mod mood;
pub mod prompt;
pub mod store;

pub use entry::{
    derive_preview, derive_title, format_timestamp, DocumentEntry, JournalDocument, JournalEntry,
};
pub use error::{NrveError, NrveResult};
pub use model::LanguageModel;
pub use mood::{respond_to_mood, Mood};
pub use prompt::PromptKind;
pub use store::{entry_matches, JournalStore};
