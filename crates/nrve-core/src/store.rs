use crate::entry::{JournalDocument, JournalEntry};
use crate::error::NrveResult;

pub trait JournalStore {
    // CRUD
    fn create(&self, text: &str) -> NrveResult<JournalEntry>;
    fn get(&self, id: &str) -> NrveResult<Option<JournalEntry>>;
    fn delete(&self, id: &str) -> NrveResult<usize>;
    fn set_favorite(&self, id: &str, favorite: bool) -> NrveResult<JournalEntry>;

    // Reads
    fn list(&self) -> NrveResult<Vec<JournalEntry>>;
    fn recent(&self, limit: usize) -> NrveResult<Vec<JournalEntry>>;
    fn all_in_store_order(&self) -> NrveResult<Vec<JournalEntry>>;
    fn search(&self, query: &str, limit: usize) -> NrveResult<Vec<JournalEntry>>;

    // Documents
    fn import_document(&self, doc: JournalDocument) -> NrveResult<usize>;
    fn export_document(&self) -> NrveResult<JournalDocument>;

    // Stats
    fn count(&self) -> NrveResult<usize>;
}

/// Case-insensitive substring match against an entry's text or title.
pub fn entry_matches(entry: &JournalEntry, needle_lower: &str) -> bool {
    entry.text.to_lowercase().contains(needle_lower)
        || entry.title.to_lowercase().contains(needle_lower)
}
