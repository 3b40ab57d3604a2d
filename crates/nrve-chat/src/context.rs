//! Journal context selection for outbound chat prompts.
//!
//! A fixed trigger-keyword set decides whether the message is about the
//! journal. If so, every longer word is matched against entries and the first
//! few hits (in store order, unranked) are used. Otherwise, or when nothing
//! matched, the most recently stored entries are used instead.
//!
//! Terms are split on any whitespace and lose leading and trailing
//! punctuation, so `chemistry?` searches for `chemistry`. Splitting on single
//! spaces with punctuation kept would match fewer entries.

use std::collections::HashSet;

use nrve_core::{JournalEntry, JournalStore, NrveResult};

pub const JOURNAL_KEYWORDS: &[&str] = &[
    "journal",
    "entry",
    "wrote",
    "wrote about",
    "remember when",
    "last time",
    "before",
    "yesterday",
    "today",
];

/// Words of this length or shorter are never used as search terms.
const MIN_TERM_CHARS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    /// Cap on keyword-matched entries.
    pub match_limit: usize,
    /// How many recent entries the fallback uses.
    pub recent_limit: usize,
    /// Characters of entry text quoted per line.
    pub excerpt_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            match_limit: 3,
            recent_limit: 5,
            excerpt_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Relevant,
    Recent,
}

#[derive(Debug, Clone)]
pub struct JournalContext {
    pub source: ContextSource,
    pub entries: Vec<JournalEntry>,
}

impl JournalContext {
    /// Render the block spliced into the prompt.
    pub fn render(&self, excerpt_chars: usize) -> String {
        let header = match self.source {
            ContextSource::Relevant => "Relevant journal entries:",
            ContextSource::Recent => "Recent journal entries for context:",
        };
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| {
                let excerpt: String = e.text.chars().take(excerpt_chars).collect();
                format!("- {}: {excerpt}...", e.title)
            })
            .collect();
        format!("{header}\n{}", lines.join("\n"))
    }
}

pub fn asks_about_journal(message_lower: &str) -> bool {
    JOURNAL_KEYWORDS.iter().any(|kw| message_lower.contains(kw))
}

/// Lowercased words longer than three characters, edge punctuation removed.
pub fn search_terms(message: &str) -> Vec<String> {
    message
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().count() > MIN_TERM_CHARS)
        .collect()
}

/// Pick the journal entries to show the model for this message, if any.
pub fn select_context<S: JournalStore + ?Sized>(
    store: &S,
    message: &str,
    limits: &ContextLimits,
) -> NrveResult<Option<JournalContext>> {
    if asks_about_journal(&message.to_lowercase()) {
        let matched = match_terms(store, &search_terms(message), limits.match_limit)?;
        if !matched.is_empty() {
            return Ok(Some(JournalContext {
                source: ContextSource::Relevant,
                entries: matched,
            }));
        }
    }

    let recent = store.recent(limits.recent_limit)?;
    if recent.is_empty() {
        return Ok(None);
    }
    Ok(Some(JournalContext {
        source: ContextSource::Recent,
        entries: recent,
    }))
}

/// Union of per-term matches, first occurrence wins, capped.
fn match_terms<S: JournalStore + ?Sized>(
    store: &S,
    terms: &[String],
    limit: usize,
) -> NrveResult<Vec<JournalEntry>> {
    if terms.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let entries = store.all_in_store_order()?;
    let lowered: Vec<(String, String)> = entries
        .iter()
        .map(|e| (e.text.to_lowercase(), e.title.to_lowercase()))
        .collect();

    let mut seen = HashSet::new();
    let mut picked = Vec::new();
    for term in terms {
        for (entry, (text, title)) in entries.iter().zip(&lowered) {
            if (text.contains(term.as_str()) || title.contains(term.as_str()))
                && seen.insert(entry.id.as_str())
            {
                picked.push(entry.clone());
                if picked.len() == limit {
                    return Ok(picked);
                }
            }
        }
    }
    Ok(picked)
}
