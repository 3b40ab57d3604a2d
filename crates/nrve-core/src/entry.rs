use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{NrveError, NrveResult};

pub const UNTITLED: &str = "Untitled entry";
pub const TITLE_MAX_CHARS: usize = 60;
pub const PREVIEW_MAX_CHARS: usize = 10;

// ---------------------------------------------------------------------------
// JournalEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub text: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(serialize_with = "fixed_width::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "fixed_width::serialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
}

impl JournalEntry {
    /// Build a new entry from raw draft text. Title and preview are derived
    /// here and nowhere else.
    pub fn new(text: impl Into<String>) -> NrveResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NrveError::Validation("text required".into()));
        }
        let now = now();
        Ok(Self {
            id: ulid::Ulid::new().to_string(),
            title: derive_title(&text),
            preview: derive_preview(&text),
            text,
            created_at: now,
            updated_at: now,
            favorite: false,
        })
    }

    /// Advance `updated_at`, strictly later than its previous value even when
    /// the clock has not moved past the stored precision.
    pub fn touch(&mut self) {
        let floor = self.updated_at + Duration::microseconds(1);
        self.updated_at = now().max(floor);
    }
}

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Canonical persisted form: RFC 3339, microseconds, `Z` suffix. Fixed width,
/// so string order is chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize timestamps with `format_timestamp` so JSON output sorts like the
/// stored columns. Parsing accepts any RFC 3339 form.
mod fixed_width {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&format_timestamp(ts)),
                None => s.serialize_none(),
            }
        }
    }
}

/// First line of the text, trimmed and cut to 60 characters.
pub fn derive_title(text: &str) -> String {
    let first = text.split(is_line_break).next().unwrap_or("").trim();
    if first.is_empty() {
        return UNTITLED.into();
    }
    let title: String = first.chars().take(TITLE_MAX_CHARS).collect();
    title.trim_end().to_string()
}

/// Short excerpt of whatever follows the title line.
pub fn derive_preview(text: &str) -> Option<String> {
    let body = text[text.find(is_line_break)?..].trim();
    if body.is_empty() {
        return None;
    }
    let preview: String = body.chars().take(PREVIEW_MAX_CHARS).collect();
    Some(preview.trim_end().to_string())
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

// ---------------------------------------------------------------------------
// JournalDocument (legacy `journal.json` shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JournalDocument {
    #[serde(default)]
    pub entries: Vec<DocumentEntry>,
}

/// Entry as found in a journal document. Older documents lack `updatedAt`,
/// `preview` and `favorite`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(serialize_with = "fixed_width::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "fixed_width::option::serialize"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub favorite: bool,
}

impl DocumentEntry {
    /// Normalize into a stored entry. Derived fields are recomputed from the
    /// text; blank entries are rejected.
    pub fn into_entry(self) -> Option<JournalEntry> {
        if self.text.trim().is_empty() {
            return None;
        }
        let id = if self.id.trim().is_empty() {
            ulid::Ulid::new().to_string()
        } else {
            self.id
        };
        let created_at = self.created_at.trunc_subsecs(6);
        let updated_at = self
            .updated_at
            .map(|t| t.trunc_subsecs(6))
            .unwrap_or(created_at);
        Some(JournalEntry {
            id,
            title: derive_title(&self.text),
            preview: derive_preview(&self.text),
            text: self.text,
            created_at,
            updated_at,
            favorite: self.favorite,
        })
    }
}

impl From<JournalEntry> for DocumentEntry {
    fn from(entry: JournalEntry) -> Self {
        Self {
            id: entry.id,
            text: entry.text,
            title: Some(entry.title),
            preview: entry.preview,
            created_at: entry.created_at,
            updated_at: Some(entry.updated_at),
            favorite: entry.favorite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_derives_fields() {
        let entry = JournalEntry::new("Hello\n\nWorld").unwrap();
        assert_eq!(entry.title, "Hello");
        assert_eq!(entry.preview.as_deref(), Some("World"));
        assert_eq!(entry.created_at, entry.updated_at);
        assert!(!entry.favorite);
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_new_entry_rejects_blank() {
        assert!(matches!(
            JournalEntry::new("   \n\t "),
            Err(NrveError::Validation(_))
        ));
        assert!(matches!(JournalEntry::new(""), Err(NrveError::Validation(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = JournalEntry::new("a").unwrap();
        let b = JournalEntry::new("a").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_title_truncated_to_60_chars() {
        let line = "é".repeat(80);
        let title = derive_title(&line);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(derive_title("\nsecond line"), UNTITLED);
        assert_eq!(derive_title("   "), UNTITLED);
        assert_eq!(derive_title("  padded  \r\nrest"), "padded");
    }

    #[test]
    fn test_preview() {
        assert_eq!(derive_preview("single line"), None);
        assert_eq!(derive_preview("title\n   "), None);
        assert_eq!(
            derive_preview("title\nSomething much longer than ten").as_deref(),
            Some("Something")
        );
    }

    #[test]
    fn test_touch_is_strictly_monotonic() {
        let mut entry = JournalEntry::new("x").unwrap();
        let before = entry.updated_at;
        entry.touch();
        assert!(entry.updated_at > before);
        let mid = entry.updated_at;
        entry.touch();
        assert!(entry.updated_at > mid);
        assert_eq!(entry.created_at, before);
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let b = "2024-01-01T00:00:00.5Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(format_timestamp(&a), "2024-01-01T00:00:00.000000Z");
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn test_document_entry_without_updated_at() {
        let json = r#"{"id":"abc","text":"Old day\nfelt fine","title":"stale","createdAt":"2024-05-01T10:00:00.000Z"}"#;
        let doc: DocumentEntry = serde_json::from_str(json).unwrap();
        let entry = doc.into_entry().unwrap();
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.title, "Old day");
        assert_eq!(entry.updated_at, entry.created_at);
        assert!(!entry.favorite);
    }

    #[test]
    fn test_document_entry_blank_text_skipped() {
        let json = r#"{"id":"abc","text":"  ","createdAt":"2024-05-01T10:00:00Z"}"#;
        let doc: DocumentEntry = serde_json::from_str(json).unwrap();
        assert!(doc.into_entry().is_none());
    }

    #[test]
    fn test_entry_json_is_camel_case() {
        let entry = JournalEntry::new("Title only").unwrap();
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("preview").is_none());
        assert_eq!(value["favorite"], false);
    }

    #[test]
    fn test_entry_json_timestamps_are_fixed_width() {
        let whole = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let half = "2024-01-01T00:00:00.5Z".parse::<DateTime<Utc>>().unwrap();
        let mut a = JournalEntry::new("a").unwrap();
        a.created_at = whole;
        a.updated_at = whole;
        let mut b = JournalEntry::new("b").unwrap();
        b.created_at = half;
        b.updated_at = half;

        let va = serde_json::to_value(&a).unwrap();
        let vb = serde_json::to_value(&b).unwrap();
        assert_eq!(va["createdAt"], "2024-01-01T00:00:00.000000Z");
        assert_eq!(vb["updatedAt"], "2024-01-01T00:00:00.500000Z");
        assert!(va["createdAt"].as_str().unwrap() < vb["createdAt"].as_str().unwrap());

        let back: JournalEntry = serde_json::from_value(va).unwrap();
        assert_eq!(back.created_at, whole);
    }

    #[test]
    fn test_document_entry_json_timestamps_are_fixed_width() {
        let json = r#"{"id":"a","text":"a","createdAt":"2024-01-01T00:00:00Z"}"#;
        let doc: DocumentEntry = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00.000000Z");
        assert!(value.get("updatedAt").is_none());

        let exported = DocumentEntry::from(doc.into_entry().unwrap());
        let value = serde_json::to_value(&exported).unwrap();
        assert_eq!(value["updatedAt"], "2024-01-01T00:00:00.000000Z");
    }
}
