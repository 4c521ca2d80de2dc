//! Knowledge entries and the values that describe them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Label shown for the "every tag" choice in filter menus.
pub const ALL_TAGS_LABEL: &str = "Semua Modul";

/// Serialized form of an empty image list.
pub const NO_IMAGES: &str = "none";

/// One FAQ/SOP knowledge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub tag: String,
    pub title: String,
    /// Long-form answer; may contain `[GAMBAR n]` placeholders.
    pub answer_text: String,
    /// User phrasings; embedded but never shown to end users.
    pub keywords: String,
    pub image_paths: ImagePaths,
    pub source_url: Option<String>,
}

impl Entry {
    /// Combine a stored id with its metadata.
    pub fn from_metadata(id: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self {
            id: id.into(),
            tag: metadata.tag,
            title: metadata.title,
            answer_text: metadata.answer_text,
            keywords: metadata.keywords,
            image_paths: metadata.image_paths,
            source_url: metadata.source_url,
        }
    }

    /// Integer used for newest-first ordering. Signed ids keep their sign;
    /// anything that does not fit an `i64` counts as 0.
    pub fn sort_key(&self) -> i64 {
        self.id.trim().parse().unwrap_or(0)
    }
}

/// Write-side shape of an entry: everything except the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub tag: String,
    pub title: String,
    pub answer_text: String,
    pub keywords: String,
    pub image_paths: ImagePaths,
    pub source_url: Option<String>,
}

impl EntryDraft {
    pub fn new(
        tag: impl Into<String>,
        title: impl Into<String>,
        answer_text: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            title: title.into(),
            answer_text: answer_text.into(),
            ..Self::default()
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    pub fn with_images(mut self, image_paths: ImagePaths) -> Self {
        self.image_paths = image_paths;
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.source_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Reject drafts missing a title or an answer.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        if self.answer_text.trim().is_empty() {
            return Err(StoreError::Validation("answer text is required".to_string()));
        }
        Ok(())
    }

    pub(crate) fn into_metadata(self) -> EntryMetadata {
        EntryMetadata {
            tag: self.tag,
            title: self.title,
            answer_text: self.answer_text,
            keywords: self.keywords,
            image_paths: self.image_paths,
            source_url: self.source_url,
        }
    }
}

/// Metadata persisted next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub tag: String,
    pub title: String,
    pub answer_text: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub image_paths: ImagePaths,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Id requested for an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryId {
    /// Write to exactly this id, replacing any existing entry.
    Explicit(String),
    /// Assign the next numeric id.
    AutoAssign,
}

impl EntryId {
    /// `"auto"` (any case) and blank input mean [`EntryId::AutoAssign`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
            EntryId::AutoAssign
        } else {
            EntryId::Explicit(raw.to_string())
        }
    }
}

impl From<Option<String>> for EntryId {
    fn from(id: Option<String>) -> Self {
        id.map_or(EntryId::AutoAssign, |id| EntryId::parse(&id))
    }
}

/// Next id after the largest all-digit id, or `"1"`.
///
/// Ids are compared and incremented as decimal strings, so there is no upper
/// bound on their length.
pub fn next_numeric_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter()
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .map(|id| match id.trim_start_matches('0') {
            "" => "0",
            digits => digits,
        })
        .max_by_key(|digits| (digits.len(), *digits))
        .map_or_else(|| "1".to_string(), increment_decimal)
}

/// Add one to a string of ASCII digits without leading zeros.
fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    bytes.insert(0, b'1');
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Ordered image paths; index `i` backs placeholder `[GAMBAR i+1]`.
///
/// Stored as one `;`-joined string, or `none` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ImagePaths(Vec<String>);

impl ImagePaths {
    pub fn new(paths: Vec<String>) -> Self {
        Self(paths.into_iter().map(|p| normalize_path(&p)).filter(|p| !p.is_empty()).collect())
    }

    /// Parse the stored form. Accepts `none` in any case, stray quotes and
    /// Windows separators.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        if raw.is_empty() || raw.eq_ignore_ascii_case(NO_IMAGES) {
            return Self::default();
        }
        Self::new(raw.split(';').map(str::to_string).collect())
    }

    /// Path behind placeholder `number` (1-based).
    pub fn for_placeholder(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn normalize_path(path: &str) -> String {
    path.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .replace('\\', "/")
}

impl From<String> for ImagePaths {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ImagePaths> for String {
    fn from(paths: ImagePaths) -> Self {
        paths.to_string()
    }
}

impl fmt::Display for ImagePaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str(NO_IMAGES)
        } else {
            f.write_str(&self.0.join(";"))
        }
    }
}

/// Tag restriction for queries and listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TagFilter {
    #[default]
    All,
    Tag(String),
}

impl TagFilter {
    /// Blank input, `all` and [`ALL_TAGS_LABEL`] (any case) mean every tag.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.eq_ignore_ascii_case("all")
            || raw.eq_ignore_ascii_case(ALL_TAGS_LABEL)
        {
            TagFilter::All
        } else {
            TagFilter::Tag(raw.to_string())
        }
    }

    /// The tag to pre-filter on, if any.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            TagFilter::All => None,
            TagFilter::Tag(tag) => Some(tag),
        }
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.as_tag().is_none_or(|wanted| wanted == tag)
    }
}

impl From<Option<&str>> for TagFilter {
    fn from(raw: Option<&str>) -> Self {
        raw.map_or(TagFilter::All, TagFilter::parse)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFilter::All => f.write_str(ALL_TAGS_LABEL),
            TagFilter::Tag(tag) => f.write_str(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_next_numeric_id_ignores_non_numeric() {
        assert_eq!(next_numeric_id([]), "1");
        assert_eq!(next_numeric_id(["apple", "x1"]), "1");
        assert_eq!(next_numeric_id(["5", "3", "10", "apple"]), "11");
        assert_eq!(next_numeric_id(["-4", "2"]), "3");
    }

    #[test]
    fn test_next_numeric_id_has_no_width_limit() {
        assert_eq!(next_numeric_id(["18446744073709551615"]), "18446744073709551616");
        assert_eq!(
            next_numeric_id(["99999999999999999999999", "7"]),
            "100000000000000000000000"
        );
        assert_eq!(next_numeric_id(["007", "12"]), "13");
        assert_eq!(next_numeric_id(["0099"]), "100");
        assert_eq!(next_numeric_id(["000"]), "1");
    }

    #[test]
    fn test_entry_id_parse() {
        assert_eq!(EntryId::parse("auto"), EntryId::AutoAssign);
        assert_eq!(EntryId::parse(" AUTO "), EntryId::AutoAssign);
        assert_eq!(EntryId::parse(""), EntryId::AutoAssign);
        assert_eq!(EntryId::parse("42"), EntryId::Explicit("42".to_string()));
        assert_eq!(EntryId::from(None::<String>), EntryId::AutoAssign);
    }

    #[test]
    fn test_image_paths_parse_and_display() {
        let paths = ImagePaths::parse("./images/ED/a.jpg; .\\images\\ED\\b.png");
        assert_eq!(paths.as_slice(), ["./images/ED/a.jpg", "./images/ED/b.png"]);
        assert_eq!(paths.to_string(), "./images/ED/a.jpg;./images/ED/b.png");
        assert_eq!(paths.for_placeholder(2), Some("./images/ED/b.png"));
        assert_eq!(paths.for_placeholder(0), None);
        assert_eq!(paths.for_placeholder(3), None);

        assert!(ImagePaths::parse("None").is_empty());
        assert!(ImagePaths::parse("'none'").is_empty());
        assert_eq!(ImagePaths::default().to_string(), "none");
    }

    #[test]
    fn test_image_paths_serde_as_string() {
        let paths = ImagePaths::parse("./images/x.jpg");
        let json = serde_json::to_string(&paths).unwrap();
        assert_eq!(json, "\"./images/x.jpg\"");
        let back: ImagePaths = serde_json::from_str(&json).unwrap();
        assert_eq!(back, paths);
    }

    #[test]
    fn test_tag_filter_parse() {
        assert_eq!(TagFilter::parse("Semua Modul"), TagFilter::All);
        assert_eq!(TagFilter::parse("all"), TagFilter::All);
        assert_eq!(TagFilter::parse(" "), TagFilter::All);
        assert_eq!(TagFilter::parse("ED"), TagFilter::Tag("ED".to_string()));
        assert!(TagFilter::All.matches("anything"));
        assert!(!TagFilter::Tag("ED".to_string()).matches("OPD"));
    }

    #[test]
    fn test_validate_requires_title_and_answer() {
        assert!(EntryDraft::new("ED", "Title", "Answer").validate().is_ok());
        assert!(matches!(
            EntryDraft::new("ED", " ", "Answer").validate(),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            EntryDraft::new("ED", "Title", "").validate(),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_sort_key() {
        let mut entry = Entry::from_metadata(
            "10",
            EntryDraft::new("ED", "t", "a").into_metadata(),
        );
        assert_eq!(entry.sort_key(), 10);
        entry.id = "apple".to_string();
        assert_eq!(entry.sort_key(), 0);
        entry.id = "-4".to_string();
        assert_eq!(entry.sort_key(), -4);
    }
}
