//! Embedding input text for knowledge entries.
//!
//! The layout here is part of search quality: entries embedded with one
//! layout and queried against another drift apart. Change it only together
//! with a full re-embed of the store.

use std::sync::LazyLock;

use regex_lite::Regex;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[GAMBAR\s*\d+\]").ok());

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Fields that make up the document-side embedding input of an entry.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingContext<'a> {
    pub tag: &'a str,
    pub tag_description: &'a str,
    pub title: &'a str,
    pub keywords: &'a str,
    pub answer_text: &'a str,
}

impl<'a> EmbeddingContext<'a> {
    pub fn new(tag: &'a str, title: &'a str, answer_text: &'a str) -> Self {
        Self {
            tag,
            tag_description: "",
            title,
            keywords: "",
            answer_text,
        }
    }

    pub fn with_tag_description(mut self, description: &'a str) -> Self {
        self.tag_description = description;
        self
    }

    pub fn with_keywords(mut self, keywords: &'a str) -> Self {
        self.keywords = keywords;
        self
    }

    /// Render the embedding input.
    ///
    /// Tag context comes first, then the title, the keyword variants
    /// verbatim, and finally the cleaned answer body.
    pub fn render(&self) -> String {
        let description = self.tag_description.trim();
        let domain = if description.is_empty() {
            self.tag.to_string()
        } else {
            format!("{} ({description})", self.tag)
        };

        format!(
            "DOMAIN: {domain}\nDOKUMEN: {}\nVARIASI PERTANYAAN USER: {}\nISI KONTEN: {}",
            self.title,
            self.keywords,
            clean_answer_text(self.answer_text)
        )
    }
}

/// Strip image placeholders and collapse whitespace runs.
///
/// `[GAMBAR n]` markers carry no meaning for the embedding model.
pub fn clean_answer_text(answer_text: &str) -> String {
    let without_placeholders = match PLACEHOLDER.as_ref() {
        Some(re) => re.replace_all(answer_text, " ").into_owned(),
        None => answer_text.to_string(),
    };
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(without_placeholders.trim(), " ").into_owned(),
        None => without_placeholders.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_orders_fields() {
        let text = EmbeddingContext::new("ED", "Reset Password Procedure", "Open settings.")
            .with_tag_description("IGD, Emergency, Triage")
            .with_keywords("lupa password, ganti sandi")
            .render();

        assert_eq!(
            text,
            "DOMAIN: ED (IGD, Emergency, Triage)\n\
             DOKUMEN: Reset Password Procedure\n\
             VARIASI PERTANYAAN USER: lupa password, ganti sandi\n\
             ISI KONTEN: Open settings."
        );
    }

    #[test]
    fn test_render_without_description() {
        let text = EmbeddingContext::new("IT", "Printer", "Restart it").render();
        assert!(text.starts_with("DOMAIN: IT\nDOKUMEN: Printer\n"));
    }

    #[test]
    fn test_clean_answer_text_drops_placeholders() {
        assert_eq!(
            clean_answer_text("Click [GAMBAR 1] then\n\n save [gambar2] now"),
            "Click then save now"
        );
    }
}
