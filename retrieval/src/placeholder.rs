//! `[GAMBAR n]` image placeholders in answer text.
//!
//! Placeholder `n` refers to the `n`-th stored image path (1-based). A
//! placeholder without a matching path is "missing": renderers drop it or
//! show a marker, never fail.

use std::sync::LazyLock;

use faq_store::ImagePaths;
use regex_lite::Regex;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[GAMBAR\s*(\d+)\]").ok());

/// A piece of resolved answer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Image { number: usize, path: String },
    MissingImage { number: usize },
}

/// Answer text split around its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnswer {
    segments: Vec<Segment>,
    images: ImagePaths,
}

/// Split `answer_text` into text and image segments.
pub fn resolve_placeholders(answer_text: &str, images: &ImagePaths) -> ResolvedAnswer {
    let mut segments = Vec::new();
    let mut last = 0;

    if let Some(re) = PLACEHOLDER.as_ref() {
        for caps in re.captures_iter(answer_text) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Text(answer_text[last..whole.start()].to_string()));
            }
            let number = digits.as_str().parse().unwrap_or(usize::MAX);
            segments.push(match images.for_placeholder(number) {
                Some(path) => Segment::Image {
                    number,
                    path: path.to_string(),
                },
                None => Segment::MissingImage { number },
            });
            last = whole.end();
        }
    }

    if last < answer_text.len() {
        segments.push(Segment::Text(answer_text[last..].to_string()));
    }

    ResolvedAnswer {
        segments,
        images: images.clone(),
    }
}

impl ResolvedAnswer {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the text contains any placeholder, valid or not.
    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Text(_)))
    }

    /// Placeholder numbers with no stored image.
    pub fn missing(&self) -> Vec<usize> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::MissingImage { number } => Some(*number),
                _ => None,
            })
            .collect()
    }

    /// Paths of valid placeholders in text order.
    pub fn referenced_images(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Image { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every stored image when the text has no placeholder at all, for a
    /// gallery below the answer; otherwise nothing.
    pub fn unreferenced_images(&self) -> Vec<&str> {
        if self.has_placeholders() {
            Vec::new()
        } else {
            self.images.iter().collect()
        }
    }

    /// Images to attach to a chat reply: the referenced ones, or all of them
    /// when no placeholder resolved.
    pub fn images_to_send(&self) -> Vec<&str> {
        let referenced = self.referenced_images();
        if referenced.is_empty() {
            self.images.iter().collect()
        } else {
            referenced
        }
    }

    /// Rebuild the text, letting `render` replace each placeholder.
    pub fn render<F>(&self, mut render: F) -> String
    where
        F: FnMut(&Segment) -> String,
    {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                other => render(other),
            })
            .collect()
    }
}

/// Public URL for a stored image path: `./images/...` becomes `/images/...`.
pub fn image_url(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    if let Some(rest) = path
        .strip_prefix('.')
        .filter(|rest| rest.starts_with("/images"))
    {
        return rest.to_string();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn images() -> ImagePaths {
        ImagePaths::parse("./images/ED/a.jpg;./images/ED/b.jpg")
    }

    #[test]
    fn test_resolve_valid_and_missing() {
        let resolved = resolve_placeholders("Step [GAMBAR 2] then [gambar3] done", &images());

        assert_eq!(
            resolved.segments(),
            [
                Segment::Text("Step ".to_string()),
                Segment::Image {
                    number: 2,
                    path: "./images/ED/b.jpg".to_string()
                },
                Segment::Text(" then ".to_string()),
                Segment::MissingImage { number: 3 },
                Segment::Text(" done".to_string()),
            ]
        );
        assert_eq!(resolved.missing(), vec![3]);
        assert_eq!(resolved.referenced_images(), vec!["./images/ED/b.jpg"]);
        assert!(resolved.unreferenced_images().is_empty());
    }

    #[test]
    fn test_zero_is_missing() {
        let resolved = resolve_placeholders("[GAMBAR 0]", &images());
        assert_eq!(resolved.missing(), vec![0]);
    }

    #[test]
    fn test_no_placeholders_exposes_gallery() {
        let resolved = resolve_placeholders("Plain answer", &images());
        assert!(!resolved.has_placeholders());
        assert_eq!(
            resolved.unreferenced_images(),
            vec!["./images/ED/a.jpg", "./images/ED/b.jpg"]
        );
        assert_eq!(resolved.render(|_| String::new()), "Plain answer");
    }

    #[test]
    fn test_images_to_send_falls_back_to_all() {
        let resolved = resolve_placeholders("Broken [GAMBAR 9]", &images());
        assert_eq!(resolved.images_to_send().len(), 2);

        let resolved = resolve_placeholders("See [GAMBAR 1]", &images());
        assert_eq!(resolved.images_to_send(), vec!["./images/ED/a.jpg"]);
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let resolved = resolve_placeholders("A [GAMBAR 1] B [GAMBAR 5]", &images());
        let text = resolved.render(|segment| match segment {
            Segment::Image { number, path } => format!("<{number}:{}>", image_url(path)),
            _ => String::new(),
        });
        assert_eq!(text, "A <1:/images/ED/a.jpg> B ");
    }

    #[test]
    fn test_image_url() {
        assert_eq!(image_url("./images/ED/a.jpg"), "/images/ED/a.jpg");
        assert_eq!(image_url(".\\images\\ED\\a.jpg"), "/images/ED/a.jpg");
        assert_eq!(image_url("https://cdn/x.jpg"), "https://cdn/x.jpg");
    }
}
