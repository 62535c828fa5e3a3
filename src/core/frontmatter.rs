//! YAML front matter for imported markdown notes

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref FRONTMATTER_RE: Regex = Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)").unwrap();
    static ref HEADING_RE: Regex = Regex::new(r"(?m)^#\s+(.+?)\s*$").unwrap();
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub tags: Vec<String>,
    /// Identifier of the document the note was extracted from
    pub source: Option<String>,
}

/// A markdown file split into metadata and body
#[derive(Debug, Clone)]
pub struct MarkdownNote {
    pub frontmatter: Option<Frontmatter>,
    pub body: String,
}

impl Frontmatter {
    /// Split `content` into front matter and body.
    ///
    /// Malformed YAML is treated as absent front matter; the block is still
    /// stripped from the body.
    pub fn parse(content: &str) -> MarkdownNote {
        let Some(caps) = FRONTMATTER_RE.captures(content) else {
            return MarkdownNote {
                frontmatter: None,
                body: content.trim().to_string(),
            };
        };

        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let frontmatter = match serde_yaml::from_str::<Frontmatter>(raw) {
            Ok(fm) => Some(fm),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed front matter");
                None
            }
        };

        MarkdownNote {
            frontmatter,
            body: content[end..].trim().to_string(),
        }
    }
}

impl MarkdownNote {
    /// Title from front matter, then first `# heading`, then `fallback`.
    ///
    /// A heading that supplies the title is removed from the returned body.
    pub fn title_and_body(&self, fallback: &str) -> (String, String) {
        let declared = self
            .frontmatter
            .as_ref()
            .and_then(|fm| fm.title.clone())
            .filter(|t| !t.trim().is_empty());
        if let Some(title) = declared {
            return (title, self.body.clone());
        }

        match HEADING_RE.captures(&self.body) {
            Some(caps) => {
                let line = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
                let body = format!("{}{}", &self.body[..line.start], &self.body[line.end..]);
                (caps[1].to_string(), body.trim().to_string())
            }
            None => (fallback.to_string(), self.body.clone()),
        }
    }

    pub fn tags(&self) -> Vec<String> {
        self.frontmatter
            .as_ref()
            .map(|fm| fm.tags.clone())
            .unwrap_or_default()
    }

    pub fn source(&self) -> Option<String> {
        self.frontmatter.as_ref()?.source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_frontmatter() {
        let content = "---\ntitle: Q3 budget review\ntags: [finance, q3]\nsource: doc-42\n---\n\nSpend is up.\n";
        let note = Frontmatter::parse(content);
        assert_eq!(
            note.title_and_body("fallback"),
            ("Q3 budget review".to_string(), "Spend is up.".to_string())
        );
        assert_eq!(note.tags(), vec!["finance", "q3"]);
        assert_eq!(note.source().as_deref(), Some("doc-42"));
        assert_eq!(note.body, "Spend is up.");
    }

    #[test]
    fn test_parse_without_frontmatter_uses_heading() {
        let note = Frontmatter::parse("Intro\n# Weekly sync\n\nAgenda items");
        assert!(note.frontmatter.is_none());
        let (title, body) = note.title_and_body("weekly-sync");
        assert_eq!(title, "Weekly sync");
        assert_eq!(body, "Intro\n\nAgenda items");
        assert!(note.tags().is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_stripped() {
        let note = Frontmatter::parse("---\ntags: [unclosed\n---\nBody text");
        assert!(note.frontmatter.is_none());
        assert_eq!(note.body, "Body text");
        assert_eq!(note.title_and_body("file-stem").0, "file-stem");
    }
}
