use serde::{Deserialize, Serialize};

/// A catalog entry (book volume) as shown to members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSummary {
    /// Opaque catalog id
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub description: Option<String>,
    pub page_count: Option<u32>,
    /// Public catalog page for the volume
    pub info_link: String,
    pub image_link: Option<String>,
}

impl WorkSummary {
    /// Markdown one-liner: "[Title (Subtitle) by Authors](link)"
    pub fn format_line(&self) -> String {
        let subtitle = self
            .subtitle
            .as_deref()
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();
        let authors = format_authors(&self.authors, "by ");
        let authors = if authors.is_empty() {
            String::new()
        } else {
            format!(" {}", authors)
        };
        format!("[{}{}{}]({})", self.title, subtitle, authors, self.info_link)
    }
}

/// Join author names, with a prefix when any are present
pub fn format_authors(authors: &[String], prefix: &str) -> String {
    if authors.is_empty() {
        return String::new();
    }
    format!("{}{}", prefix, authors.join(", "))
}

/// Numbered markdown list of volumes, 1-based
pub fn format_work_list(works: &[WorkSummary]) -> String {
    works
        .iter()
        .enumerate()
        .map(|(idx, work)| format!("{}. {}", idx + 1, work.format_line()))
        .collect::<Vec<_>>()
        .join("\n")
}
