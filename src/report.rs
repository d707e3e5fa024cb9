//! Submission overview document.
//!
//! Rendered when submissions close and sent to the group chat so members
//! can vote by submission number. Markdown; the document layout is
//! deliberately simple, the numbers are what matters.

use crate::domain::{format_authors, WorkSummary};

/// Render the overview for a meeting's submissions, given in
/// submission-number order.
pub fn render(meeting_id: i64, submissions: &[(i64, WorkSummary)]) -> String {
    let mut doc = format!(
        "# Meeting {} — Submission Overview\n\nVote with `/vote <first> <second> <third>` using the numbers below.\n",
        meeting_id
    );

    for (submission_id, work) in submissions {
        doc.push_str(&format!("\n## {}. {}", submission_id, work.title));
        if let Some(subtitle) = &work.subtitle {
            doc.push_str(&format!(": {}", subtitle));
        }
        doc.push('\n');

        let authors = format_authors(&work.authors, "by ");
        if !authors.is_empty() {
            doc.push_str(&format!("\n*{}*\n", authors));
        }
        if !work.categories.is_empty() {
            doc.push_str(&format!("\nCategories: {}\n", work.categories.join(", ")));
        }
        if let Some(pages) = work.page_count {
            doc.push_str(&format!("\n{} pages\n", pages));
        }
        if let Some(description) = &work.description {
            doc.push_str(&format!("\n{}\n", description));
        }
        doc.push_str(&format!("\n[View in catalog]({})\n", work.info_link));
    }

    doc
}

/// File name the overview is sent under
pub fn file_name(meeting_id: i64) -> String {
    format!("meeting-{}-submissions.md", meeting_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(title: &str, description: Option<&str>) -> WorkSummary {
        WorkSummary {
            id: "x".to_string(),
            title: title.to_string(),
            subtitle: None,
            authors: vec!["Some Author".to_string()],
            categories: vec!["Fiction".to_string()],
            description: description.map(|d| d.to_string()),
            page_count: Some(250),
            info_link: "https://books.google.com/books?id=x".to_string(),
            image_link: None,
        }
    }

    #[test]
    fn every_submission_appears_under_its_number() {
        let doc = render(
            3,
            &[
                (1, work("First Book", None)),
                (2, work("Second Book", Some("A tale."))),
            ],
        );
        assert!(doc.contains("# Meeting 3"));
        assert!(doc.contains("## 1. First Book"));
        assert!(doc.contains("## 2. Second Book"));
        assert!(doc.contains("A tale."));
        assert!(doc.contains("by Some Author"));
    }

    #[test]
    fn file_name_carries_the_meeting_id() {
        assert_eq!(file_name(7), "meeting-7-submissions.md");
    }
}
