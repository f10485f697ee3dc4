//! Text summary builder for CLI output.
//!
//! Formats a settled view state into human-readable lines for text mode.

use crate::model::KnowledgeEntity;
use crate::store::{View, ViewState};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn entity_line(e: &KnowledgeEntity) -> String {
    format!(
        "[{}] {} - {} ({})",
        e.id,
        e.title,
        e.authors_line(),
        e.creation_date_label()
    )
}

/// Build a text summary of whichever view the state is in.
/// `download_url` resolves the file link for the selected entity.
pub(crate) fn build_text_summary(
    state: &ViewState,
    download_url: impl Fn(&str) -> String,
) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(err) = state.error.as_deref() {
        lines.push(format!("Error: {err}"));
    }

    match (state.view(), state.selected.as_ref()) {
        (View::Viewing, Some(item)) => {
            lines.push(item.title.clone());
            lines.push(item.authors_line());
            lines.push(format!("{} • {}", item.creation_date_label(), item.kind));
            if let Some(issuer) = item.issuer_id.as_deref() {
                lines.push(format!("Issuer: {issuer}"));
            }
            lines.push(format!("Download: {}", download_url(&item.id)));
            lines.push(String::new());
            lines.push("Summary:".into());
            for l in item.summary.lines() {
                lines.push(format!("  {l}"));
            }
            lines.push(String::new());
            lines.push("Recommendations:".into());
            if state.recommendations.is_empty() {
                lines.push("  No recommendations found.".into());
            }
            for rec in &state.recommendations {
                lines.push(format!("  {}", entity_line(rec)));
            }
        }
        _ => {
            if !state.search_term.is_empty() {
                lines.push(format!("Search: {}", state.search_term));
            }
            if state.shows_empty_placeholder() {
                lines.push(
                    "No documents found. Try another query or add a new document.".into(),
                );
            }
            for item in &state.items {
                lines.push(entity_line(item));
            }
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> KnowledgeEntity {
        KnowledgeEntity {
            id: id.into(),
            authors: vec!["Ivanova A.".into()],
            creation_date: Some(2019),
            issuer_id: Some("kpfu".into()),
            summary: "line one\nline two".into(),
            title: format!("Doc {id}"),
            kind: "thesis".into(),
        }
    }

    #[test]
    fn list_view_shows_items_in_backend_order() {
        let state = ViewState {
            items: vec![entity("2"), entity("1")],
            ..Default::default()
        };
        let s = build_text_summary(&state, |id| format!("/dl/{id}"));
        assert_eq!(s.lines[0], "[2] Doc 2 - Ivanova A. (2019)");
        assert_eq!(s.lines[1], "[1] Doc 1 - Ivanova A. (2019)");
    }

    #[test]
    fn empty_list_shows_placeholder_under_banner() {
        let state = ViewState {
            error: Some("Failed to fetch data from the server.".into()),
            ..Default::default()
        };
        let s = build_text_summary(&state, |id| id.to_string());
        assert_eq!(s.lines[0], "Error: Failed to fetch data from the server.");
        assert!(s.lines[1].starts_with("No documents found"));
    }

    #[test]
    fn detail_view_lists_download_link_and_recommendations() {
        let state = ViewState {
            selected: Some(entity("7")),
            recommendations: vec![entity("8")],
            ..Default::default()
        };
        let s = build_text_summary(&state, |id| format!("http://h/api/v1/knowledge/{id}/download"));
        assert!(s
            .lines
            .contains(&"Download: http://h/api/v1/knowledge/7/download".to_string()));
        assert!(s.lines.contains(&"  line two".to_string()));
        assert_eq!(s.lines.last().unwrap(), "  [8] Doc 8 - Ivanova A. (2019)");
    }
}
