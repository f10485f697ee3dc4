use crate::model::CatalogEvent;
use crate::store::{View, ViewState};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

/// Where keystrokes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Search,
    AddUrl,
}

/// UI-local state. The view state itself is a read-only snapshot published by the
/// controller; this struct only adds cursors, input buffers and the status line.
pub struct UiState {
    pub tab: usize,
    pub view: ViewState,
    pub focus: Focus,
    pub search_input: String,
    pub url_input: String,
    pub list_selected: usize,
    pub rec_selected: usize,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            view: ViewState::default(),
            focus: Focus::List,
            search_input: String::new(),
            url_input: String::new(),
            list_selected: 0,
            rec_selected: 0,
            info: String::new(),
        }
    }
}

impl UiState {
    pub fn is_typing(&self) -> bool {
        self.focus != Focus::List
    }

    pub fn active_input_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Search => Some(&mut self.search_input),
            Focus::AddUrl => Some(&mut self.url_input),
            Focus::List => None,
        }
    }

    pub fn highlighted_item_id(&self) -> Option<&str> {
        self.view
            .items
            .get(self.list_selected)
            .map(|e| e.id.as_str())
    }

    pub fn highlighted_recommendation_id(&self) -> Option<&str> {
        self.view
            .recommendations
            .get(self.rec_selected)
            .map(|e| e.id.as_str())
    }

    /// Move the cursor of whichever list the current view shows.
    pub fn move_cursor(&mut self, down: bool) {
        let (cursor, len) = match self.view.view() {
            View::Listing => (&mut self.list_selected, self.view.items.len()),
            View::Viewing => (&mut self.rec_selected, self.view.recommendations.len()),
        };
        if down {
            if *cursor + 1 < len {
                *cursor += 1;
            }
        } else {
            *cursor = cursor.saturating_sub(1);
        }
    }

    pub fn apply_event(&mut self, ev: CatalogEvent) {
        match ev {
            CatalogEvent::Snapshot(view) => {
                let prev_id = self.view.selected.as_ref().map(|e| e.id.clone());
                let next_id = view.selected.as_ref().map(|e| e.id.clone());
                if prev_id != next_id {
                    self.rec_selected = 0;
                }
                self.view = *view;
                self.list_selected = clamp(self.list_selected, self.view.items.len());
                self.rec_selected = clamp(self.rec_selected, self.view.recommendations.len());
            }
            CatalogEvent::Created { url } => {
                self.url_input.clear();
                self.search_input.clear();
                self.focus = Focus::List;
                self.info = format!("New document added: {url}");
            }
            CatalogEvent::Info(msg) => self.info = msg,
        }
    }
}

fn clamp(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}
