mod clipboard;
mod help;
mod state;

use crate::api::KnowledgeClient;
use crate::cli::{build_config, Cli};
use crate::model::{CatalogEvent, KnowledgeEntity};
use crate::orchestrator::{self, UiCommand, ViewStateManager};
use crate::store::View;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, Focus, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = KnowledgeClient::new(&cfg).context("failed to build backend client")?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<CatalogEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_client = client.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_client, event_rx, cmd_tx));

    let manager = ViewStateManager::new(client);
    let res = orchestrator::run_controller(manager, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    client: KnowledgeClient,
    mut event_rx: UnboundedReceiver<CatalogEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; the view state arrives as snapshots.
    let mut state = UiState::default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &client)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if !handle_key(&mut state, k, &cmd_tx, &client) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Returns false when the user asked to quit.
fn handle_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
    client: &KnowledgeClient,
) -> bool {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return false;
    }

    if state.is_typing() {
        handle_input_key(state, k, cmd_tx);
        return true;
    }

    match k.code {
        KeyCode::Char('q') => return false,
        KeyCode::Tab => state.tab = (state.tab + 1) % 2,
        KeyCode::Char('?') => state.tab = 1,
        _ if state.tab != 0 => {}
        KeyCode::Up | KeyCode::Char('k') => state.move_cursor(false),
        KeyCode::Down | KeyCode::Char('j') => state.move_cursor(true),
        _ => match state.view.view() {
            View::Listing => handle_list_key(state, k, cmd_tx),
            View::Viewing => handle_detail_key(state, k, cmd_tx, client),
        },
    }
    true
}

fn handle_input_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match k.code {
        KeyCode::Esc => state.focus = Focus::List,
        KeyCode::Backspace => {
            if let Some(buffer) = state.active_input_mut() {
                buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(buffer) = state.active_input_mut() {
                buffer.push(c);
            }
        }
        KeyCode::Enter => match state.focus {
            Focus::Search => {
                let _ = cmd_tx.send(UiCommand::Search(state.search_input.clone()));
                state.focus = Focus::List;
            }
            Focus::AddUrl => {
                // Submission is disabled while any request is in flight.
                if state.view.is_loading {
                    state.info = "Busy, wait for the current request to finish.".into();
                } else {
                    let _ = cmd_tx.send(UiCommand::Create(state.url_input.clone()));
                    state.focus = Focus::List;
                }
            }
            Focus::List => {}
        },
        _ => {}
    }
}

fn handle_list_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match k.code {
        KeyCode::Enter => {
            if let Some(id) = state.highlighted_item_id() {
                let _ = cmd_tx.send(UiCommand::Select(id.to_string()));
            }
        }
        KeyCode::Char('/') => state.focus = Focus::Search,
        KeyCode::Char('a') => state.focus = Focus::AddUrl,
        KeyCode::Char('r') => {
            let _ = cmd_tx.send(UiCommand::Search(state.view.search_term.clone()));
        }
        _ => {}
    }
}

fn handle_detail_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
    client: &KnowledgeClient,
) {
    match k.code {
        KeyCode::Enter => {
            if let Some(id) = state.highlighted_recommendation_id() {
                let _ = cmd_tx.send(UiCommand::Select(id.to_string()));
            }
        }
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
            let _ = cmd_tx.send(UiCommand::Back);
        }
        KeyCode::Char('y') => {
            if let Some(item) = state.view.selected.as_ref() {
                let link = client.download_url(&item.id);
                state.info = match clipboard::copy_to_clipboard(&link) {
                    Ok(_) => format!("✓ Copied to clipboard: {link}"),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
        }
        _ => {}
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, client: &KnowledgeClient) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Browse"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("knowledge-browser"),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_browse(chunks[1], f, state, client),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_browse(area: Rect, f: &mut ratatui::Frame, state: &UiState, client: &KnowledgeClient) {
    let banner_height = if state.view.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    if let Some(err) = state.view.error.as_deref() {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(err.to_string(), Style::default().fg(Color::Red)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(banner, chunks[0]);
    }

    match (state.view.view(), state.view.selected.as_ref()) {
        (View::Viewing, Some(item)) => draw_detail(chunks[1], f, state, item, client),
        _ => draw_listing(chunks[1], f, state),
    }

    let mut status = Vec::new();
    if state.view.is_loading {
        status.push(Span::styled("Loading… ", Style::default().fg(Color::Cyan)));
    }
    status.push(Span::raw(state.info.clone()));
    let p = Paragraph::new(Line::from(status))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, chunks[2]);
}

fn input_line(text: &str, focused: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(text.to_string())];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

fn input_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn entity_row(e: &KnowledgeEntity, highlighted: bool) -> Line<'static> {
    let marker = if highlighted { "> " } else { "  " };
    let title_style = if highlighted {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(e.title.clone(), title_style),
        Span::styled(
            format!("  {} - {}", e.authors_line(), e.creation_date_label()),
            Style::default().fg(Color::Gray),
        ),
    ])
}

/// Rows that fit in `area` around `selected`, as `(offset, count)`.
fn visible_window(area: Rect, selected: usize, len: usize) -> (usize, usize) {
    let rows = (area.height as usize).saturating_sub(2).max(1);
    let offset = if selected >= rows {
        selected + 1 - rows
    } else {
        0
    };
    (offset, rows.min(len.saturating_sub(offset)))
}

fn draw_listing(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let url_title = if state.view.is_loading {
        "Add document by URL (a) - busy".to_string()
    } else {
        "Add document by URL (a)".to_string()
    };
    let url_focused = state.focus == Focus::AddUrl;
    let url = Paragraph::new(input_line(&state.url_input, url_focused))
        .block(input_block(url_title, url_focused));
    f.render_widget(url, chunks[0]);

    let search_focused = state.focus == Focus::Search;
    let search = Paragraph::new(input_line(&state.search_input, search_focused)).block(
        input_block(
            "Search by title, summary or author (/)".to_string(),
            search_focused,
        ),
    );
    f.render_widget(search, chunks[1]);

    let mut lines: Vec<Line> = Vec::new();
    if state.view.is_loading {
        lines.push(Line::from(Span::styled(
            "Loading…",
            Style::default().fg(Color::Cyan),
        )));
    } else {
        let (offset, count) =
            visible_window(chunks[2], state.list_selected, state.view.items.len());
        for (i, item) in state.view.items.iter().enumerate().skip(offset).take(count) {
            lines.push(entity_row(item, i == state.list_selected));
        }
    }
    if state.view.shows_empty_placeholder() {
        lines.push(Line::from(Span::styled(
            "No documents found. Try another query or add a new document.",
            Style::default().fg(Color::Gray),
        )));
    }

    let title = if state.view.search_term.is_empty() {
        format!("Documents ({})", state.view.items.len())
    } else {
        format!(
            "Documents matching \"{}\" ({})",
            state.view.search_term,
            state.view.items.len()
        )
    };
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, chunks[2]);
}

fn draw_detail(
    area: Rect,
    f: &mut ratatui::Frame,
    state: &UiState,
    item: &KnowledgeEntity,
    client: &KnowledgeClient,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut lines: Vec<Line<'static>> = vec![
        Line::from(Span::styled(
            item.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(item.authors_line()),
        Line::from(Span::styled(
            format!("{} • {}", item.creation_date_label(), item.kind),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(issuer) = item.issuer_id.as_deref() {
        push_wrapped_status_kv(&mut lines, "Issuer", issuer, chunks[0].width);
    }
    push_wrapped_status_kv(
        &mut lines,
        "Download",
        &client.download_url(&item.id),
        chunks[0].width,
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Summary",
        Style::default().add_modifier(Modifier::UNDERLINED),
    )));
    for l in item.summary.lines() {
        lines.push(Line::from(l.to_string()));
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Document (esc: back, y: copy download link)"),
        );
    f.render_widget(detail, chunks[0]);

    let mut recs: Vec<Line> = Vec::new();
    if state.view.is_loading_recommendations {
        recs.push(Line::from(Span::styled(
            "Loading recommendations…",
            Style::default().fg(Color::Cyan),
        )));
    } else if state.view.recommendations.is_empty() {
        recs.push(Line::from(Span::styled(
            "No recommendations found.",
            Style::default().fg(Color::Gray),
        )));
    } else {
        let (offset, count) = visible_window(
            chunks[1],
            state.rec_selected,
            state.view.recommendations.len(),
        );
        for (i, rec) in state
            .view
            .recommendations
            .iter()
            .enumerate()
            .skip(offset)
            .take(count)
        {
            recs.push(entity_row(rec, i == state.rec_selected));
        }
    }
    let p = Paragraph::new(recs).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Recommendations"),
    );
    f.render_widget(p, chunks[1]);
}
