use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, modal, sheet};
use super::{App, Mode, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
    draw_help_bar(f, app, chunks[3]);

    if app.store().ui().modal.is_some() {
        let area = f.area();
        modal::draw(f, app, area);
    }
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Sheet"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Sheet => 1,
    };

    let title = match app.store().sheet_info() {
        Some(info) => format!(" qtrack · {} ", info.name),
        None => " qtrack ".to_string(),
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Sheet => sheet::draw(f, app, area),
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let store = app.store();
    let line = if store.is_loading() {
        Line::from(Span::styled(
            " Fetching sheet...",
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(error) = store.error() {
        Line::from(vec![
            Span::styled(" ✗ ", Style::default().fg(Color::Red)),
            Span::styled(error, Style::default().fg(Color::Red)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        let source = match store.data_source() {
            crate::models::DataSource::Sample => "bundled sample",
            crate::models::DataSource::Api => "sheet API",
        };
        Line::from(Span::styled(
            format!(" Data: {}", source),
            Style::default().fg(Color::DarkGray),
        ))
    };

    f.render_widget(Paragraph::new(line), area);
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));

    let help_text = if app.mode == Mode::Search {
        vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(app.store().ui().search_query.as_str()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            key("<CR>"),
            Span::raw(" Keep  "),
            key("<Esc>"),
            Span::raw(" Clear"),
        ]
    } else if let Some(active) = &app.store().ui().modal {
        if active.is_confirmation() {
            vec![key("y"), Span::raw(" Delete  "), key("n/<Esc>"), Span::raw(" Cancel")]
        } else {
            vec![
                key("Tab"),
                Span::raw(" Next field  "),
                key("←/→"),
                Span::raw(" Difficulty  "),
                key("<CR>"),
                Span::raw(" Save  "),
                key("<Esc>"),
                Span::raw(" Cancel"),
            ]
        }
    } else {
        let mut spans = vec![key("h/l"), Span::raw(" Views  ")];

        if app.view == View::Sheet {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("<CR>"),
                Span::raw(" Open/Solve  "),
                key("/"),
                Span::raw(" Search  "),
                key("A/s/a"),
                Span::raw(" Add  "),
                key("e"),
                Span::raw(" Edit  "),
                key("d"),
                Span::raw(" Delete  "),
                key("J/K"),
                Span::raw(" Move  "),
            ]);
        }

        spans.extend(vec![key("F"), Span::raw(" Fetch  "), key("q"), Span::raw(" Quit")]);
        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
