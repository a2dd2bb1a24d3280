use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use super::dashboard::difficulty_color;
use crate::models::TopicProgress;
use crate::store::Store;
use crate::tui::{App, Row};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let store = app.store();
    let query = &store.ui().search_query;
    let title = if query.is_empty() {
        " Sheet ".to_string()
    } else {
        format!(" Sheet (search: {}) ", query)
    };

    let items: Vec<ListItem> = app
        .rows
        .items
        .iter()
        .filter_map(|row| row_line(store, row))
        .map(ListItem::new)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.rows.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn row_line<'a>(store: &'a Store, row: &Row) -> Option<Line<'a>> {
    let line = match row {
        Row::Topic(id) => {
            let topic = store.topics().get(id)?;
            let marker = if store.is_expanded(id) { "▾ " } else { "▸ " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(
                    topic.name.as_str(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ];
            spans.push(progress_span(store.topic_progress(id)));
            Line::from(spans)
        }
        Row::SubTopic(id) => {
            let sub_topic = store.sub_topics().get(id)?;
            Line::from(vec![
                Span::raw("    "),
                Span::styled("◆ ", Style::default().fg(Color::Magenta)),
                Span::styled(sub_topic.name.as_str(), Style::default().fg(Color::Magenta)),
                progress_span(store.sub_topic_progress(id)),
            ])
        }
        Row::Question(id) => {
            let question = store.questions().get(id)?;
            let indent = if question.sub_topic_id.is_some() { "        " } else { "    " };
            let (check, check_color) = if question.is_solved {
                ("[x] ", Color::Green)
            } else {
                ("[ ] ", Color::DarkGray)
            };
            let title_style = if question.is_solved {
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::raw(indent),
                Span::styled(check, Style::default().fg(check_color)),
                Span::styled(question.title.as_str(), title_style),
                Span::raw("  "),
                Span::styled(
                    question.difficulty.as_str(),
                    Style::default().fg(difficulty_color(question.difficulty)),
                ),
                Span::styled(
                    format!("  {}", question.platform),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
    };
    Some(line)
}

fn progress_span(progress: TopicProgress) -> Span<'static> {
    Span::styled(
        format!("  {}/{} ({}%)", progress.solved, progress.total, progress.percent),
        Style::default().fg(Color::DarkGray),
    )
}
