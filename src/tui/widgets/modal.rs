use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::dashboard::difficulty_color;
use crate::models::Modal;
use crate::store::Store;
use crate::tui::{App, FieldValue, ModalForm};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(modal) = &app.store().ui().modal else {
        return;
    };

    let lines = if modal.is_confirmation() {
        confirmation_lines(app.store(), modal)
    } else {
        match &app.form {
            Some(form) => form_lines(form),
            None => vec![],
        }
    };

    let height = lines.len() as u16 + 4;
    let popup = centered_rect(60, height, area);

    let border = if modal.is_confirmation() { Color::Red } else { Color::Cyan };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", modal.title()))
        .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD))
        .border_style(Style::default().fg(border));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn confirmation_lines<'a>(store: &'a Store, modal: &Modal) -> Vec<Line<'a>> {
    let (subject, detail) = match modal {
        Modal::ConfirmDeleteTopic { topic_id } => (
            store.topics().get(topic_id).map(|t| t.name.as_str()),
            "Its sub-topics and questions are deleted with it.",
        ),
        Modal::ConfirmDeleteSubTopic { sub_topic_id } => (
            store.sub_topics().get(sub_topic_id).map(|s| s.name.as_str()),
            "Its questions move back to the topic.",
        ),
        Modal::ConfirmDeleteQuestion { question_id } => (
            store.questions().get(question_id).map(|q| q.title.as_str()),
            "This cannot be undone.",
        ),
        _ => (None, ""),
    };

    vec![
        Line::from(vec![
            Span::raw("Delete "),
            Span::styled(
                subject.unwrap_or("(missing)"),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("?"),
        ]),
        Line::from(""),
        Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
    ]
}

fn form_lines(form: &ModalForm) -> Vec<Line<'_>> {
    form.fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == form.focus;
            let label_style = if focused {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let mut spans = vec![Span::styled(format!("{:<11}", field.label), label_style)];
            match &field.value {
                FieldValue::Text(value) => {
                    spans.push(Span::styled(value.as_str(), Style::default().fg(Color::White)));
                    if focused {
                        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
                    }
                }
                FieldValue::Difficulty(difficulty) => {
                    spans.push(Span::styled(
                        format!("‹ {} ›", difficulty),
                        Style::default().fg(difficulty_color(*difficulty)),
                    ));
                }
            }
            Line::from(spans)
        })
        .collect()
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
