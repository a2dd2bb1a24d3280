use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Difficulty, Tally};
use crate::truncate;
use crate::tui::App;

const BAR_WIDTH: usize = 20;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Overall + difficulty row
            Constraint::Min(0),    // Per-topic progress
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    draw_overall(f, app, top_chunks[0]);
    draw_difficulty(f, app, top_chunks[1]);
    draw_topics(f, app, chunks[1]);
}

fn draw_overall(f: &mut Frame, app: &App, area: Rect) {
    let store = app.store();
    let stats = store.stats();

    let mut text = vec![
        Line::from(vec![
            Span::styled("Solved: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", stats.solved, stats.total),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Progress: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}%", stats.progress),
                Style::default().fg(progress_color(stats.progress)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Topics: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", store.topics().len()),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    if let Some(info) = store.sheet_info() {
        if let Some(followers) = info.followers {
            text.push(Line::from(vec![
                Span::styled("Followers: ", Style::default().fg(Color::Gray)),
                Span::styled(format!("{}", followers), Style::default().fg(Color::White)),
            ]));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Overall ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_difficulty(f: &mut Frame, app: &App, area: Rect) {
    let stats = app.store().stats();

    let text: Vec<Line> = Difficulty::ALL
        .iter()
        .map(|&difficulty| {
            let tally = stats.for_difficulty(difficulty);
            Line::from(vec![
                Span::styled(
                    format!("{:<8}", difficulty.as_str()),
                    Style::default().fg(difficulty_color(difficulty)),
                ),
                Span::styled(
                    progress_bar(tally.percent(), BAR_WIDTH),
                    Style::default().fg(difficulty_color(difficulty)),
                ),
                Span::styled(format!(" {}", tally_label(tally)), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" By Difficulty ")
        .title_style(Style::default().fg(Color::Yellow));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_topics(f: &mut Frame, app: &App, area: Rect) {
    let store = app.store();

    let items: Vec<ListItem> = store
        .topics()
        .iter()
        .map(|topic| {
            let progress = store.topic_progress(&topic.id);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<28}", truncate(&topic.name, 26)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    progress_bar(progress.percent, BAR_WIDTH),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!(" {:>3}% ", progress.percent),
                    Style::default().fg(progress_color(progress.percent)),
                ),
                Span::styled(
                    format!("{}/{}", progress.solved, progress.total),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Topics ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn tally_label(tally: Tally) -> String {
    format!("{}/{} ({}%)", tally.solved, tally.total, tally.percent())
}

pub fn difficulty_color(difficulty: Difficulty) -> Color {
    match difficulty {
        Difficulty::Easy => Color::Green,
        Difficulty::Medium => Color::Yellow,
        Difficulty::Hard => Color::Red,
    }
}

fn progress_color(percent: u32) -> Color {
    match percent {
        100 => Color::Green,
        50..=99 => Color::Yellow,
        _ => Color::White,
    }
}

fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
