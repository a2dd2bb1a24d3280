mod ui;
mod widgets;

use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::api::SheetSource;
use crate::error::FetchError;
use crate::models::{
    Difficulty, Modal, NewQuestion, QuestionId, QuestionPatch, SubTopicId, SubTopicPatch, TopicId,
    TopicPatch, DEFAULT_PLATFORM, PLACEHOLDER_URL,
};
use crate::reconcile::RemoteSheet;
use crate::store::Store;
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Sheet,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Sheet,
            View::Sheet => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        self.next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

/// One line of the sheet tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Topic(TopicId),
    SubTopic(SubTopicId),
    Question(QuestionId),
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Difficulty(Difficulty),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: FieldValue,
}

impl FormField {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: FieldValue::Text(value.into()),
        }
    }
}

/// Editable fields behind the open modal. Confirmation modals have none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalForm {
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl ModalForm {
    fn for_modal(modal: &Modal, store: &Store) -> Self {
        let fields = match modal {
            Modal::AddTopic | Modal::AddSubTopic { .. } => vec![FormField::text("Name", "")],
            Modal::EditTopic { topic_id } => {
                let name = store.topics().get(topic_id).map(|t| t.name.clone());
                vec![FormField::text("Name", name.unwrap_or_default())]
            }
            Modal::EditSubTopic { sub_topic_id } => {
                let name = store.sub_topics().get(sub_topic_id).map(|s| s.name.clone());
                vec![FormField::text("Name", name.unwrap_or_default())]
            }
            Modal::AddQuestion { .. } => question_fields("", Difficulty::Medium, DEFAULT_PLATFORM, ""),
            Modal::EditQuestion { question_id } => match store.questions().get(question_id) {
                Some(q) => question_fields(&q.title, q.difficulty, &q.platform, &q.problem_url),
                None => question_fields("", Difficulty::Medium, DEFAULT_PLATFORM, ""),
            },
            Modal::ConfirmDeleteTopic { .. }
            | Modal::ConfirmDeleteSubTopic { .. }
            | Modal::ConfirmDeleteQuestion { .. } => vec![],
        };
        Self { fields, focus: 0 }
    }

    fn text(&self, index: usize) -> &str {
        match self.fields.get(index).map(|f| &f.value) {
            Some(FieldValue::Text(value)) => value.trim(),
            _ => "",
        }
    }

    fn difficulty(&self) -> Difficulty {
        self.fields
            .iter()
            .find_map(|f| match f.value {
                FieldValue::Difficulty(d) => Some(d),
                FieldValue::Text(_) => None,
            })
            .unwrap_or(Difficulty::Medium)
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn input(&mut self, key: KeyCode) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match (&mut field.value, key) {
            (FieldValue::Text(value), KeyCode::Char(c)) => value.push(c),
            (FieldValue::Text(value), KeyCode::Backspace) => {
                value.pop();
            }
            (
                FieldValue::Difficulty(d),
                KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right,
            ) => *d = d.next(),
            _ => {}
        }
    }
}

fn question_fields(title: &str, difficulty: Difficulty, platform: &str, url: &str) -> Vec<FormField> {
    vec![
        FormField::text("Title", title),
        FormField {
            label: "Difficulty",
            value: FieldValue::Difficulty(difficulty),
        },
        FormField::text("Platform", platform),
        FormField::text("URL", url),
    ]
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// The sheet tree under the current search query. Topics open by user
/// choice, or all at once while a query is active.
pub fn build_rows(store: &Store) -> Vec<Row> {
    let query = store.ui().search_query.as_str();
    let mut rows = Vec::new();
    for topic in store.visible_topics() {
        rows.push(Row::Topic(topic.id.clone()));
        if query.is_empty() && !store.is_expanded(&topic.id) {
            continue;
        }
        let query = if topic.name.to_lowercase().contains(&query.to_lowercase()) {
            ""
        } else {
            query
        };
        for sub_topic in store.sub_topics_for_topic(&topic.id) {
            let questions = store.questions_for_sub_topic(&sub_topic.id, query);
            if !query.is_empty() && questions.is_empty() {
                continue;
            }
            rows.push(Row::SubTopic(sub_topic.id.clone()));
            rows.extend(questions.iter().map(|q| Row::Question(q.id.clone())));
        }
        rows.extend(
            store
                .questions_for_topic(&topic.id, query)
                .iter()
                .map(|q| Row::Question(q.id.clone())),
        );
    }
    rows
}

/// The id next to `id` in `ids`, below it when `down`.
fn neighbor(ids: &[String], id: &str, down: bool) -> Option<String> {
    let index = ids.iter().position(|existing| existing == id)?;
    let target = if down { index.checked_add(1)? } else { index.checked_sub(1)? };
    ids.get(target).cloned()
}

enum Reorder {
    Topic { target: TopicId },
    SubTopic { topic_id: TopicId, target: SubTopicId },
    InSubTopic { sub_topic_id: SubTopicId, target: QuestionId },
    InTopic { topic_id: TopicId, target: QuestionId },
}

fn row_id(row: &Row) -> &str {
    match row {
        Row::Topic(id) | Row::SubTopic(id) | Row::Question(id) => id,
    }
}

pub struct App {
    tracker: Tracker,
    source: Arc<dyn SheetSource>,
    sheet_slug: String,
    fetch_rx: Option<Receiver<Result<RemoteSheet, FetchError>>>,
    pub view: View,
    pub mode: Mode,
    pub rows: StatefulList<Row>,
    pub form: Option<ModalForm>,
    pub should_quit: bool,
}

impl App {
    pub fn new(tracker: Tracker, source: Arc<dyn SheetSource>, sheet_slug: String) -> Self {
        let rows = StatefulList::with_items(build_rows(tracker.store()));
        Self {
            tracker,
            source,
            sheet_slug,
            fetch_rx: None,
            view: View::Sheet,
            mode: Mode::Normal,
            rows,
            form: None,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &Store {
        self.tracker.store()
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.selected_item()
    }

    fn rebuild_rows(&mut self) {
        let rows = build_rows(self.tracker.store());
        let previous = self.rows.selected_item().cloned();
        let selected = previous
            .and_then(|row| rows.iter().position(|r| *r == row))
            .or_else(|| self.rows.selected.map(|i| i.min(rows.len().saturating_sub(1))));
        self.rows = StatefulList::with_items(rows);
        if !self.rows.items.is_empty() {
            self.rows.selected = selected.or(Some(0));
        }
    }

    fn update<R>(&mut self, change: impl FnOnce(&mut Store) -> R) -> R {
        let result = self.tracker.update(change);
        self.rebuild_rows();
        result
    }

    fn selected_topic_id(&self) -> Option<TopicId> {
        let store = self.store();
        match self.selected_row()? {
            Row::Topic(id) => Some(id.clone()),
            Row::SubTopic(id) => store.sub_topics().get(id).map(|s| s.topic_id.clone()),
            Row::Question(id) => store.questions().get(id).map(|q| q.topic_id.clone()),
        }
    }

    fn selected_sub_topic_id(&self) -> Option<SubTopicId> {
        match self.selected_row()? {
            Row::Topic(_) => None,
            Row::SubTopic(id) => Some(id.clone()),
            Row::Question(id) => self.store().questions().get(id)?.sub_topic_id.clone(),
        }
    }

    // Remote refresh

    pub fn start_fetch(&mut self) {
        if !self.tracker.begin_fetch() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let slug = self.sheet_slug.clone();
        thread::spawn(move || {
            let _ = tx.send(source.fetch_sheet(&slug));
        });
        self.fetch_rx = Some(rx);
        debug!(slug = %self.sheet_slug, "started background fetch");
    }

    pub fn poll_fetch(&mut self) {
        let received = match &self.fetch_rx {
            Some(rx) => rx.try_recv(),
            None => return,
        };
        let result = match received {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Err(FetchError::Transport("fetch worker exited".to_string()))
            }
        };
        self.fetch_rx = None;
        self.tracker.finish_fetch(result);
        self.rebuild_rows();
    }

    // Modals

    fn open_modal(&mut self, modal: Modal) {
        self.form = Some(ModalForm::for_modal(&modal, self.store()));
        self.tracker.update(|store| store.open_modal(modal));
    }

    fn close_modal(&mut self) {
        self.form = None;
        self.tracker.update(Store::close_modal);
    }

    fn open_delete_modal(&mut self) {
        let modal = match self.selected_row() {
            Some(Row::Topic(id)) => Modal::ConfirmDeleteTopic {
                topic_id: id.clone(),
            },
            Some(Row::SubTopic(id)) => Modal::ConfirmDeleteSubTopic {
                sub_topic_id: id.clone(),
            },
            Some(Row::Question(id)) => Modal::ConfirmDeleteQuestion {
                question_id: id.clone(),
            },
            None => return,
        };
        self.open_modal(modal);
    }

    fn open_edit_modal(&mut self) {
        let modal = match self.selected_row() {
            Some(Row::Topic(id)) => Modal::EditTopic {
                topic_id: id.clone(),
            },
            Some(Row::SubTopic(id)) => Modal::EditSubTopic {
                sub_topic_id: id.clone(),
            },
            Some(Row::Question(id)) => Modal::EditQuestion {
                question_id: id.clone(),
            },
            None => return,
        };
        self.open_modal(modal);
    }

    fn submit_modal(&mut self) {
        let Some(modal) = self.store().ui().modal.clone() else {
            return;
        };
        let form = self.form.clone().unwrap_or_default();
        if !modal.is_confirmation() && form.text(0).is_empty() {
            return;
        }
        let first = form.text(0).to_string();

        match modal {
            Modal::AddTopic => {
                let id = self.update(|store| store.add_topic(&first));
                self.select(&Row::Topic(id));
            }
            Modal::EditTopic { topic_id } => {
                self.update(|store| store.update_topic(&topic_id, TopicPatch::rename(first)));
            }
            Modal::AddSubTopic { topic_id } => {
                self.update(|store| {
                    if !store.is_expanded(&topic_id) {
                        store.toggle_topic_expanded(&topic_id);
                    }
                    store.add_sub_topic(&topic_id, &first)
                });
            }
            Modal::EditSubTopic { sub_topic_id } => {
                self.update(|store| {
                    store.update_sub_topic(&sub_topic_id, SubTopicPatch::rename(first))
                });
            }
            Modal::AddQuestion {
                topic_id,
                sub_topic_id,
            } => {
                let mut data = NewQuestion::new(first)
                    .difficulty(form.difficulty())
                    .platform(or_default(form.text(2), DEFAULT_PLATFORM))
                    .problem_url(or_default(form.text(3), PLACEHOLDER_URL));
                if let Some(sub_topic_id) = sub_topic_id {
                    data = data.in_sub_topic(sub_topic_id);
                }
                self.update(|store| {
                    if !store.is_expanded(&topic_id) {
                        store.toggle_topic_expanded(&topic_id);
                    }
                    store.add_question(&topic_id, data)
                });
            }
            Modal::EditQuestion { question_id } => {
                let patch = QuestionPatch {
                    title: Some(first),
                    difficulty: Some(form.difficulty()),
                    platform: Some(or_default(form.text(2), DEFAULT_PLATFORM)),
                    problem_url: Some(or_default(form.text(3), PLACEHOLDER_URL)),
                    is_solved: None,
                };
                self.update(|store| store.update_question(&question_id, patch));
            }
            Modal::ConfirmDeleteTopic { topic_id } => {
                self.update(|store| store.delete_topic(&topic_id));
            }
            Modal::ConfirmDeleteSubTopic { sub_topic_id } => {
                self.update(|store| store.delete_sub_topic(&sub_topic_id));
            }
            Modal::ConfirmDeleteQuestion { question_id } => {
                self.update(|store| store.delete_question(&question_id));
            }
        }
        self.close_modal();
    }

    fn select(&mut self, row: &Row) {
        if let Some(index) = self.rows.items.iter().position(|r| r == row) {
            self.rows.selected = Some(index);
        }
    }

    // Sheet actions

    fn activate_selected(&mut self) {
        match self.selected_row().cloned() {
            Some(Row::Topic(id)) => {
                self.update(|store| store.toggle_topic_expanded(&id));
            }
            Some(Row::Question(id)) => {
                self.update(|store| store.toggle_question_solved(&id));
            }
            Some(Row::SubTopic(_)) | None => {}
        }
    }

    fn move_selected(&mut self, down: bool) {
        let Some(row) = self.selected_row().cloned() else {
            return;
        };
        let Some(reorder) = self.sibling_move(&row, down) else {
            return;
        };
        let moved = self.update(|store| match &reorder {
            Reorder::Topic { target } => store.reorder_topics(row_id(&row), target),
            Reorder::SubTopic { topic_id, target } => {
                store.reorder_sub_topics(topic_id, row_id(&row), target)
            }
            Reorder::InSubTopic { sub_topic_id, target } => {
                store.reorder_sub_topic_questions(sub_topic_id, row_id(&row), target)
            }
            Reorder::InTopic { topic_id, target } => {
                store.reorder_questions(topic_id, row_id(&row), target)
            }
        });
        if moved {
            self.select(&row);
        }
    }

    /// The container and sibling the selected row swaps places with.
    fn sibling_move(&self, row: &Row, down: bool) -> Option<Reorder> {
        let store = self.store();
        match row {
            Row::Topic(id) => Some(Reorder::Topic {
                target: neighbor(store.topics().ids(), id, down)?,
            }),
            Row::SubTopic(id) => {
                let topic_id = store.sub_topics().get(id)?.topic_id.clone();
                let siblings = &store.topics().get(&topic_id)?.sub_topic_ids;
                Some(Reorder::SubTopic {
                    target: neighbor(siblings, id, down)?,
                    topic_id,
                })
            }
            Row::Question(id) => {
                let question = store.questions().get(id)?;
                match &question.sub_topic_id {
                    Some(sub_topic_id) => {
                        let siblings = &store.sub_topics().get(sub_topic_id)?.question_ids;
                        Some(Reorder::InSubTopic {
                            target: neighbor(siblings, id, down)?,
                            sub_topic_id: sub_topic_id.clone(),
                        })
                    }
                    None => {
                        let siblings = &store.topics().get(&question.topic_id)?.question_ids;
                        Some(Reorder::InTopic {
                            target: neighbor(siblings, id, down)?,
                            topic_id: question.topic_id.clone(),
                        })
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if self.store().ui().modal.is_some() {
            self.handle_modal_key(key);
            return;
        }

        if self.mode == Mode::Search {
            match key {
                KeyCode::Esc => {
                    self.mode = Mode::Normal;
                    self.update(|store| store.set_search_query(""));
                }
                KeyCode::Enter => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    let mut query = self.store().ui().search_query.clone();
                    query.pop();
                    self.update(|store| store.set_search_query(query));
                }
                KeyCode::Char(c) => {
                    let query = format!("{}{}", self.store().ui().search_query, c);
                    self.update(|store| store.set_search_query(query));
                }
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }

            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),
            KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),

            KeyCode::Char('F') => self.start_fetch(),

            KeyCode::Esc => {
                if self.store().error().is_some() {
                    self.tracker.update(Store::clear_error);
                } else if !self.store().ui().search_query.is_empty() {
                    self.update(|store| store.set_search_query(""));
                }
            }

            _ if self.view != View::Sheet => {}

            KeyCode::Char('j') | KeyCode::Down => self.rows.next(),
            KeyCode::Char('k') | KeyCode::Up => self.rows.previous(),
            KeyCode::Char('g') if !self.rows.items.is_empty() => self.rows.selected = Some(0),
            KeyCode::Char('G') if !self.rows.items.is_empty() => {
                self.rows.selected = Some(self.rows.items.len() - 1)
            }

            KeyCode::Enter | KeyCode::Char(' ') => self.activate_selected(),
            KeyCode::Char('/') => self.mode = Mode::Search,

            KeyCode::Char('A') => self.open_modal(Modal::AddTopic),
            KeyCode::Char('s') => {
                if let Some(topic_id) = self.selected_topic_id() {
                    self.open_modal(Modal::AddSubTopic { topic_id });
                }
            }
            KeyCode::Char('a') => {
                if let Some(topic_id) = self.selected_topic_id() {
                    let sub_topic_id = self.selected_sub_topic_id();
                    self.open_modal(Modal::AddQuestion {
                        topic_id,
                        sub_topic_id,
                    });
                }
            }
            KeyCode::Char('e') => self.open_edit_modal(),
            KeyCode::Char('d') => self.open_delete_modal(),
            KeyCode::Char('J') => self.move_selected(true),
            KeyCode::Char('K') => self.move_selected(false),

            _ => {}
        }
    }

    fn handle_modal_key(&mut self, key: KeyCode) {
        let confirming = self
            .store()
            .ui()
            .modal
            .as_ref()
            .is_some_and(Modal::is_confirmation);

        match key {
            KeyCode::Esc => self.close_modal(),
            KeyCode::Enter => self.submit_modal(),
            KeyCode::Char('y') if confirming => self.submit_modal(),
            KeyCode::Char('n') if confirming => self.close_modal(),
            _ if confirming => {}
            KeyCode::Tab | KeyCode::Down => {
                if let Some(form) = &mut self.form {
                    form.focus_next();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(form) = &mut self.form {
                    form.focus_prev();
                }
            }
            other => {
                if let Some(form) = &mut self.form {
                    form.input(other);
                }
            }
        }
    }
}

pub fn run<S>(tracker: Tracker, source: S, sheet_slug: String) -> Result<(), Box<dyn std::error::Error>>
where
    S: SheetSource + 'static,
{
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(tracker, Arc::new(source), sheet_slug);

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.poll_fetch();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{EntityTable, ProgressScope};
    use crate::testing::{question, topic};

    struct StubSource;

    impl SheetSource for StubSource {
        fn fetch_sheet(&self, _slug: &str) -> Result<RemoteSheet, FetchError> {
            Ok(RemoteSheet {
                topics: EntityTable::from_records([topic("arrays", "Arrays", &["q1"])]),
                questions: EntityTable::from_records([question(
                    "q1",
                    "Set Matrix Zeroes",
                    "arrays",
                    Difficulty::Medium,
                )]),
                sheet_info: None,
            })
        }
    }

    fn setup_app() -> App {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        let tracker = Tracker::with_database(db, ProgressScope::Direct);
        App::new(tracker, Arc::new(StubSource), "striver-sde-sheet".to_string())
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn stateful_list_wraps() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.previous();
            assert_eq!(list.selected, Some(2));
            list.next();
            assert_eq!(list.selected, Some(0));
        }

        #[test]
        fn empty_list_has_no_selection() {
            let mut list: StatefulList<u8> = StatefulList::with_items(vec![]);
            list.next();
            assert!(list.selected_item().is_none());
        }

        #[test]
        fn neighbor_lookup() {
            let ids = vec!["a".to_string(), "b".to_string()];
            assert_eq!(neighbor(&ids, "a", true), Some("b".to_string()));
            assert_eq!(neighbor(&ids, "a", false), None);
            assert_eq!(neighbor(&ids, "b", true), None);
            assert_eq!(neighbor(&ids, "x", true), None);
        }
    }

    mod sheet_tests {
        use super::*;

        #[test]
        fn collapsed_sheet_shows_topics_only() {
            let app = setup_app();
            assert_eq!(app.rows.items.len(), 12);
            assert!(app.rows.items.iter().all(|r| matches!(r, Row::Topic(_))));
        }

        #[test]
        fn enter_expands_then_space_toggles_question() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Enter);
            assert!(app.store().is_expanded("arrays"));
            assert_eq!(app.selected_row(), Some(&Row::Topic("arrays".into())));

            press(&mut app, KeyCode::Char('j'));
            assert_eq!(app.selected_row(), Some(&Row::Question("q1".into())));
            press(&mut app, KeyCode::Char(' '));
            assert!(app.store().questions().get("q1").unwrap().is_solved);
        }

        #[test]
        fn search_filters_rows() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('/'));
            type_text(&mut app, "matrix");
            assert_eq!(app.store().ui().search_query, "matrix");
            assert_eq!(app.rows.items[0], Row::Topic("arrays".into()));
            assert!(app.rows.items.contains(&Row::Question("q1".into())));

            press(&mut app, KeyCode::Esc);
            assert_eq!(app.mode, Mode::Normal);
            assert_eq!(app.store().ui().search_query, "");
        }

        #[test]
        fn reorder_topic_down() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('J'));
            assert_eq!(app.store().topics().ids()[1], "arrays");
            assert_eq!(app.selected_row(), Some(&Row::Topic("arrays".into())));
        }

        #[test]
        fn keys_outside_sheet_view_do_not_navigate() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Dashboard);
            press(&mut app, KeyCode::Char('j'));
            assert_eq!(app.rows.selected, Some(0));
        }
    }

    mod modal_tests {
        use super::*;

        #[test]
        fn add_topic_through_modal() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('A'));
            assert_eq!(app.store().ui().modal, Some(Modal::AddTopic));
            type_text(&mut app, "Heaps");
            press(&mut app, KeyCode::Enter);

            assert!(app.store().ui().modal.is_none());
            assert!(app.form.is_none());
            assert_eq!(app.store().topics().len(), 13);
            match app.selected_row() {
                Some(Row::Topic(id)) => {
                    assert_eq!(app.store().topics().get(id).unwrap().name, "Heaps")
                }
                other => panic!("expected new topic selected, got {other:?}"),
            }
        }

        #[test]
        fn blank_name_keeps_modal_open() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('A'));
            press(&mut app, KeyCode::Enter);
            assert!(app.store().ui().modal.is_some());
            press(&mut app, KeyCode::Esc);
            assert!(app.store().ui().modal.is_none());
        }

        #[test]
        fn add_question_with_difficulty() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('a'));
            type_text(&mut app, "Rotate Image");
            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Right);
            press(&mut app, KeyCode::Enter);

            let arrays = app.store().topics().get("arrays").unwrap();
            let id = arrays.question_ids.last().unwrap();
            let q = app.store().questions().get(id).unwrap();
            assert_eq!(q.title, "Rotate Image");
            assert_eq!(q.difficulty, Difficulty::Hard);
            assert_eq!(q.platform, DEFAULT_PLATFORM);
            assert_eq!(q.problem_url, PLACEHOLDER_URL);
            assert!(app.store().is_expanded("arrays"));
        }

        #[test]
        fn edit_prefills_and_renames() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('e'));
            let form = app.form.as_ref().unwrap();
            assert_eq!(form.text(0), "Arrays");
            type_text(&mut app, " I");
            press(&mut app, KeyCode::Enter);
            assert_eq!(app.store().topics().get("arrays").unwrap().name, "Arrays I");
        }

        #[test]
        fn delete_requires_confirmation() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('d'));
            assert!(app.store().ui().modal.as_ref().unwrap().is_confirmation());
            press(&mut app, KeyCode::Char('n'));
            assert!(app.store().topics().contains("arrays"));

            press(&mut app, KeyCode::Char('d'));
            press(&mut app, KeyCode::Char('y'));
            assert!(!app.store().topics().contains("arrays"));
            assert_eq!(app.rows.items.len(), 11);
            assert!(app.store().integrity_violations().is_empty());
        }

        #[test]
        fn sub_topic_then_question_inside_it() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('s'));
            type_text(&mut app, "Matrices");
            press(&mut app, KeyCode::Enter);

            let sub_id = app.store().topics().get("arrays").unwrap().sub_topic_ids[0].clone();
            let row = Row::SubTopic(sub_id.clone());
            app.select(&row);
            press(&mut app, KeyCode::Char('a'));
            type_text(&mut app, "Spiral");
            press(&mut app, KeyCode::Enter);

            let sub = app.store().sub_topics().get(&sub_id).unwrap();
            assert_eq!(sub.question_ids.len(), 1);
            assert!(app.store().integrity_violations().is_empty());
        }
    }

    mod fetch_tests {
        use super::*;

        #[test]
        fn background_fetch_applies_result() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('F'));
            assert!(app.store().is_loading());

            for _ in 0..500 {
                app.poll_fetch();
                if !app.store().is_loading() {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }

            assert!(!app.store().is_loading());
            assert_eq!(app.store().topics().len(), 1);
            assert_eq!(app.rows.items, vec![Row::Topic("arrays".into())]);
        }

        #[test]
        fn esc_clears_error() {
            let mut app = setup_app();
            app.tracker.begin_fetch();
            app.tracker
                .finish_fetch(Err(FetchError::Rejected("Sheet not found".into())));
            assert_eq!(app.store().error(), Some("Sheet not found"));
            press(&mut app, KeyCode::Esc);
            assert!(app.store().error().is_none());
        }
    }
}
