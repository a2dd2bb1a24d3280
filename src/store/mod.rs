mod views;

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::PersistedState;
use crate::error::FetchError;
use crate::models::{
    reorder_ids, DataSource, Dataset, EntityTable, Modal, NewQuestion, ProgressScope, Question,
    QuestionId, QuestionPatch, SheetInfo, SubTopic, SubTopicId, SubTopicPatch, Topic, TopicId,
    TopicPatch, UiState, CUSTOM_QUESTION_PREFIX, CUSTOM_SUB_TOPIC_PREFIX, CUSTOM_TOPIC_PREFIX,
};
use crate::reconcile::{self, Reconciled, RemoteSheet};
use crate::seed;

/// The whole client-side state: normalized tables, UI state and the
/// status of the last remote refresh.
///
/// Every mutation is total. Unknown ids are a silent no-op and the method
/// reports `false` (or `None` for creations). Each successful change to a
/// persisted field bumps [`Store::revision`], which is what the persistence
/// layer watches. Session-only state (search, modal, fetch status) never
/// moves it.
#[derive(Debug, Clone)]
pub struct Store {
    topics: EntityTable<Topic>,
    sub_topics: EntityTable<SubTopic>,
    questions: EntityTable<Question>,
    ui: UiState,
    is_loading: bool,
    error: Option<String>,
    sheet_info: Option<SheetInfo>,
    data_source: DataSource,
    progress_scope: ProgressScope,
    revision: u64,
}

impl Store {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            topics: dataset.topics,
            sub_topics: dataset.sub_topics,
            questions: dataset.questions,
            ui: UiState::default(),
            is_loading: false,
            error: None,
            sheet_info: None,
            data_source: DataSource::Sample,
            progress_scope: ProgressScope::default(),
            revision: 0,
        }
    }

    /// A store holding the bundled sheet.
    pub fn seeded() -> Self {
        Self::new(seed::bundled())
    }

    pub fn with_progress_scope(mut self, scope: ProgressScope) -> Self {
        self.progress_scope = scope;
        self
    }

    pub fn topics(&self) -> &EntityTable<Topic> {
        &self.topics
    }

    pub fn sub_topics(&self) -> &EntityTable<SubTopic> {
        &self.sub_topics
    }

    pub fn questions(&self) -> &EntityTable<Question> {
        &self.questions
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sheet_info(&self) -> Option<&SheetInfo> {
        self.sheet_info.as_ref()
    }

    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    #[cfg(test)]
    pub fn progress_scope(&self) -> ProgressScope {
        self.progress_scope
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.touch();
        }
        changed
    }

    // Topic operations

    pub fn add_topic(&mut self, name: &str) -> TopicId {
        let id = generate_id(CUSTOM_TOPIC_PREFIX, |candidate| {
            self.topics.contains(candidate)
        });
        let order = self.topics.len() as u32;
        self.topics.insert(Topic {
            id: id.clone(),
            name: name.to_string(),
            order,
            sub_topic_ids: vec![],
            question_ids: vec![],
        });
        self.touch();
        debug!(topic_id = %id, "added topic");
        id
    }

    pub fn update_topic(&mut self, id: &str, patch: TopicPatch) -> bool {
        let changed = self
            .topics
            .get_mut(id)
            .is_some_and(|topic| patch.apply(topic));
        self.changed(changed)
    }

    /// Removes the topic, its sub-topics, and every question it owns
    /// directly or through a sub-topic.
    pub fn delete_topic(&mut self, id: &str) -> bool {
        let Some(topic) = self.topics.remove(id) else {
            return false;
        };

        let mut doomed: HashSet<QuestionId> = topic.question_ids.into_iter().collect();
        for sub_topic_id in &topic.sub_topic_ids {
            if let Some(sub_topic) = self.sub_topics.remove(sub_topic_id) {
                doomed.extend(sub_topic.question_ids);
            }
        }
        self.sub_topics.retain(|sub_topic| sub_topic.topic_id != id);
        self.questions
            .retain(|question| question.topic_id != id && !doomed.contains(&question.id));
        self.ui.expanded_topics.retain(|expanded| expanded != id);

        self.touch();
        debug!(topic_id = %id, "deleted topic");
        true
    }

    pub fn reorder_topics(&mut self, moved_id: &str, target_id: &str) -> bool {
        let changed = self.topics.reorder(moved_id, target_id);
        self.changed(changed)
    }

    // Sub-topic operations

    pub fn add_sub_topic(&mut self, topic_id: &str, name: &str) -> Option<SubTopicId> {
        if !self.topics.contains(topic_id) {
            return None;
        }
        let id = generate_id(CUSTOM_SUB_TOPIC_PREFIX, |candidate| {
            self.sub_topics.contains(candidate)
        });
        let topic = self.topics.get_mut(topic_id)?;
        let order = topic.sub_topic_ids.len() as u32;
        topic.sub_topic_ids.push(id.clone());
        self.sub_topics.insert(SubTopic {
            id: id.clone(),
            name: name.to_string(),
            topic_id: topic_id.to_string(),
            order,
            question_ids: vec![],
        });
        self.touch();
        debug!(topic_id, sub_topic_id = %id, "added sub-topic");
        Some(id)
    }

    pub fn update_sub_topic(&mut self, id: &str, patch: SubTopicPatch) -> bool {
        let changed = self
            .sub_topics
            .get_mut(id)
            .is_some_and(|sub_topic| patch.apply(sub_topic));
        self.changed(changed)
    }

    /// Removes the sub-topic and hands its questions back to the parent topic.
    pub fn delete_sub_topic(&mut self, id: &str) -> bool {
        let Some(sub_topic) = self.sub_topics.remove(id) else {
            return false;
        };

        match self.topics.get_mut(&sub_topic.topic_id) {
            Some(topic) => {
                topic.sub_topic_ids.retain(|existing| existing != id);
                for question_id in sub_topic.question_ids {
                    let Some(question) = self.questions.get_mut(&question_id) else {
                        continue;
                    };
                    question.sub_topic_id = None;
                    if !topic.question_ids.contains(&question_id) {
                        topic.question_ids.push(question_id);
                    }
                }
            }
            None => {
                let orphans: HashSet<QuestionId> = sub_topic.question_ids.into_iter().collect();
                self.questions
                    .retain(|question| !orphans.contains(&question.id));
            }
        }

        self.touch();
        debug!(sub_topic_id = %id, "deleted sub-topic");
        true
    }

    pub fn reorder_sub_topics(&mut self, topic_id: &str, moved_id: &str, target_id: &str) -> bool {
        let changed = self
            .topics
            .get_mut(topic_id)
            .is_some_and(|topic| reorder_ids(&mut topic.sub_topic_ids, moved_id, target_id));
        self.changed(changed)
    }

    pub fn reorder_sub_topic_questions(
        &mut self,
        sub_topic_id: &str,
        moved_id: &str,
        target_id: &str,
    ) -> bool {
        let changed = self
            .sub_topics
            .get_mut(sub_topic_id)
            .is_some_and(|sub_topic| reorder_ids(&mut sub_topic.question_ids, moved_id, target_id));
        self.changed(changed)
    }

    // Question operations

    /// Files the question under `data.sub_topic_id` when that sub-topic
    /// belongs to `topic_id`, otherwise directly under the topic.
    pub fn add_question(&mut self, topic_id: &str, data: NewQuestion) -> Option<QuestionId> {
        if !self.topics.contains(topic_id) {
            return None;
        }
        let NewQuestion {
            title,
            difficulty,
            platform,
            problem_url,
            sub_topic_id,
            is_solved,
        } = data;

        let id = generate_id(CUSTOM_QUESTION_PREFIX, |candidate| {
            self.questions.contains(candidate)
        });
        let sub_topic_id = sub_topic_id.filter(|candidate| {
            self.sub_topics
                .get(candidate)
                .is_some_and(|sub_topic| sub_topic.topic_id == topic_id)
        });

        match &sub_topic_id {
            Some(sub_topic_id) => {
                let sub_topic = self.sub_topics.get_mut(sub_topic_id)?;
                sub_topic.question_ids.push(id.clone());
            }
            None => {
                let topic = self.topics.get_mut(topic_id)?;
                topic.question_ids.push(id.clone());
            }
        }

        self.questions.insert(Question {
            id: id.clone(),
            title,
            topic_id: topic_id.to_string(),
            sub_topic_id,
            difficulty,
            platform,
            problem_url,
            is_solved,
        });
        self.touch();
        debug!(topic_id, question_id = %id, "added question");
        Some(id)
    }

    pub fn update_question(&mut self, id: &str, patch: QuestionPatch) -> bool {
        let changed = self
            .questions
            .get_mut(id)
            .is_some_and(|question| patch.apply(question));
        self.changed(changed)
    }

    pub fn toggle_question_solved(&mut self, id: &str) -> bool {
        let Some(question) = self.questions.get_mut(id) else {
            return false;
        };
        question.is_solved = !question.is_solved;
        self.touch();
        true
    }

    pub fn delete_question(&mut self, id: &str) -> bool {
        let Some(question) = self.questions.remove(id) else {
            return false;
        };
        if let Some(sub_topic) = question
            .sub_topic_id
            .as_deref()
            .and_then(|sub_topic_id| self.sub_topics.get_mut(sub_topic_id))
        {
            sub_topic.question_ids.retain(|existing| existing != id);
        }
        if let Some(topic) = self.topics.get_mut(&question.topic_id) {
            topic.question_ids.retain(|existing| existing != id);
        }
        self.touch();
        debug!(question_id = %id, "deleted question");
        true
    }

    /// Reorders the questions a topic owns directly; sub-topic lists are
    /// handled by [`Store::reorder_sub_topic_questions`].
    pub fn reorder_questions(&mut self, topic_id: &str, moved_id: &str, target_id: &str) -> bool {
        let changed = self
            .topics
            .get_mut(topic_id)
            .is_some_and(|topic| reorder_ids(&mut topic.question_ids, moved_id, target_id));
        self.changed(changed)
    }

    // UI actions

    pub fn toggle_topic_expanded(&mut self, topic_id: &str) -> bool {
        let expanded = &mut self.ui.expanded_topics;
        if let Some(index) = expanded.iter().position(|id| id == topic_id) {
            expanded.remove(index);
        } else if self.topics.contains(topic_id) {
            expanded.push(topic_id.to_string());
        } else {
            return false;
        }
        self.touch();
        true
    }

    pub fn is_expanded(&self, topic_id: &str) -> bool {
        self.ui.expanded_topics.iter().any(|id| id == topic_id)
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.ui.search_query = query.into();
    }

    pub fn open_modal(&mut self, modal: Modal) {
        self.ui.modal = Some(modal);
    }

    pub fn close_modal(&mut self) {
        self.ui.modal = None;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // Remote refresh

    /// Enters the loading state. A refresh that is already in flight wins;
    /// the second request is ignored.
    pub fn begin_fetch(&mut self) -> bool {
        if self.is_loading {
            debug!("sheet fetch already in flight, ignoring request");
            return false;
        }
        self.is_loading = true;
        self.error = None;
        true
    }

    /// Leaves the loading state. Fresh data is reconciled against whatever
    /// the store holds right now, so edits made while the fetch was pending
    /// are kept. A failure only records the message.
    pub fn finish_fetch(&mut self, result: Result<RemoteSheet, FetchError>) -> bool {
        self.is_loading = false;
        let applied = match result {
            Ok(fresh) => {
                let merged = reconcile::reconcile(fresh, self);
                self.apply_reconciled(merged);
                self.touch();
                true
            }
            Err(err) => {
                warn!(error = %err, "sheet fetch failed, keeping local data");
                self.error = Some(err.to_string());
                false
            }
        };
        applied
    }

    fn apply_reconciled(&mut self, merged: Reconciled) {
        let Reconciled {
            topics,
            sub_topics,
            questions,
            sheet_info,
            report,
        } = merged;
        info!(
            topics = topics.len(),
            questions = questions.len(),
            preserved_solved = report.preserved_solved,
            custom_topics = report.custom_topics,
            custom_questions = report.custom_questions,
            dropped_sub_topics = report.dropped_sub_topics,
            dropped_questions = report.dropped_questions,
            "applied remote sheet"
        );

        self.topics = topics;
        self.sub_topics = sub_topics;
        self.questions = questions;
        let topics = &self.topics;
        self.ui.expanded_topics.retain(|id| topics.contains(id));
        self.sheet_info = sheet_info;
        self.data_source = DataSource::Api;
        self.error = None;
    }

    /// Shallow-merges persisted fields over the current state. Session-only
    /// UI fields are always reset.
    pub fn restore(&mut self, persisted: PersistedState) {
        if let Some(topics) = persisted.topics {
            self.topics = topics;
        }
        if let Some(sub_topics) = persisted.sub_topics {
            self.sub_topics = sub_topics;
        }
        if let Some(questions) = persisted.questions {
            self.questions = questions;
        }
        if let Some(ui) = persisted.ui {
            self.ui.expanded_topics = ui.expanded_topics;
        }
        self.ui.search_query.clear();
        self.ui.modal = None;
    }

    /// Lists every broken referential or ownership invariant. Empty for
    /// any state reachable through the operations above.
    pub fn integrity_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (table, consistent) in [
            ("topics", self.topics.is_consistent()),
            ("subTopics", self.sub_topics.is_consistent()),
            ("questions", self.questions.is_consistent()),
        ] {
            if !consistent {
                problems.push(format!("{table} table ids do not match its records"));
            }
        }

        let mut placements: HashMap<&str, usize> = HashMap::new();

        for topic in self.topics.iter() {
            for sub_topic_id in &topic.sub_topic_ids {
                match self.sub_topics.get(sub_topic_id) {
                    None => problems.push(format!(
                        "topic {} lists missing sub-topic {sub_topic_id}",
                        topic.id
                    )),
                    Some(sub_topic) if sub_topic.topic_id != topic.id => problems.push(format!(
                        "topic {} lists sub-topic {sub_topic_id} owned by {}",
                        topic.id, sub_topic.topic_id
                    )),
                    Some(_) => {}
                }
            }
            for question_id in &topic.question_ids {
                *placements.entry(question_id).or_default() += 1;
                match self.questions.get(question_id) {
                    None => problems.push(format!(
                        "topic {} lists missing question {question_id}",
                        topic.id
                    )),
                    Some(question)
                        if question.topic_id != topic.id || question.sub_topic_id.is_some() =>
                    {
                        problems.push(format!(
                            "topic {} lists question {question_id} filed elsewhere",
                            topic.id
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        for sub_topic in self.sub_topics.iter() {
            match self.topics.get(&sub_topic.topic_id) {
                None => problems.push(format!(
                    "sub-topic {} belongs to missing topic {}",
                    sub_topic.id, sub_topic.topic_id
                )),
                Some(topic) if !topic.sub_topic_ids.contains(&sub_topic.id) => problems.push(
                    format!("sub-topic {} is not listed by {}", sub_topic.id, topic.id),
                ),
                Some(_) => {}
            }
            for question_id in &sub_topic.question_ids {
                *placements.entry(question_id).or_default() += 1;
                match self.questions.get(question_id) {
                    None => problems.push(format!(
                        "sub-topic {} lists missing question {question_id}",
                        sub_topic.id
                    )),
                    Some(question)
                        if question.sub_topic_id.as_deref() != Some(sub_topic.id.as_str())
                            || question.topic_id != sub_topic.topic_id =>
                    {
                        problems.push(format!(
                            "sub-topic {} lists question {question_id} filed elsewhere",
                            sub_topic.id
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        for question in self.questions.iter() {
            if !self.topics.contains(&question.topic_id) {
                problems.push(format!(
                    "question {} references missing topic {}",
                    question.id, question.topic_id
                ));
            }
            if let Some(sub_topic_id) = &question.sub_topic_id {
                match self.sub_topics.get(sub_topic_id) {
                    None => problems.push(format!(
                        "question {} references missing sub-topic {sub_topic_id}",
                        question.id
                    )),
                    Some(sub_topic) if sub_topic.topic_id != question.topic_id => {
                        problems.push(format!(
                            "question {} sits in sub-topic {sub_topic_id} of another topic",
                            question.id
                        ))
                    }
                    Some(_) => {}
                }
            }
            let count = placements.get(question.id.as_str()).copied().unwrap_or(0);
            if count != 1 {
                problems.push(format!(
                    "question {} is listed {count} times",
                    question.id
                ));
            }
        }

        problems
    }
}

/// Mints `<prefix><millis>-<random>` until it misses the `taken` set.
fn generate_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = format!(
            "{prefix}{}-{:08x}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>()
        );
        if !taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{is_user_created_question, is_user_created_topic, Difficulty};
    use crate::testing::{graph_and_arrays, question, store_from, topic, topic_with_sub_topic};

    fn topic_order(store: &Store) -> Vec<&str> {
        store.topics().ids().iter().map(String::as_str).collect()
    }

    fn assert_integrity(store: &Store) {
        let problems = store.integrity_violations();
        assert!(problems.is_empty(), "integrity violations: {problems:?}");
    }

    mod topic_tests {
        use super::*;

        #[test]
        fn add_topic_appends_with_order_and_marker() {
            let mut store = graph_and_arrays();
            let id = store.add_topic("Heaps");

            assert!(is_user_created_topic(&id));
            let topic = store.topics().get(&id).unwrap();
            assert_eq!(topic.name, "Heaps");
            assert_eq!(topic.order, 2);
            assert!(topic.sub_topic_ids.is_empty());
            assert!(topic.question_ids.is_empty());
            assert_eq!(store.topics().ids().last(), Some(&id));
            assert_integrity(&store);
        }

        #[test]
        fn add_topic_ids_are_unique() {
            let mut store = graph_and_arrays();
            let a = store.add_topic("A");
            let b = store.add_topic("B");
            assert_ne!(a, b);
        }

        #[test]
        fn update_topic_merges_patch() {
            let mut store = graph_and_arrays();
            assert!(store.update_topic("graph", TopicPatch::rename("Graphs")));
            let topic = store.topics().get("graph").unwrap();
            assert_eq!(topic.name, "Graphs");
            assert_eq!(topic.question_ids, vec!["bfs".to_string()]);
        }

        #[test]
        fn update_unknown_topic_is_noop() {
            let mut store = graph_and_arrays();
            let revision = store.revision();
            assert!(!store.update_topic("missing", TopicPatch::rename("x")));
            assert_eq!(store.revision(), revision);
            assert!(!store.topics().contains("missing"));
        }

        #[test]
        fn delete_topic_cascades_through_sub_topics() {
            let mut store = topic_with_sub_topic();
            assert!(store.delete_topic("t"));

            assert!(!store.topics().contains("t"));
            assert!(!store.sub_topics().contains("s"));
            assert!(!store.questions().contains("q1"));
            assert!(!store.questions().contains("q2"));
            assert!(!store.questions().ids().contains(&"q1".to_string()));
            assert!(!store.questions().ids().contains(&"q2".to_string()));
            assert!(store.questions().contains("q3"));
            assert_integrity(&store);
        }

        #[test]
        fn delete_topic_forgets_expansion() {
            let mut store = graph_and_arrays();
            store.toggle_topic_expanded("graph");
            store.delete_topic("graph");
            assert!(!store.is_expanded("graph"));
        }

        #[test]
        fn delete_unknown_topic_is_noop() {
            let mut store = graph_and_arrays();
            assert!(!store.delete_topic("missing"));
            assert_eq!(store.topics().len(), 2);
        }

        #[test]
        fn reorder_topics_moves_into_target_slot() {
            let mut store = store_from(
                vec![
                    topic("A", "A", &[]),
                    topic("B", "B", &[]),
                    topic("C", "C", &[]),
                    topic("D", "D", &[]),
                ],
                vec![],
                vec![],
            );
            assert!(store.reorder_topics("D", "B"));
            assert_eq!(topic_order(&store), vec!["A", "D", "B", "C"]);
        }

        #[test]
        fn reorder_topics_forward() {
            let mut store = store_from(
                vec![
                    topic("A", "A", &[]),
                    topic("B", "B", &[]),
                    topic("C", "C", &[]),
                    topic("D", "D", &[]),
                ],
                vec![],
                vec![],
            );
            assert!(store.reorder_topics("A", "C"));
            assert_eq!(topic_order(&store), vec!["B", "C", "A", "D"]);
        }

        #[test]
        fn reorder_topics_with_unknown_id_is_noop() {
            let mut store = graph_and_arrays();
            assert!(!store.reorder_topics("graph", "missing"));
            assert_eq!(topic_order(&store), vec!["graph", "arrays"]);
        }
    }

    mod sub_topic_tests {
        use super::*;

        #[test]
        fn add_sub_topic_links_into_parent() {
            let mut store = topic_with_sub_topic();
            let id = store.add_sub_topic("t", "Traversals").unwrap();

            let sub_topic = store.sub_topics().get(&id).unwrap();
            assert_eq!(sub_topic.topic_id, "t");
            assert_eq!(sub_topic.order, 1);
            assert_eq!(
                store.topics().get("t").unwrap().sub_topic_ids,
                vec!["s".to_string(), id.clone()]
            );
            assert_integrity(&store);
        }

        #[test]
        fn add_sub_topic_to_unknown_topic_is_noop() {
            let mut store = topic_with_sub_topic();
            assert!(store.add_sub_topic("missing", "x").is_none());
            assert_eq!(store.sub_topics().len(), 1);
        }

        #[test]
        fn update_sub_topic_renames() {
            let mut store = topic_with_sub_topic();
            assert!(store.update_sub_topic("s", SubTopicPatch::rename("DFS")));
            assert_eq!(store.sub_topics().get("s").unwrap().name, "DFS");
            assert!(!store.update_sub_topic("missing", SubTopicPatch::rename("x")));
        }

        #[test]
        fn delete_sub_topic_reattaches_questions() {
            let mut store = topic_with_sub_topic();
            assert!(store.delete_sub_topic("s"));

            let q1 = store.questions().get("q1").unwrap();
            assert_eq!(q1.sub_topic_id, None);
            let t = store.topics().get("t").unwrap();
            assert!(t.question_ids.contains(&"q1".to_string()));
            assert!(!t.sub_topic_ids.contains(&"s".to_string()));
            assert!(!store.sub_topics().contains("s"));
            assert_integrity(&store);
        }

        #[test]
        fn delete_unknown_sub_topic_is_noop() {
            let mut store = topic_with_sub_topic();
            assert!(!store.delete_sub_topic("missing"));
        }

        #[test]
        fn reorder_sub_topics_within_topic() {
            let mut store = topic_with_sub_topic();
            let second = store.add_sub_topic("t", "Second").unwrap();
            assert!(store.reorder_sub_topics("t", &second, "s"));
            assert_eq!(
                store.topics().get("t").unwrap().sub_topic_ids,
                vec![second, "s".to_string()]
            );
        }

        #[test]
        fn reorder_sub_topics_rejects_foreign_ids() {
            let mut store = topic_with_sub_topic();
            assert!(!store.reorder_sub_topics("other", "s", "s"));
            assert!(!store.reorder_sub_topics("missing", "s", "s"));
        }

        #[test]
        fn reorder_questions_inside_sub_topic() {
            let mut store = topic_with_sub_topic();
            let added = store
                .add_question("t", NewQuestion::new("Preorder").in_sub_topic("s"))
                .unwrap();
            assert!(store.reorder_sub_topic_questions("s", &added, "q1"));
            assert_eq!(
                store.sub_topics().get("s").unwrap().question_ids,
                vec![added, "q1".to_string()]
            );
        }
    }

    mod question_tests {
        use super::*;

        #[test]
        fn add_question_attaches_to_topic() {
            let mut store = graph_and_arrays();
            let id = store
                .add_question("graph", NewQuestion::new("DFS").difficulty(Difficulty::Hard))
                .unwrap();

            assert!(is_user_created_question(&id));
            let question = store.questions().get(&id).unwrap();
            assert_eq!(question.topic_id, "graph");
            assert_eq!(question.difficulty, Difficulty::Hard);
            assert!(!question.is_solved);
            assert_eq!(
                store.topics().get("graph").unwrap().question_ids,
                vec!["bfs".to_string(), id]
            );
            assert_integrity(&store);
        }

        #[test]
        fn add_question_can_start_solved() {
            let mut store = graph_and_arrays();
            let id = store
                .add_question("graph", NewQuestion::new("DFS").solved(true))
                .unwrap();
            assert!(store.questions().get(&id).unwrap().is_solved);
        }

        #[test]
        fn add_question_into_sub_topic() {
            let mut store = topic_with_sub_topic();
            let id = store
                .add_question("t", NewQuestion::new("Preorder").in_sub_topic("s"))
                .unwrap();

            let question = store.questions().get(&id).unwrap();
            assert_eq!(question.sub_topic_id.as_deref(), Some("s"));
            assert!(store.sub_topics().get("s").unwrap().question_ids.contains(&id));
            assert!(!store.topics().get("t").unwrap().question_ids.contains(&id));
            assert_integrity(&store);
        }

        #[test]
        fn add_question_with_foreign_sub_topic_falls_back_to_topic() {
            let mut store = topic_with_sub_topic();
            let id = store
                .add_question("other", NewQuestion::new("Misfiled").in_sub_topic("s"))
                .unwrap();

            let question = store.questions().get(&id).unwrap();
            assert_eq!(question.sub_topic_id, None);
            assert!(store.topics().get("other").unwrap().question_ids.contains(&id));
            assert_integrity(&store);
        }

        #[test]
        fn add_question_to_unknown_topic_is_noop() {
            let mut store = graph_and_arrays();
            assert!(store.add_question("missing", NewQuestion::new("x")).is_none());
            assert_eq!(store.questions().len(), 2);
        }

        #[test]
        fn update_question_merges_fields() {
            let mut store = graph_and_arrays();
            let patch = QuestionPatch {
                title: Some("Breadth First Search".into()),
                platform: Some("gfg".into()),
                ..Default::default()
            };
            assert!(store.update_question("bfs", patch));
            let question = store.questions().get("bfs").unwrap();
            assert_eq!(question.title, "Breadth First Search");
            assert_eq!(question.platform, "gfg");
            assert_eq!(question.difficulty, Difficulty::Easy);
            assert_eq!(question.topic_id, "graph");
        }

        #[test]
        fn update_unknown_question_is_noop() {
            let mut store = graph_and_arrays();
            assert!(!store.update_question("missing", QuestionPatch::default()));
        }

        #[test]
        fn toggle_twice_restores_value() {
            let mut store = graph_and_arrays();
            assert!(store.toggle_question_solved("bfs"));
            assert!(store.questions().get("bfs").unwrap().is_solved);
            assert!(store.toggle_question_solved("bfs"));
            assert!(!store.questions().get("bfs").unwrap().is_solved);
        }

        #[test]
        fn toggle_unknown_question_is_noop() {
            let mut store = graph_and_arrays();
            let revision = store.revision();
            assert!(!store.toggle_question_solved("missing"));
            assert_eq!(store.revision(), revision);
        }

        #[test]
        fn delete_question_from_topic() {
            let mut store = graph_and_arrays();
            assert!(store.delete_question("bfs"));
            assert!(!store.questions().contains("bfs"));
            assert!(store.topics().get("graph").unwrap().question_ids.is_empty());
            assert_integrity(&store);
        }

        #[test]
        fn delete_question_from_sub_topic() {
            let mut store = topic_with_sub_topic();
            assert!(store.delete_question("q1"));
            assert!(store.sub_topics().get("s").unwrap().question_ids.is_empty());
            assert_integrity(&store);
        }

        #[test]
        fn delete_unknown_question_is_noop() {
            let mut store = graph_and_arrays();
            assert!(!store.delete_question("missing"));
        }

        #[test]
        fn reorder_questions_in_topic() {
            let mut store = store_from(
                vec![topic("t", "T", &["a", "b", "c"])],
                vec![],
                vec![
                    question("a", "A", "t", Difficulty::Easy),
                    question("b", "B", "t", Difficulty::Easy),
                    question("c", "C", "t", Difficulty::Easy),
                ],
            );
            assert!(store.reorder_questions("t", "c", "a"));
            assert_eq!(
                store.topics().get("t").unwrap().question_ids,
                vec!["c".to_string(), "a".to_string(), "b".to_string()]
            );
        }

        #[test]
        fn reorder_questions_ignores_sub_topic_members() {
            let mut store = topic_with_sub_topic();
            assert!(!store.reorder_questions("t", "q1", "q2"));
        }
    }

    mod ui_tests {
        use super::*;

        #[test]
        fn toggle_topic_expanded_adds_and_removes() {
            let mut store = graph_and_arrays();
            assert!(store.toggle_topic_expanded("arrays"));
            assert!(store.toggle_topic_expanded("graph"));
            assert_eq!(
                store.ui().expanded_topics,
                vec!["arrays".to_string(), "graph".to_string()]
            );
            assert!(store.toggle_topic_expanded("arrays"));
            assert_eq!(store.ui().expanded_topics, vec!["graph".to_string()]);
        }

        #[test]
        fn toggle_unknown_topic_is_noop() {
            let mut store = graph_and_arrays();
            assert!(!store.toggle_topic_expanded("missing"));
            assert!(store.ui().expanded_topics.is_empty());
        }

        #[test]
        fn modal_open_and_close() {
            let mut store = graph_and_arrays();
            store.open_modal(Modal::EditTopic {
                topic_id: "graph".into(),
            });
            assert_eq!(store.ui().modal.as_ref().map(Modal::title), Some("Edit Topic"));
            store.close_modal();
            assert!(store.ui().modal.is_none());
        }

        #[test]
        fn search_query_setter() {
            let mut store = graph_and_arrays();
            store.set_search_query("sum");
            assert_eq!(store.ui().search_query, "sum");
        }

        #[test]
        fn session_only_actions_leave_revision() {
            let mut store = graph_and_arrays();
            let revision = store.revision();
            store.set_search_query("sum");
            store.open_modal(Modal::AddTopic);
            store.close_modal();
            store.clear_error();
            assert!(store.begin_fetch());
            assert!(!store.finish_fetch(Err(FetchError::Transport("offline".into()))));
            assert_eq!(store.revision(), revision);

            assert!(store.toggle_topic_expanded("graph"));
            assert!(store.revision() > revision);
        }
    }

    mod fetch_lifecycle_tests {
        use super::*;

        fn empty_sheet() -> RemoteSheet {
            RemoteSheet {
                topics: EntityTable::from_records([topic("graph", "Graph", &["bfs"])]),
                questions: EntityTable::from_records([question(
                    "bfs",
                    "BFS",
                    "graph",
                    Difficulty::Easy,
                )]),
                sheet_info: Some(SheetInfo {
                    name: "Sheet".into(),
                    ..Default::default()
                }),
            }
        }

        #[test]
        fn second_begin_is_ignored_while_loading() {
            let mut store = graph_and_arrays();
            assert!(store.begin_fetch());
            assert!(store.is_loading());
            assert!(!store.begin_fetch());
        }

        #[test]
        fn failure_records_error_and_keeps_data() {
            let mut store = graph_and_arrays();
            store.toggle_question_solved("bfs");
            let before = store.questions().clone();

            store.begin_fetch();
            let applied = store.finish_fetch(Err(FetchError::Http {
                status: 500,
                reason: "Internal Server Error".into(),
            }));

            assert!(!applied);
            assert!(!store.is_loading());
            assert_eq!(
                store.error(),
                Some("Failed to fetch sheet: 500 Internal Server Error")
            );
            assert_eq!(store.questions(), &before);
            assert_eq!(store.data_source(), DataSource::Sample);

            store.clear_error();
            assert!(store.error().is_none());
        }

        #[test]
        fn success_switches_source_and_clears_loading() {
            let mut store = graph_and_arrays();
            store.begin_fetch();
            assert!(store.finish_fetch(Ok(empty_sheet())));
            assert!(!store.is_loading());
            assert_eq!(store.data_source(), DataSource::Api);
            assert_eq!(store.sheet_info().map(|s| s.name.as_str()), Some("Sheet"));
            assert!(!store.topics().contains("arrays"));
            assert_integrity(&store);
        }

        #[test]
        fn edits_during_fetch_survive() {
            let mut store = graph_and_arrays();
            store.begin_fetch();
            store.toggle_question_solved("bfs");
            let custom = store.add_topic("Mine");
            store.finish_fetch(Ok(empty_sheet()));

            assert!(store.questions().get("bfs").unwrap().is_solved);
            assert!(store.topics().contains(&custom));
        }
    }

    mod restore_tests {
        use super::*;
        use crate::db::PersistedUi;

        #[test]
        fn restore_resets_session_fields() {
            let mut store = graph_and_arrays();
            store.set_search_query("graph");
            store.open_modal(Modal::AddTopic);

            store.restore(PersistedState {
                ui: Some(PersistedUi {
                    expanded_topics: vec!["graph".into()],
                }),
                ..Default::default()
            });

            assert_eq!(store.ui().search_query, "");
            assert!(store.ui().modal.is_none());
            assert!(store.is_expanded("graph"));
            assert_eq!(store.topics().len(), 2);
        }

        #[test]
        fn restore_replaces_present_tables_only() {
            let mut store = graph_and_arrays();
            let replacement = EntityTable::from_records([topic("solo", "Solo", &[])]);
            store.restore(PersistedState {
                topics: Some(replacement.clone()),
                ..Default::default()
            });
            assert_eq!(store.topics(), &replacement);
            assert_eq!(store.questions().len(), 2);
        }
    }

    mod integrity_tests {
        use super::*;

        #[test]
        fn fixtures_are_consistent() {
            assert_integrity(&graph_and_arrays());
            assert_integrity(&topic_with_sub_topic());
        }

        #[test]
        fn detects_dangling_topic_reference() {
            let store = store_from(
                vec![topic("t", "T", &["q"])],
                vec![],
                vec![question("q", "Q", "elsewhere", Difficulty::Easy)],
            );
            assert!(!store.integrity_violations().is_empty());
        }

        #[test]
        fn detects_double_placement() {
            let store = store_from(
                vec![topic("t", "T", &["q", "q"])],
                vec![],
                vec![question("q", "Q", "t", Difficulty::Easy)],
            );
            let problems = store.integrity_violations();
            assert!(problems.iter().any(|p| p.contains("listed 2 times")));
        }

        #[test]
        fn detects_unplaced_question() {
            let store = store_from(
                vec![topic("t", "T", &[])],
                vec![],
                vec![question("q", "Q", "t", Difficulty::Easy)],
            );
            let problems = store.integrity_violations();
            assert!(problems.iter().any(|p| p.contains("listed 0 times")));
        }

        #[test]
        fn mixed_operation_sequence_keeps_invariants() {
            let mut store = topic_with_sub_topic();
            let topic_id = store.add_topic("Mine");
            let sub = store.add_sub_topic(&topic_id, "Part").unwrap();
            let q = store
                .add_question(&topic_id, NewQuestion::new("One").in_sub_topic(sub.clone()))
                .unwrap();
            store.add_question(&topic_id, NewQuestion::new("Two"));
            store.toggle_question_solved(&q);
            store.delete_sub_topic(&sub);
            store.delete_question("q2");
            store.reorder_topics(&topic_id, "t");
            store.delete_topic("other");
            assert_integrity(&store);
        }
    }
}
