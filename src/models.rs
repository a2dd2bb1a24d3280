use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub type TopicId = String;
pub type SubTopicId = String;
pub type QuestionId = String;

// Ids minted locally carry these prefixes. Sheet slugs are limited to
// `[a-z0-9-]`, so the `_` keeps them out of this namespace.
pub const CUSTOM_TOPIC_PREFIX: &str = "custom_";
pub const CUSTOM_SUB_TOPIC_PREFIX: &str = "custom_st_";
pub const CUSTOM_QUESTION_PREFIX: &str = "custom_q_";

pub const DEFAULT_PLATFORM: &str = "leetcode";
pub const PLACEHOLDER_URL: &str = "#";

pub fn is_user_created_topic(id: &str) -> bool {
    id.starts_with(CUSTOM_TOPIC_PREFIX)
}

pub fn is_user_created_question(id: &str) -> bool {
    id.starts_with(CUSTOM_QUESTION_PREFIX)
}

/// Anything stored in an [`EntityTable`] is keyed by its own id.
pub trait Entity {
    fn id(&self) -> &str;
}

/// An id-indexed map plus the ordered id list that defines display order.
///
/// `all_ids` is always a duplicate-free permutation of the keys of `by_id`;
/// every method that touches one side touches the other in the same call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTable<T> {
    by_id: BTreeMap<String, T>,
    all_ids: Vec<String>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            by_id: BTreeMap::new(),
            all_ids: Vec::new(),
        }
    }
}

impl<T: Entity> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_records<I: IntoIterator<Item = T>>(records: I) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.by_id.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.all_ids
    }

    /// Records in display order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Records in key order, for bulk edits where display order is irrelevant.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.by_id.values_mut()
    }

    /// Inserts or replaces a record. A replaced record keeps its position,
    /// a new one is appended.
    pub fn insert(&mut self, record: T) -> Option<T> {
        let id = record.id().to_string();
        let previous = self.by_id.insert(id.clone(), record);
        if previous.is_none() {
            self.all_ids.push(id);
        }
        previous
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.by_id.remove(id)?;
        self.all_ids.retain(|existing| existing != id);
        Some(removed)
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        self.by_id.retain(|_, record| keep(record));
        let by_id = &self.by_id;
        self.all_ids.retain(|id| by_id.contains_key(id));
    }

    pub fn reorder(&mut self, moved: &str, target: &str) -> bool {
        reorder_ids(&mut self.all_ids, moved, target)
    }

    /// Checks the permutation invariant and that every record sits under its own id.
    pub fn is_consistent(&self) -> bool {
        if self.all_ids.len() != self.by_id.len() {
            return false;
        }
        let mut seen = HashSet::new();
        self.all_ids.iter().all(|id| {
            seen.insert(id.as_str())
                && self
                    .by_id
                    .get(id)
                    .is_some_and(|record| record.id() == id)
        })
    }
}

/// Moves `moved` into the slot currently held by `target`; everything in
/// between shifts by one. Returns false when either id is absent or they
/// are the same.
pub fn reorder_ids(ids: &mut Vec<String>, moved: &str, target: &str) -> bool {
    let Some(old_index) = ids.iter().position(|id| id == moved) else {
        return false;
    };
    let Some(new_index) = ids.iter().position(|id| id == target) else {
        return false;
    };
    if old_index == new_index {
        return false;
    }
    let id = ids.remove(old_index);
    ids.insert(new_index, id);
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub sub_topic_ids: Vec<SubTopicId>,
    /// Questions attached directly to the topic, outside any sub-topic.
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

impl Entity for Topic {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTopic {
    pub id: SubTopicId,
    pub name: String,
    pub topic_id: TopicId,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

impl Entity for SubTopic {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub topic_id: TopicId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic_id: Option<SubTopicId>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub problem_url: String,
    #[serde(default)]
    pub is_solved: bool,
}

impl Entity for Question {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Folds free-text sheet difficulties onto the three levels. "basic"
    /// counts as easy; anything unrecognized takes `fallback`.
    pub fn normalize(raw: Option<&str>, fallback: Difficulty) -> Self {
        match raw.map(|r| r.trim().to_lowercase()) {
            Some(r) if r == "basic" => Difficulty::Easy,
            Some(r) => Self::from_str(&r).unwrap_or(fallback),
            None => fallback,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized tables a seed file or an ingested sheet produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub topics: EntityTable<Topic>,
    #[serde(default)]
    pub sub_topics: EntityTable<SubTopic>,
    #[serde(default)]
    pub questions: EntityTable<Question>,
}

// Partial updates: only fields that are `Some` are written.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPatch {
    pub name: Option<String>,
    pub order: Option<u32>,
}

impl TopicPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, topic: &mut Topic) -> bool {
        let before = topic.clone();
        if let Some(name) = self.name {
            topic.name = name;
        }
        if let Some(order) = self.order {
            topic.order = order;
        }
        *topic != before
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTopicPatch {
    pub name: Option<String>,
    pub order: Option<u32>,
}

impl SubTopicPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, sub_topic: &mut SubTopic) -> bool {
        let before = sub_topic.clone();
        if let Some(name) = self.name {
            sub_topic.name = name;
        }
        if let Some(order) = self.order {
            sub_topic.order = order;
        }
        *sub_topic != before
    }
}

/// Editable question fields. Ownership (`topic_id`/`sub_topic_id`) is
/// deliberately absent: moving a question between containers is not a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionPatch {
    pub title: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub platform: Option<String>,
    pub problem_url: Option<String>,
    pub is_solved: Option<bool>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, question: &mut Question) -> bool {
        let before = question.clone();
        if let Some(title) = self.title {
            question.title = title;
        }
        if let Some(difficulty) = self.difficulty {
            question.difficulty = difficulty;
        }
        if let Some(platform) = self.platform {
            question.platform = platform;
        }
        if let Some(url) = self.problem_url {
            question.problem_url = url;
        }
        if let Some(solved) = self.is_solved {
            question.is_solved = solved;
        }
        *question != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub title: String,
    pub difficulty: Difficulty,
    pub platform: String,
    pub problem_url: String,
    pub sub_topic_id: Option<SubTopicId>,
    pub is_solved: bool,
}

impl NewQuestion {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            difficulty: Difficulty::Medium,
            platform: DEFAULT_PLATFORM.to_string(),
            problem_url: PLACEHOLDER_URL.to_string(),
            sub_topic_id: None,
            is_solved: false,
        }
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn problem_url(mut self, url: impl Into<String>) -> Self {
        self.problem_url = url.into();
        self
    }

    pub fn in_sub_topic(mut self, sub_topic_id: impl Into<String>) -> Self {
        self.sub_topic_id = Some(sub_topic_id.into());
        self
    }

    pub fn solved(mut self, solved: bool) -> Self {
        self.is_solved = solved;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    AddTopic,
    EditTopic { topic_id: TopicId },
    AddSubTopic { topic_id: TopicId },
    EditSubTopic { sub_topic_id: SubTopicId },
    AddQuestion {
        topic_id: TopicId,
        sub_topic_id: Option<SubTopicId>,
    },
    EditQuestion { question_id: QuestionId },
    ConfirmDeleteTopic { topic_id: TopicId },
    ConfirmDeleteSubTopic { sub_topic_id: SubTopicId },
    ConfirmDeleteQuestion { question_id: QuestionId },
}

impl Modal {
    pub fn title(&self) -> &'static str {
        match self {
            Modal::AddTopic => "Add New Topic",
            Modal::EditTopic { .. } => "Edit Topic",
            Modal::AddSubTopic { .. } => "Add Sub-topic",
            Modal::EditSubTopic { .. } => "Edit Sub-topic",
            Modal::AddQuestion { .. } => "Add New Question",
            Modal::EditQuestion { .. } => "Edit Question",
            Modal::ConfirmDeleteTopic { .. } => "Delete Topic",
            Modal::ConfirmDeleteSubTopic { .. } => "Delete Sub-topic",
            Modal::ConfirmDeleteQuestion { .. } => "Delete Question",
        }
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(
            self,
            Modal::ConfirmDeleteTopic { .. }
                | Modal::ConfirmDeleteSubTopic { .. }
                | Modal::ConfirmDeleteQuestion { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Insertion-ordered, no duplicates.
    pub expanded_topics: Vec<TopicId>,
    pub search_query: String,
    pub modal: Option<Modal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Sample,
    Api,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
}

/// Whether a topic's own progress counts questions filed in its sub-topics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressScope {
    #[default]
    Direct,
    Nested,
}

impl ProgressScope {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Some(ProgressScope::Direct),
            "nested" => Some(ProgressScope::Nested),
            _ => None,
        }
    }
}

/// `round(solved / total * 100)`, 0 for an empty set.
pub fn percent(solved: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (solved as f64 / total as f64 * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub solved: usize,
}

impl Tally {
    pub fn record(&mut self, solved: bool) {
        self.total += 1;
        if solved {
            self.solved += 1;
        }
    }

    pub fn percent(&self) -> u32 {
        percent(self.solved, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub solved: usize,
    pub progress: u32,
    pub easy: Tally,
    pub medium: Tally,
    pub hard: Tally,
}

impl Stats {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> Tally {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicProgress {
    pub solved: usize,
    pub total: usize,
    pub percent: u32,
}

impl From<Tally> for TopicProgress {
    fn from(tally: Tally) -> Self {
        Self {
            solved: tally.solved,
            total: tally.total,
            percent: tally.percent(),
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
