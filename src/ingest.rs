//! Turns a raw sheet export into the normalized dataset the store starts from.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{
    Dataset, Difficulty, Question, SubTopic, Topic, DEFAULT_PLATFORM, PLACEHOLDER_URL,
};
use crate::sanitize::SubstitutionTable;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetDocument {
    pub data: SheetDocumentData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetDocumentData {
    #[serde(default)]
    pub questions: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetEntry {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub sub_topic: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub question_id: Option<SheetQuestionDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetQuestionDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub problem_url: Option<String>,
}

/// Lowercases and collapses every run of non-alphanumerics into one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Topics and `(topic, sub-topic)` pairs are deduplicated by name in
/// first-seen order. Question ids are positional (`q0`, `q1`, ...).
pub fn ingest_sheet(
    document: &SheetDocument,
    table: &SubstitutionTable,
    fallback: Difficulty,
) -> Dataset {
    let mut dataset = Dataset::default();
    let mut topic_slugs: HashMap<String, String> = HashMap::new();
    let mut sub_topic_slugs: HashMap<(String, String), String> = HashMap::new();

    for (index, entry) in document.data.questions.iter().enumerate() {
        let topic_name = table.apply(&entry.topic).into_owned();
        let topic_id = match topic_slugs.get(&topic_name) {
            Some(slug) => slug.clone(),
            None => {
                let slug = slugify(&topic_name);
                let order = dataset.topics.len() as u32;
                if !dataset.topics.contains(&slug) {
                    dataset.topics.insert(Topic {
                        id: slug.clone(),
                        name: topic_name.clone(),
                        order,
                        sub_topic_ids: vec![],
                        question_ids: vec![],
                    });
                }
                topic_slugs.insert(topic_name.clone(), slug.clone());
                slug
            }
        };

        let sub_topic_id = match non_empty(&entry.sub_topic) {
            Some(raw) => {
                let sub_name = table.apply(raw).into_owned();
                let key = (topic_name.clone(), sub_name.clone());
                match sub_topic_slugs.get(&key) {
                    Some(slug) => Some(slug.clone()),
                    None => {
                        let slug = format!("{topic_id}--{}", slugify(&sub_name));
                        if !dataset.sub_topics.contains(&slug) {
                            let topic = dataset.topics.get_mut(&topic_id);
                            let order = topic.as_ref().map_or(0, |t| t.sub_topic_ids.len()) as u32;
                            if let Some(topic) = topic {
                                topic.sub_topic_ids.push(slug.clone());
                            }
                            dataset.sub_topics.insert(SubTopic {
                                id: slug.clone(),
                                name: sub_name,
                                topic_id: topic_id.clone(),
                                order,
                                question_ids: vec![],
                            });
                        }
                        sub_topic_slugs.insert(key, slug.clone());
                        Some(slug)
                    }
                }
            }
            None => None,
        };

        let detail = entry.question_id.clone().unwrap_or_default();
        let title = non_empty(&entry.title)
            .or_else(|| non_empty(&detail.name))
            .unwrap_or("Untitled");
        let id = format!("q{index}");

        match &sub_topic_id {
            Some(sub_topic_id) => {
                if let Some(sub_topic) = dataset.sub_topics.get_mut(sub_topic_id) {
                    sub_topic.question_ids.push(id.clone());
                }
            }
            None => {
                if let Some(topic) = dataset.topics.get_mut(&topic_id) {
                    topic.question_ids.push(id.clone());
                }
            }
        }

        dataset.questions.insert(Question {
            id,
            title: table.apply(title).into_owned(),
            topic_id,
            sub_topic_id,
            difficulty: Difficulty::normalize(detail.difficulty.as_deref(), fallback),
            platform: non_empty(&detail.platform)
                .unwrap_or(DEFAULT_PLATFORM)
                .to_string(),
            problem_url: non_empty(&detail.problem_url)
                .unwrap_or(PLACEHOLDER_URL)
                .to_string(),
            is_solved: false,
        });
    }

    dataset
}
