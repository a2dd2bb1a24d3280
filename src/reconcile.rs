//! Folding a freshly fetched sheet into the local state.
//!
//! Fresh data replaces every sheet-sourced topic and question. Solved flags,
//! user-created topics and questions, and the local sub-topic structure are
//! carried over, then ownership lists are rebuilt so that every question is
//! filed exactly once.

use std::collections::{HashMap, HashSet};

use crate::models::{
    is_user_created_question, is_user_created_topic, EntityTable, Question, SheetInfo, SubTopic,
    Topic,
};
use crate::store::Store;

/// The normalized shape the fetch collaborator hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSheet {
    pub topics: EntityTable<Topic>,
    pub questions: EntityTable<Question>,
    pub sheet_info: Option<SheetInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub preserved_solved: usize,
    pub custom_topics: usize,
    pub custom_questions: usize,
    pub dropped_sub_topics: usize,
    pub dropped_questions: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub topics: EntityTable<Topic>,
    pub sub_topics: EntityTable<SubTopic>,
    pub questions: EntityTable<Question>,
    pub sheet_info: Option<SheetInfo>,
    pub report: ReconcileReport,
}

pub fn reconcile(fresh: RemoteSheet, current: &Store) -> Reconciled {
    let RemoteSheet {
        mut topics,
        mut questions,
        sheet_info,
    } = fresh;
    let mut report = ReconcileReport::default();

    for question in questions.values_mut() {
        if let Some(local) = current.questions().get(&question.id) {
            question.is_solved = local.is_solved;
            if local.is_solved {
                report.preserved_solved += 1;
            }
            if local.topic_id == question.topic_id {
                question.sub_topic_id = local.sub_topic_id.clone();
            }
        }
    }

    for topic in current.topics().iter() {
        if is_user_created_topic(&topic.id) {
            topics.insert(topic.clone());
            report.custom_topics += 1;
        }
    }
    for question in current.questions().iter() {
        if is_user_created_question(&question.id) {
            questions.insert(question.clone());
            report.custom_questions += 1;
        }
    }

    let mut sub_topics = current.sub_topics().clone();
    sub_topics.retain(|sub_topic| topics.contains(&sub_topic.topic_id));
    report.dropped_sub_topics = current.sub_topics().len() - sub_topics.len();

    let before = questions.len();
    questions.retain(|question| topics.contains(&question.topic_id));
    report.dropped_questions = before - questions.len();

    for question in questions.values_mut() {
        let filed_correctly = question.sub_topic_id.as_deref().is_some_and(|id| {
            sub_topics
                .get(id)
                .is_some_and(|sub_topic| sub_topic.topic_id == question.topic_id)
        });
        if !filed_correctly {
            question.sub_topic_id = None;
        }
    }

    relink_sub_topics(&mut topics, &sub_topics, current);
    relink_questions(&mut topics, &mut sub_topics, &questions);

    Reconciled {
        topics,
        sub_topics,
        questions,
        sheet_info,
        report,
    }
}

fn relink_sub_topics(
    topics: &mut EntityTable<Topic>,
    sub_topics: &EntityTable<SubTopic>,
    current: &Store,
) {
    let mut members: HashMap<&str, Vec<&str>> = HashMap::new();
    for sub_topic in sub_topics.iter() {
        members
            .entry(sub_topic.topic_id.as_str())
            .or_default()
            .push(sub_topic.id.as_str());
    }

    for topic in topics.values_mut() {
        let mut listed = topic.sub_topic_ids.clone();
        if let Some(local) = current.topics().get(&topic.id) {
            listed.extend(local.sub_topic_ids.iter().cloned());
        }
        let owned = members.get(topic.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        topic.sub_topic_ids = ordered_members(&listed, owned);
    }
}

fn relink_questions(
    topics: &mut EntityTable<Topic>,
    sub_topics: &mut EntityTable<SubTopic>,
    questions: &EntityTable<Question>,
) {
    let mut direct: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut nested: HashMap<&str, Vec<&str>> = HashMap::new();
    for question in questions.iter() {
        let bucket = match &question.sub_topic_id {
            Some(sub_topic_id) => nested.entry(sub_topic_id.as_str()),
            None => direct.entry(question.topic_id.as_str()),
        };
        bucket.or_default().push(question.id.as_str());
    }

    for sub_topic in sub_topics.values_mut() {
        let owned = nested.get(sub_topic.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        sub_topic.question_ids = ordered_members(&sub_topic.question_ids, owned);
    }
    for topic in topics.values_mut() {
        let owned = direct.get(topic.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        topic.question_ids = ordered_members(&topic.question_ids, owned);
    }
}

/// The ids of `owned`, laid out by their first appearance in `listed` and
/// then in `owned` order for the rest. Ids outside `owned` are dropped.
fn ordered_members(listed: &[String], owned: &[&str]) -> Vec<String> {
    let allowed: HashSet<&str> = owned.iter().copied().collect();
    let mut seen = HashSet::new();
    listed
        .iter()
        .map(String::as_str)
        .chain(owned.iter().copied())
        .filter(|id| allowed.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
