use crate::models::{
    percent, Difficulty, ProgressScope, Question, Stats, SubTopic, Tally, Topic, TopicProgress,
};

use super::Store;

/// Case-insensitive substring match; an empty needle matches everything.
fn matches(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Store {
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();
        for question in self.questions.iter() {
            let tally = match question.difficulty {
                Difficulty::Easy => &mut stats.easy,
                Difficulty::Medium => &mut stats.medium,
                Difficulty::Hard => &mut stats.hard,
            };
            tally.record(question.is_solved);
            stats.total += 1;
            if question.is_solved {
                stats.solved += 1;
            }
        }
        stats.progress = percent(stats.solved, stats.total);
        stats
    }

    /// Progress under the store's configured [`ProgressScope`].
    pub fn topic_progress(&self, topic_id: &str) -> TopicProgress {
        self.topic_progress_with(topic_id, self.progress_scope)
    }

    pub fn topic_progress_with(&self, topic_id: &str, scope: ProgressScope) -> TopicProgress {
        let Some(topic) = self.topics.get(topic_id) else {
            return TopicProgress::default();
        };
        let mut tally = self.tally(&topic.question_ids);
        if scope == ProgressScope::Nested {
            for sub_topic in self.sub_topics_for_topic(topic_id) {
                let nested = self.tally(&sub_topic.question_ids);
                tally.total += nested.total;
                tally.solved += nested.solved;
            }
        }
        tally.into()
    }

    pub fn sub_topic_progress(&self, sub_topic_id: &str) -> TopicProgress {
        self.sub_topics
            .get(sub_topic_id)
            .map(|sub_topic| self.tally(&sub_topic.question_ids).into())
            .unwrap_or_default()
    }

    fn tally(&self, question_ids: &[String]) -> Tally {
        let mut tally = Tally::default();
        for question in question_ids.iter().filter_map(|id| self.questions.get(id)) {
            tally.record(question.is_solved);
        }
        tally
    }

    /// Topics in display order whose name matches, or that directly own a
    /// question whose title matches.
    pub fn filtered_topics(&self, query: &str) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|topic| {
                matches(&topic.name, query)
                    || topic
                        .question_ids
                        .iter()
                        .filter_map(|id| self.questions.get(id))
                        .any(|question| matches(&question.title, query))
            })
            .collect()
    }

    /// [`Store::filtered_topics`] under the current search query.
    pub fn visible_topics(&self) -> Vec<&Topic> {
        self.filtered_topics(&self.ui.search_query)
    }

    pub fn questions_for_topic(&self, topic_id: &str, query: &str) -> Vec<&Question> {
        match self.topics.get(topic_id) {
            Some(topic) => self.select_questions(&topic.question_ids, query),
            None => vec![],
        }
    }

    pub fn questions_for_sub_topic(&self, sub_topic_id: &str, query: &str) -> Vec<&Question> {
        match self.sub_topics.get(sub_topic_id) {
            Some(sub_topic) => self.select_questions(&sub_topic.question_ids, query),
            None => vec![],
        }
    }

    pub fn sub_topics_for_topic(&self, topic_id: &str) -> Vec<&SubTopic> {
        self.topics
            .get(topic_id)
            .map(|topic| {
                topic
                    .sub_topic_ids
                    .iter()
                    .filter_map(|id| self.sub_topics.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn select_questions(&self, question_ids: &[String], query: &str) -> Vec<&Question> {
        question_ids
            .iter()
            .filter_map(|id| self.questions.get(id))
            .filter(|question| matches(&question.title, query))
            .collect()
    }
}
