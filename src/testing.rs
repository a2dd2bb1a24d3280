//! Fixture builders shared by unit tests.

use crate::models::{Dataset, Difficulty, EntityTable, Question, SubTopic, Topic};
use crate::store::Store;

pub fn topic(id: &str, name: &str, question_ids: &[&str]) -> Topic {
    Topic {
        id: id.to_string(),
        name: name.to_string(),
        order: 0,
        sub_topic_ids: vec![],
        question_ids: question_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn sub_topic(id: &str, topic_id: &str, question_ids: &[&str]) -> SubTopic {
    SubTopic {
        id: id.to_string(),
        name: id.to_string(),
        topic_id: topic_id.to_string(),
        order: 0,
        question_ids: question_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn question(id: &str, title: &str, topic_id: &str, difficulty: Difficulty) -> Question {
    Question {
        id: id.to_string(),
        title: title.to_string(),
        topic_id: topic_id.to_string(),
        sub_topic_id: None,
        difficulty,
        platform: "leetcode".to_string(),
        problem_url: format!("https://leetcode.com/problems/{id}"),
        is_solved: false,
    }
}

pub fn nested_question(
    id: &str,
    title: &str,
    topic_id: &str,
    sub_topic_id: &str,
    difficulty: Difficulty,
) -> Question {
    Question {
        sub_topic_id: Some(sub_topic_id.to_string()),
        ..question(id, title, topic_id, difficulty)
    }
}

pub fn store_from(topics: Vec<Topic>, sub_topics: Vec<SubTopic>, questions: Vec<Question>) -> Store {
    Store::new(Dataset {
        topics: EntityTable::from_records(topics),
        sub_topics: EntityTable::from_records(sub_topics),
        questions: EntityTable::from_records(questions),
    })
}

/// Two topics: "graph" owns BFS directly, "arrays" owns Two Sum directly.
pub fn graph_and_arrays() -> Store {
    store_from(
        vec![
            topic("graph", "Graph", &["bfs"]),
            topic("arrays", "Arrays", &["two-sum"]),
        ],
        vec![],
        vec![
            question("bfs", "BFS", "graph", Difficulty::Easy),
            question("two-sum", "Two Sum", "arrays", Difficulty::Easy),
        ],
    )
}

/// Topic "t" owns sub-topic "s" (holding q1) and q2 directly.
pub fn topic_with_sub_topic() -> Store {
    let mut t = topic("t", "Trees", &["q2"]);
    t.sub_topic_ids = vec!["s".to_string()];
    store_from(
        vec![t, topic("other", "Other", &["q3"])],
        vec![sub_topic("s", "t", &["q1"])],
        vec![
            nested_question("q1", "Inorder Traversal", "t", "s", Difficulty::Easy),
            question("q2", "Diameter", "t", Difficulty::Medium),
            question("q3", "Unrelated", "other", Difficulty::Hard),
        ],
    )
}
