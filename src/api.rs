//! Client for the public sheet endpoint and the transform from its payload
//! into normalized tables.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{Difficulty, EntityTable, Question, SheetInfo, Topic, DEFAULT_PLATFORM};
use crate::reconcile::RemoteSheet;
use crate::sanitize::SubstitutionTable;

const USER_AGENT_VALUE: &str = concat!("qtrack/", env!("CARGO_PKG_VERSION"));

const REJECTED_FALLBACK: &str = "Failed to fetch sheet data";

/// Anything that can produce a fresh sheet by slug.
pub trait SheetSource: Send + Sync {
    fn fetch_sheet(&self, slug: &str) -> Result<RemoteSheet, FetchError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<EnvelopeStatus>,
    #[serde(default)]
    data: Option<SheetPayload>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeStatus {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SheetPayload {
    sheet: SheetMeta,
    #[serde(default)]
    questions: Vec<RemoteQuestion>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    banner: Option<String>,
    #[serde(default)]
    followers: Option<u64>,
    #[serde(default)]
    config: Option<SheetConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetConfig {
    #[serde(default)]
    topic_order: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteQuestion {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    question_id: Option<RemoteQuestionDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteQuestionDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    problem_url: Option<String>,
}

impl Envelope {
    fn into_payload(self) -> Result<SheetPayload, FetchError> {
        let status = self.status.unwrap_or(EnvelopeStatus {
            success: false,
            message: None,
        });
        if !status.success {
            let message = status
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| REJECTED_FALLBACK.to_string());
            return Err(FetchError::Rejected(message));
        }
        self.data
            .ok_or_else(|| FetchError::Decode("response has no data".to_string()))
    }
}

/// Topic id derived from a `topicOrder` entry: lowercase, whitespace runs
/// become `-`, anything outside `[a-z0-9-]` is dropped.
pub fn topic_slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Decodes a raw response body into a normalized sheet.
pub fn decode_sheet(
    body: &str,
    table: &SubstitutionTable,
    fallback: Difficulty,
) -> Result<RemoteSheet, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let payload = envelope.into_payload()?;
    Ok(transform_sheet(payload, table, fallback))
}

fn transform_sheet(
    payload: SheetPayload,
    table: &SubstitutionTable,
    fallback: Difficulty,
) -> RemoteSheet {
    let SheetPayload { sheet, questions } = payload;
    let mut topics: EntityTable<Topic> = EntityTable::new();
    let mut topic_ids: HashMap<String, String> = HashMap::new();

    let mut register = |topics: &mut EntityTable<Topic>, name: &str| -> String {
        if let Some(id) = topic_ids.get(name) {
            return id.clone();
        }
        let id = topic_slug(name);
        if !topics.contains(&id) {
            let order = topics.len() as u32;
            topics.insert(Topic {
                id: id.clone(),
                name: table.apply(name).into_owned(),
                order,
                sub_topic_ids: vec![],
                question_ids: vec![],
            });
        }
        topic_ids.insert(name.to_string(), id.clone());
        id
    };

    let topic_order = sheet.config.unwrap_or_default().topic_order;
    for name in &topic_order {
        register(&mut topics, name);
    }

    let mut table_questions: EntityTable<Question> = EntityTable::new();
    for remote in questions {
        if remote.id.is_empty() || table_questions.contains(&remote.id) {
            debug!(id = %remote.id, "skipping question without a unique id");
            continue;
        }
        let topic_id = register(&mut topics, &remote.topic);
        let detail = remote.question_id.unwrap_or_default();
        let title = non_empty(remote.title.as_ref())
            .or_else(|| non_empty(detail.name.as_ref()))
            .unwrap_or("Untitled Question");
        let problem_url = non_empty(detail.problem_url.as_ref())
            .or_else(|| non_empty(remote.resource.as_ref()))
            .unwrap_or("");

        if let Some(topic) = topics.get_mut(&topic_id) {
            topic.question_ids.push(remote.id.clone());
        }
        table_questions.insert(Question {
            title: table.apply(title).into_owned(),
            topic_id,
            sub_topic_id: None,
            difficulty: Difficulty::normalize(detail.difficulty.as_deref(), fallback),
            platform: non_empty(detail.platform.as_ref())
                .unwrap_or(DEFAULT_PLATFORM)
                .to_string(),
            problem_url: problem_url.to_string(),
            is_solved: false,
            id: remote.id,
        });
    }

    RemoteSheet {
        topics,
        questions: table_questions,
        sheet_info: Some(SheetInfo {
            name: sheet.name,
            description: sheet.description,
            banner: sheet.banner,
            followers: sheet.followers,
        }),
    }
}

/// Blocking HTTP client for `<base>/sheet/public/get-sheet-by-slug/<slug>`.
#[derive(Clone)]
pub struct HttpSheetSource {
    agent: ureq::Agent,
    base_url: String,
    table: SubstitutionTable,
    fallback: Difficulty,
}

impl HttpSheetSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build();
        Self {
            agent,
            base_url: base_url.into(),
            table: SubstitutionTable::default(),
            fallback: Difficulty::Medium,
        }
    }

    pub fn with_difficulty_fallback(mut self, fallback: Difficulty) -> Self {
        self.fallback = fallback;
        self
    }

    fn sheet_url(&self, slug: &str) -> String {
        format!(
            "{}/sheet/public/get-sheet-by-slug/{}",
            self.base_url.trim_end_matches('/'),
            slug
        )
    }
}

impl SheetSource for HttpSheetSource {
    fn fetch_sheet(&self, slug: &str) -> Result<RemoteSheet, FetchError> {
        let url = self.sheet_url(slug);
        debug!(%url, "fetching sheet");

        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => FetchError::Http {
                    status,
                    reason: response.status_text().to_string(),
                },
                ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        decode_sheet(&body, &self.table, self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET_RESPONSE: &str = r#"{
        "status": {"success": true, "message": "ok"},
        "data": {
            "sheet": {
                "name": "Striver SDE Sheet",
                "description": "Top coding questions",
                "banner": "https://example.com/banner.png",
                "followers": 1200,
                "config": {"topicOrder": ["Arrays", "Linked List", "Dynamic  Programming!"]}
            },
            "questions": [
                {"_id": "a1", "topic": "Arrays", "title": "Set Matrix Zeroes",
                 "questionId": {"difficulty": "Medium", "platform": "leetcode",
                                "problemUrl": "https://leetcode.com/problems/set-matrix-zeroes"}},
                {"_id": "a2", "topic": "Arrays",
                 "questionId": {"name": "PascalΓÇÖs Triangle", "difficulty": "basic"},
                 "resource": "https://example.com/pascal"},
                {"_id": "l1", "topic": "Linked List", "title": "Reverse",
                 "questionId": {"difficulty": "HARD"}},
                {"_id": "x1", "topic": "Bit Tricks", "questionId": {"difficulty": "insane"}},
                {"_id": "a1", "topic": "Arrays", "title": "Duplicate"}
            ]
        }
    }"#;

    fn decode(body: &str) -> Result<RemoteSheet, FetchError> {
        decode_sheet(body, &SubstitutionTable::default(), Difficulty::Medium)
    }

    mod slug_tests {
        use super::*;

        #[test]
        fn topic_slug_rules() {
            assert_eq!(topic_slug("Linked List"), "linked-list");
            assert_eq!(topic_slug("Dynamic  Programming!"), "dynamic-programming");
            assert_eq!(topic_slug("Stack & Queue"), "stack--queue");
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn topics_follow_topic_order() {
            let sheet = decode(SHEET_RESPONSE).unwrap();
            assert_eq!(
                sheet.topics.ids(),
                ["arrays", "linked-list", "dynamic-programming", "bit-tricks"]
            );
            let arrays = sheet.topics.get("arrays").unwrap();
            assert_eq!(arrays.question_ids, ["a1", "a2"]);
            assert_eq!(sheet.topics.get("bit-tricks").unwrap().order, 3);
        }

        #[test]
        fn question_fields_are_normalized() {
            let sheet = decode(SHEET_RESPONSE).unwrap();

            let pascal = sheet.questions.get("a2").unwrap();
            assert_eq!(pascal.title, "Pascal's Triangle");
            assert_eq!(pascal.difficulty, Difficulty::Easy);
            assert_eq!(pascal.problem_url, "https://example.com/pascal");
            assert_eq!(pascal.platform, DEFAULT_PLATFORM);
            assert_eq!(pascal.topic_id, "arrays");

            assert_eq!(sheet.questions.get("l1").unwrap().difficulty, Difficulty::Hard);

            let odd = sheet.questions.get("x1").unwrap();
            assert_eq!(odd.title, "Untitled Question");
            assert_eq!(odd.difficulty, Difficulty::Medium);
            assert_eq!(odd.problem_url, "");
        }

        #[test]
        fn duplicate_ids_keep_first() {
            let sheet = decode(SHEET_RESPONSE).unwrap();
            assert_eq!(sheet.questions.len(), 4);
            assert_eq!(sheet.questions.get("a1").unwrap().title, "Set Matrix Zeroes");
        }

        #[test]
        fn sheet_info_is_carried() {
            let sheet = decode(SHEET_RESPONSE).unwrap();
            let info = sheet.sheet_info.unwrap();
            assert_eq!(info.name, "Striver SDE Sheet");
            assert_eq!(info.followers, Some(1200));
        }

        #[test]
        fn fallback_difficulty_is_configurable() {
            let sheet =
                decode_sheet(SHEET_RESPONSE, &SubstitutionTable::default(), Difficulty::Hard)
                    .unwrap();
            assert_eq!(sheet.questions.get("x1").unwrap().difficulty, Difficulty::Hard);
        }

        #[test]
        fn decoded_sheet_is_internally_consistent() {
            let sheet = decode(SHEET_RESPONSE).unwrap();
            let store = crate::store::Store::new(crate::models::Dataset {
                topics: sheet.topics,
                sub_topics: EntityTable::new(),
                questions: sheet.questions,
            });
            assert!(store.integrity_violations().is_empty());
        }
    }

    mod envelope_tests {
        use super::*;

        #[test]
        fn unsuccessful_status_uses_server_message() {
            let body = r#"{"status":{"success":false,"message":"Sheet not found"}}"#;
            assert_eq!(
                decode(body).unwrap_err(),
                FetchError::Rejected("Sheet not found".to_string())
            );
        }

        #[test]
        fn unsuccessful_status_without_message() {
            let body = r#"{"status":{"success":false}}"#;
            assert_eq!(
                decode(body).unwrap_err().to_string(),
                "Failed to fetch sheet data"
            );
        }

        #[test]
        fn missing_status_is_rejected() {
            let body = r#"{"data":{"sheet":{"name":"x"},"questions":[]}}"#;
            assert!(matches!(decode(body), Err(FetchError::Rejected(_))));
        }

        #[test]
        fn malformed_body_is_decode_error() {
            assert!(matches!(decode("<html>"), Err(FetchError::Decode(_))));
        }

        #[test]
        fn success_without_data_is_decode_error() {
            let body = r#"{"status":{"success":true}}"#;
            assert!(matches!(decode(body), Err(FetchError::Decode(_))));
        }
    }

    #[test]
    fn sheet_url_joins_base_and_slug() {
        let source = HttpSheetSource::new("https://api.example.com/v1/", Duration::from_secs(1));
        assert_eq!(
            source.sheet_url("striver-sde-sheet"),
            "https://api.example.com/v1/sheet/public/get-sheet-by-slug/striver-sde-sheet"
        );
    }
}
