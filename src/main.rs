mod api;
mod config;
mod db;
mod error;
mod ingest;
mod logging;
mod models;
mod reconcile;
mod sanitize;
mod seed;
mod store;
#[cfg(test)]
mod testing;
mod tracker;
mod tui;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use api::HttpSheetSource;
use config::Config;
use error::AppError;
use models::{
    Difficulty, JsonOutput, NewQuestion, Question, QuestionPatch, Stats, SubTopicPatch, TopicPatch,
};
use sanitize::SubstitutionTable;
use tracker::Tracker;

#[derive(Parser)]
#[command(name = "qtrack")]
#[command(about = "Track progress through curated coding-practice question sheets")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Database path (overrides QTRACK_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database with the bundled sheet
    Init,

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Manage sub-topics
    #[command(subcommand)]
    Subtopic(SubTopicCommands),

    /// Manage questions
    #[command(subcommand)]
    Question(QuestionCommands),

    /// Show overall and per-difficulty progress
    Stats,

    /// Find topics and questions by name
    Search {
        /// Case-insensitive substring
        query: String,
    },

    /// Refresh questions from the remote sheet, keeping local progress
    Fetch {
        /// Sheet slug (overrides QTRACK_SHEET)
        #[arg(long, short)]
        sheet: Option<String>,
    },

    /// Discard saved progress and start over from the bundled sheet
    Reset,

    /// Convert a raw sheet export into a seed dataset
    Seed {
        /// Sheet export JSON
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// List all topics
    List,

    /// Show a topic with its sub-topics and questions
    Show {
        /// Topic ID
        id: String,
    },

    /// Add a new topic
    Add {
        /// Topic name
        name: String,
    },

    /// Rename a topic
    Rename {
        /// Topic ID
        id: String,

        /// New name
        name: String,
    },

    /// Delete a topic with everything in it
    Delete {
        /// Topic ID
        id: String,
    },

    /// Move a topic into another topic's position
    Move {
        /// Topic to move
        id: String,

        /// Topic whose position it takes
        target: String,
    },
}

#[derive(Subcommand)]
enum SubTopicCommands {
    /// Add a sub-topic to a topic
    Add {
        /// Parent topic ID
        topic: String,

        /// Sub-topic name
        name: String,
    },

    /// Rename a sub-topic
    Rename {
        /// Sub-topic ID
        id: String,

        /// New name
        name: String,
    },

    /// Delete a sub-topic, moving its questions to the parent topic
    Delete {
        /// Sub-topic ID
        id: String,
    },

    /// Move a sub-topic within its topic
    Move {
        /// Parent topic ID
        topic: String,

        /// Sub-topic to move
        id: String,

        /// Sub-topic whose position it takes
        target: String,
    },
}

#[derive(Subcommand)]
enum QuestionCommands {
    /// List a topic's questions
    List {
        /// Topic ID
        topic: String,

        /// Only titles containing this text
        #[arg(long, short)]
        query: Option<String>,
    },

    /// Add a question to a topic
    Add {
        /// Topic ID
        topic: String,

        /// Question title
        title: String,

        /// easy/medium/hard
        #[arg(long, short, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,

        /// Judge platform
        #[arg(long, short)]
        platform: Option<String>,

        /// Problem URL
        #[arg(long, short)]
        url: Option<String>,

        /// File under this sub-topic of the topic
        #[arg(long, short)]
        sub_topic: Option<String>,

        /// Mark as already solved
        #[arg(long)]
        solved: bool,
    },

    /// Edit question fields
    Edit {
        /// Question ID
        id: String,

        #[arg(long, short)]
        title: Option<String>,

        #[arg(long, short, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,

        #[arg(long, short)]
        platform: Option<String>,

        #[arg(long, short)]
        url: Option<String>,

        #[arg(long)]
        solved: Option<bool>,
    },

    /// Flip a question between solved and unsolved
    Toggle {
        /// Question ID
        id: String,
    },

    /// Delete a question
    Delete {
        /// Question ID
        id: String,
    },

    /// Move a question into another question's position
    Move {
        /// Container ID (topic, or sub-topic with --in-sub-topic)
        container: String,

        /// Question to move
        id: String,

        /// Question whose position it takes
        target: String,

        /// Treat the container as a sub-topic
        #[arg(long)]
        in_sub_topic: bool,
    },
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(s).ok_or_else(|| format!("invalid difficulty '{s}' (easy, medium, hard)"))
}

fn main() {
    let cli = Cli::parse();

    let log_file = matches!(cli.command, Commands::Tui).then(config::default_log_path);
    if let Err(e) = logging::init(cli.verbose, log_file.as_deref()) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_ok<T: Serialize>(data: T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

/// Reports a no-op on an unknown id the way every command does.
fn print_missing(json: bool, what: String) -> Result<(), serde_json::Error> {
    let message = AppError::NotFound(what).to_string();
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::err(message))?);
    } else {
        println!("{}.", capitalize(&message));
    }
    Ok(())
}

fn print_done(json: bool, message: String) -> Result<(), serde_json::Error> {
    if json {
        print_ok(())
    } else {
        println!("{}", message);
        Ok(())
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().with_db_path(cli.db.clone());
    let json = cli.json;

    let command = match cli.command {
        Commands::Seed { input, output } => {
            return run_seed(&config, &input, output.as_deref(), json);
        }
        command => command,
    };

    let mut tracker = Tracker::open(&config)?;

    match command {
        Commands::Init => {
            tracker.database().save_state(tracker.store())?;
            if json {
                print_ok(())?;
            } else {
                println!("Database initialized at: {}", config.db_path.display());
            }
        }

        Commands::Topic(topic_cmd) => run_topic(&mut tracker, topic_cmd, json)?,
        Commands::Subtopic(sub_cmd) => run_sub_topic(&mut tracker, sub_cmd, json)?,
        Commands::Question(question_cmd) => run_question(&mut tracker, question_cmd, json)?,

        Commands::Stats => {
            let store = tracker.store();
            let stats = store.stats();
            let last_saved = tracker.database().last_saved(db::STORAGE_KEY)?;
            if json {
                print_ok(stats_payload(&stats, last_saved))?;
            } else {
                println!("=== Progress ===");
                println!(
                    "Solved: {}/{} ({}%)",
                    stats.solved, stats.total, stats.progress
                );
                for difficulty in Difficulty::ALL {
                    let tally = stats.for_difficulty(difficulty);
                    println!(
                        "  {:<7} {}/{} ({}%)",
                        difficulty.as_str(),
                        tally.solved,
                        tally.total,
                        tally.percent()
                    );
                }
                if let Some(saved) = last_saved {
                    println!("Last saved: {}", saved.format("%Y-%m-%d %H:%M"));
                }
            }
        }

        Commands::Search { query } => {
            let store = tracker.store();
            let matches: Vec<_> = store
                .filtered_topics(&query)
                .into_iter()
                .map(|topic| (topic, store.questions_for_topic(&topic.id, &query)))
                .collect();

            if json {
                let data: Vec<_> = matches
                    .iter()
                    .map(|(topic, questions)| {
                        serde_json::json!({ "topic": topic, "questions": questions })
                    })
                    .collect();
                print_ok(data)?;
            } else if matches.is_empty() {
                println!("No matches for '{}'.", query);
            } else {
                for (topic, questions) in matches {
                    println!("{} ({})", topic.name, topic.id);
                    for question in questions {
                        println!("  {}", question_line(question));
                    }
                }
            }
        }

        Commands::Fetch { sheet } => {
            let slug = sheet.unwrap_or_else(|| config.sheet_slug.clone());
            let source = HttpSheetSource::new(&config.api_base_url, config.timeout)
                .with_difficulty_fallback(config.difficulty_fallback);

            if tracker.fetch_from_api(&source, &slug) {
                let store = tracker.store();
                let name = store.sheet_info().map(|s| s.name.as_str()).unwrap_or(&slug);
                if json {
                    print_ok(serde_json::json!({
                        "sheet": store.sheet_info(),
                        "topics": store.topics().len(),
                        "questions": store.questions().len(),
                    }))?;
                } else {
                    println!(
                        "Fetched '{}': {} topics, {} questions",
                        name,
                        store.topics().len(),
                        store.questions().len()
                    );
                }
            } else {
                let message = tracker
                    .store()
                    .error()
                    .unwrap_or("Fetch already in progress")
                    .to_string();
                if json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::err(message))?);
                } else {
                    return Err(message.into());
                }
            }
        }

        Commands::Tui => {
            let source = HttpSheetSource::new(&config.api_base_url, config.timeout)
                .with_difficulty_fallback(config.difficulty_fallback);
            tui::run(tracker, source, config.sheet_slug.clone())?;
        }

        Commands::Reset => {
            let removed = tracker.database().delete(db::STORAGE_KEY)?;
            if json {
                print_ok(serde_json::json!({ "removed": removed }))?;
            } else if removed {
                println!("Saved progress cleared.");
            } else {
                println!("Nothing saved yet.");
            }
        }

        Commands::Seed { .. } => unreachable!("seed runs before the database is opened"),
    }

    Ok(())
}

/// Sheet info and data source are session-only, so a fresh CLI process
/// never has them; `stats` reports only what survives a restart.
fn stats_payload(stats: &Stats, last_saved: Option<DateTime<Utc>>) -> serde_json::Value {
    serde_json::json!({
        "stats": stats,
        "lastSaved": last_saved,
    })
}

fn run_topic(
    tracker: &mut Tracker,
    cmd: TopicCommands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TopicCommands::List => {
            let store = tracker.store();
            if json {
                let data: Vec<_> = store
                    .topics()
                    .iter()
                    .map(|topic| {
                        serde_json::json!({
                            "id": topic.id,
                            "name": topic.name,
                            "subTopics": topic.sub_topic_ids.len(),
                            "progress": store.topic_progress(&topic.id),
                        })
                    })
                    .collect();
                print_ok(data)?;
            } else if store.topics().is_empty() {
                println!("No topics found.");
            } else {
                println!("{:<28} {:<32} {:>10} {:>5}", "ID", "NAME", "SOLVED", "%");
                println!("{}", "-".repeat(78));
                for topic in store.topics().iter() {
                    let progress = store.topic_progress(&topic.id);
                    println!(
                        "{:<28} {:<32} {:>10} {:>4}%",
                        truncate(&topic.id, 26),
                        truncate(&topic.name, 30),
                        format!("{}/{}", progress.solved, progress.total),
                        progress.percent
                    );
                }
            }
        }

        TopicCommands::Show { id } => {
            let store = tracker.store();
            let Some(topic) = store.topics().get(&id) else {
                return Ok(print_missing(json, format!("topic '{}'", id))?);
            };
            let progress = store.topic_progress(&id);
            let sub_topics = store.sub_topics_for_topic(&id);
            let questions = store.questions_for_topic(&id, "");

            if json {
                let subs: Vec<_> = sub_topics
                    .iter()
                    .map(|sub| {
                        serde_json::json!({
                            "subTopic": sub,
                            "progress": store.sub_topic_progress(&sub.id),
                            "questions": store.questions_for_sub_topic(&sub.id, ""),
                        })
                    })
                    .collect();
                print_ok(serde_json::json!({
                    "topic": topic,
                    "progress": progress,
                    "subTopics": subs,
                    "questions": questions,
                }))?;
            } else {
                println!("Topic: {}", topic.name);
                println!("ID: {}", topic.id);
                println!(
                    "Progress: {}/{} ({}%)",
                    progress.solved, progress.total, progress.percent
                );
                for sub in sub_topics {
                    let sub_progress = store.sub_topic_progress(&sub.id);
                    println!();
                    println!(
                        "--- {} ({}) {}/{} ---",
                        sub.name, sub.id, sub_progress.solved, sub_progress.total
                    );
                    for question in store.questions_for_sub_topic(&sub.id, "") {
                        println!("  {}", question_line(question));
                    }
                }
                if !questions.is_empty() {
                    println!();
                    println!("--- Questions ---");
                    for question in questions {
                        println!("  {}", question_line(question));
                    }
                }
            }
        }

        TopicCommands::Add { name } => {
            let id = tracker.update(|store| store.add_topic(&name));
            if json {
                print_ok(serde_json::json!({ "id": id, "name": name }))?;
            } else {
                println!("Added topic '{}' with ID: {}", name, id);
            }
        }

        TopicCommands::Rename { id, name } => {
            if tracker.update(|store| store.update_topic(&id, TopicPatch::rename(name.as_str()))) {
                print_done(json, format!("Topic {} renamed to '{}'.", id, name))?;
            } else {
                print_missing(json, format!("topic '{}'", id))?;
            }
        }

        TopicCommands::Delete { id } => {
            if tracker.update(|store| store.delete_topic(&id)) {
                print_done(json, format!("Topic {} deleted.", id))?;
            } else {
                print_missing(json, format!("topic '{}'", id))?;
            }
        }

        TopicCommands::Move { id, target } => {
            if tracker.update(|store| store.reorder_topics(&id, &target)) {
                print_done(json, format!("Moved topic {} to the position of {}.", id, target))?;
            } else {
                print_missing(json, format!("topic pair '{}'/'{}'", id, target))?;
            }
        }
    }
    Ok(())
}

fn run_sub_topic(
    tracker: &mut Tracker,
    cmd: SubTopicCommands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        SubTopicCommands::Add { topic, name } => {
            match tracker.update(|store| store.add_sub_topic(&topic, &name)) {
                Some(id) if json => print_ok(serde_json::json!({ "id": id, "name": name }))?,
                Some(id) => println!("Added sub-topic '{}' with ID: {}", name, id),
                None => print_missing(json, format!("topic '{}'", topic))?,
            }
        }

        SubTopicCommands::Rename { id, name } => {
            if tracker.update(|store| store.update_sub_topic(&id, SubTopicPatch::rename(name.as_str()))) {
                print_done(json, format!("Sub-topic {} renamed to '{}'.", id, name))?;
            } else {
                print_missing(json, format!("sub-topic '{}'", id))?;
            }
        }

        SubTopicCommands::Delete { id } => {
            if tracker.update(|store| store.delete_sub_topic(&id)) {
                print_done(json, format!("Sub-topic {} deleted.", id))?;
            } else {
                print_missing(json, format!("sub-topic '{}'", id))?;
            }
        }

        SubTopicCommands::Move { topic, id, target } => {
            if tracker.update(|store| store.reorder_sub_topics(&topic, &id, &target)) {
                print_done(json, format!("Moved sub-topic {} to the position of {}.", id, target))?;
            } else {
                print_missing(json, format!("sub-topic pair '{}'/'{}' in '{}'", id, target, topic))?;
            }
        }
    }
    Ok(())
}

fn run_question(
    tracker: &mut Tracker,
    cmd: QuestionCommands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        QuestionCommands::List { topic, query } => {
            let store = tracker.store();
            if !store.topics().contains(&topic) {
                return Ok(print_missing(json, format!("topic '{}'", topic))?);
            }
            let questions = store.questions_for_topic(&topic, query.as_deref().unwrap_or(""));
            if json {
                print_ok(&questions)?;
            } else if questions.is_empty() {
                println!("No questions found.");
            } else {
                for question in questions {
                    println!("{}", question_line(question));
                }
            }
        }

        QuestionCommands::Add {
            topic,
            title,
            difficulty,
            platform,
            url,
            sub_topic,
            solved,
        } => {
            let mut data = NewQuestion::new(title.as_str()).solved(solved);
            if let Some(difficulty) = difficulty {
                data = data.difficulty(difficulty);
            }
            if let Some(platform) = platform {
                data = data.platform(platform);
            }
            if let Some(url) = url {
                data = data.problem_url(url);
            }
            if let Some(sub_topic) = sub_topic {
                data = data.in_sub_topic(sub_topic);
            }

            match tracker.update(|store| store.add_question(&topic, data)) {
                Some(id) if json => print_ok(serde_json::json!({ "id": id, "title": title }))?,
                Some(id) => println!("Added question '{}' with ID: {}", title, id),
                None => print_missing(json, format!("topic '{}'", topic))?,
            }
        }

        QuestionCommands::Edit {
            id,
            title,
            difficulty,
            platform,
            url,
            solved,
        } => {
            let patch = QuestionPatch {
                title,
                difficulty,
                platform,
                problem_url: url,
                is_solved: solved,
            };
            if patch.is_empty() {
                print_done(json, "Nothing to update.".to_string())?;
            } else if !tracker.store().questions().contains(&id) {
                print_missing(json, format!("question '{}'", id))?;
            } else {
                tracker.update(|store| store.update_question(&id, patch));
                print_done(json, format!("Question {} updated.", id))?;
            }
        }

        QuestionCommands::Toggle { id } => {
            if tracker.update(|store| store.toggle_question_solved(&id)) {
                let solved = tracker
                    .store()
                    .questions()
                    .get(&id)
                    .is_some_and(|q| q.is_solved);
                if json {
                    print_ok(serde_json::json!({ "id": id, "isSolved": solved }))?;
                } else {
                    println!(
                        "Question {} marked {}.",
                        id,
                        if solved { "solved" } else { "unsolved" }
                    );
                }
            } else {
                print_missing(json, format!("question '{}'", id))?;
            }
        }

        QuestionCommands::Delete { id } => {
            if tracker.update(|store| store.delete_question(&id)) {
                print_done(json, format!("Question {} deleted.", id))?;
            } else {
                print_missing(json, format!("question '{}'", id))?;
            }
        }

        QuestionCommands::Move {
            container,
            id,
            target,
            in_sub_topic,
        } => {
            let moved = tracker.update(|store| {
                if in_sub_topic {
                    store.reorder_sub_topic_questions(&container, &id, &target)
                } else {
                    store.reorder_questions(&container, &id, &target)
                }
            });
            if moved {
                print_done(json, format!("Moved question {} to the position of {}.", id, target))?;
            } else {
                print_missing(json, format!("question pair '{}'/'{}' in '{}'", id, target, container))?;
            }
        }
    }
    Ok(())
}

fn run_seed(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(input).map_err(AppError::from)?;
    let document: ingest::SheetDocument = serde_json::from_str(&raw).map_err(AppError::from)?;
    let dataset = ingest::ingest_sheet(
        &document,
        &SubstitutionTable::default(),
        config.difficulty_fallback,
    );

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&dataset)?)?;
            if json {
                print_ok(serde_json::json!({
                    "topics": dataset.topics.len(),
                    "subTopics": dataset.sub_topics.len(),
                    "questions": dataset.questions.len(),
                }))?;
            } else {
                println!(
                    "Wrote {} topics, {} sub-topics, {} questions to {}",
                    dataset.topics.len(),
                    dataset.sub_topics.len(),
                    dataset.questions.len(),
                    path.display()
                );
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&dataset)?),
    }
    Ok(())
}

fn question_line(question: &Question) -> String {
    format!(
        "[{}] {:<44} {:<6} {:<12} {}",
        if question.is_solved { "x" } else { " " },
        truncate(&question.title, 42),
        question.difficulty.as_str(),
        question.platform,
        question.id
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
