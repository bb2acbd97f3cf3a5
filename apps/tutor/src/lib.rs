pub mod catalog;
pub mod config;
pub mod error;
pub mod explain;
pub mod feedback;
pub mod service;
pub mod store;

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use lesson_core::{Language, SessionState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::JsonCatalog;
use crate::config::TutorConfig;
use crate::service::{SubmitOutcome, SubmitRequest, TutorService};
use crate::store::{JsonFileStore, MemoryStore, ProfileStore, SessionStore};

/// Practice a lesson from the terminal.
#[derive(Parser, Debug)]
#[command(name = "lesson-tutor", version, about = "Interactive lesson tutor")]
pub struct Cli {
    /// Lesson language code (en, de, es, fr, ...)
    pub language: String,

    /// Lesson id, resolved under TUTOR_CONTENT_DIR/<language>/
    pub lesson_id: String,

    /// Learner id
    #[arg(default_value = "local")]
    pub user_id: String,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = TutorConfig::from_env()?;
    tracing::info!(content_dir = %config.content_dir.display(), "Loading lessons");

    let (sessions, profiles): (Arc<dyn SessionStore>, Arc<dyn ProfileStore>) = match &config.state_dir {
        Some(dir) => {
            tracing::info!(state_dir = %dir.display(), "Persisting progress");
            let store = Arc::new(JsonFileStore::new(dir.clone()));
            (store.clone(), store)
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };
    let service = TutorService::from_config(
        &config,
        Arc::new(JsonCatalog::new(config.content_dir.clone())),
        sessions,
        profiles,
    )?;

    let language = Language::from_code(&cli.language);
    let lesson = service.lesson(&language, &cli.lesson_id).await?;
    let session = service
        .restart_session(&cli.user_id, &language, &lesson.id)
        .await?;

    println!("{} ({} questions)", lesson.title, lesson.questions.len());
    let mut index = session.current_question_index;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let Some(question) = lesson.question(index) else {
            break;
        };
        println!("\n{}", question.prompt);

        let Some(line) = lines.next() else {
            break;
        };
        let answer = line?;

        let outcome = service
            .submit_answer(SubmitRequest {
                user_id: cli.user_id.clone(),
                language: language.clone(),
                lesson_id: lesson.id.clone(),
                answer,
                include_support: None,
            })
            .await?;

        match outcome {
            SubmitOutcome::Answered(response) => {
                println!("{}", response.feedback);
                if let Some(explanation) = &response.explanation {
                    println!("{}", explanation);
                }
                if response.state == SessionState::Complete {
                    break;
                }
                index = response.current_question_index;
            }
            SubmitOutcome::RestartRequired { reason, session } => {
                println!("Starting over: {}", reason);
                index = session.current_question_index;
            }
        }
    }

    let due = service.due_reviews(&cli.user_id, &language, 5).await?;
    if !due.is_empty() {
        println!("\nQueued for review:");
        for entry in due {
            println!("- {} ({})", entry.prompt, entry.expected_answer);
        }
    }

    Ok(())
}
