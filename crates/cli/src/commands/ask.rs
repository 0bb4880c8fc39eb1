//! Ask command handler.
//!
//! Answers one question. A session file carries the merged signals between
//! invocations so follow-ups like "in November" keep their context.

use agri_core::{config::AppConfig, AppError, AppResult};
use agri_knowledge::{Engine, QueryRequest, QuerySignals, SessionContext};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// File holding the previous turn's signals (created if missing)
    #[arg(short, long)]
    pub session: Option<PathBuf>,

    /// Answer language (e.g. "hi", "Punjabi")
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output the wire response as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let prior = match self.session {
            Some(ref path) => read_session(path).map_err(|e| AppError::Other(format!("{:#}", e)))?,
            None => None,
        };
        let mut session = SessionContext::with_signals(prior);

        let engine = Engine::open(config).await?;

        let mut request = QueryRequest::new(self.question.clone());
        if let Some(ref language) = self.language {
            request = request.with_language(language.clone());
        }

        let outcome = engine.answer(&request, &mut session).await?;
        tracing::info!("Decision: {}", outcome.decision);

        if let Some(ref path) = self.session {
            write_session(path, session.last.as_ref())
                .map_err(|e| AppError::Other(format!("{:#}", e)))?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome.response)?);
        } else {
            println!("{}", outcome.response.text());
        }

        Ok(())
    }
}

/// Signals persisted by a previous turn. A missing file starts a new conversation.
fn read_session(path: &Path) -> anyhow::Result<Option<QuerySignals>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file {:?}", path))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let signals = serde_json::from_str(&contents)
        .with_context(|| format!("Session file {:?} is not valid JSON signals", path))?;
    Ok(Some(signals))
}

fn write_session(path: &Path, signals: Option<&QuerySignals>) -> anyhow::Result<()> {
    let Some(signals) = signals else {
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(signals)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write session file {:?}", path))?;
    tracing::debug!("Saved session signals to {:?}", path);
    Ok(())
}
