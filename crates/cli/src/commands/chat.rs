//! Chat command handler.
//!
//! Interactive loop over stdin. One session carries signals across turns.

use agri_core::{config::AppConfig, AppResult};
use agri_knowledge::{Engine, QueryRequest, SessionContext};
use clap::Args;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question-and-answer session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Answer language (e.g. "hi", "Punjabi")
    #[arg(short, long)]
    pub language: Option<String>,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let engine = Engine::open(config).await?;
        let mut session = SessionContext::new();
        tracing::debug!("Chat session {}", session.id);

        println!("Ask about crops, sowing, prices, rainfall or schemes. Type 'exit' to quit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if matches!(question, "exit" | "quit") {
                break;
            }

            let mut request = QueryRequest::new(question);
            if let Some(ref language) = self.language {
                request = request.with_language(language.clone());
            }

            let start = Instant::now();
            match engine.answer(&request, &mut session).await {
                Ok(outcome) => {
                    println!("{}", outcome.response.text());
                    println!("({:.2}s, {})", start.elapsed().as_secs_f64(), outcome.decision);
                }
                Err(e) => {
                    tracing::error!("Query failed: {}", e);
                    println!("Error: {}", e);
                }
            }
        }

        Ok(())
    }
}
