//! Answer synthesis over an LLM client, with a deterministic fallback.

use agri_core::{AppError, AppResult};
use agri_llm::{LlmClient, LlmRequest};
use agri_prompt::{build_prompt, EvidenceLine, PromptContext, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;

use crate::evidence::Evidence;
use crate::types::QuerySignals;

const FALLBACK_INTRO: &str =
    "I couldn't generate a written answer right now. Here are the relevant sources:";

/// Generation parameters for the gateway.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Turns evidence into an answer. Never fails: errors become the fallback answer.
#[derive(Clone)]
pub struct AnswerGateway {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: SynthesisSettings,
}

impl AnswerGateway {
    pub fn new(client: Arc<dyn LlmClient>, prompt: PromptDefinition, settings: SynthesisSettings) -> Self {
        Self {
            client,
            prompt,
            settings,
        }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        signals: &QuerySignals,
        evidence: &[Evidence],
        language: Option<&str>,
    ) -> String {
        match self.generate(question, signals, evidence, language).await {
            Ok(text) => ensure_sources(&text, evidence),
            Err(e) => {
                tracing::warn!("Answer synthesis failed, using sources-only answer: {}", e);
                fallback_answer(evidence)
            }
        }
    }

    async fn generate(
        &self,
        question: &str,
        signals: &QuerySignals,
        evidence: &[Evidence],
        language: Option<&str>,
    ) -> AppResult<String> {
        let context = PromptContext {
            question: question.to_string(),
            focus: signals.focus_line(),
            language: language.map(String::from),
            evidence: evidence
                .iter()
                .enumerate()
                .map(|(i, e)| EvidenceLine {
                    index: i + 1,
                    text: e.snippet.clone(),
                    source: e.source.clone(),
                })
                .collect(),
        };
        let prompt = build_prompt(&self.prompt, &context)?;

        let mut request = LlmRequest::new(prompt.user, &self.settings.model)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Calling {} with {} evidence items",
            self.client.provider_name(),
            prompt.metadata.evidence_count
        );

        let response = tokio::time::timeout(self.settings.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Llm(format!(
                    "synthesis timed out after {}s",
                    self.settings.timeout.as_secs()
                ))
            })??;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(AppError::Llm("model returned an empty answer".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Evidence sources in first-seen order without repeats.
pub fn unique_sources(evidence: &[Evidence]) -> Vec<&str> {
    let mut sources: Vec<&str> = Vec::new();
    for e in evidence {
        if !sources.contains(&e.source.as_str()) {
            sources.push(&e.source);
        }
    }
    sources
}

fn sources_block(evidence: &[Evidence]) -> String {
    let lines: Vec<String> = unique_sources(evidence)
        .into_iter()
        .map(|s| format!("- {}", s))
        .collect();
    format!("Sources:\n{}", lines.join("\n"))
}

/// Append a sources list unless the answer already has one.
pub fn ensure_sources(answer: &str, evidence: &[Evidence]) -> String {
    if answer.contains("Sources") || evidence.is_empty() {
        answer.to_string()
    } else {
        format!("{}\n\n{}", answer, sources_block(evidence))
    }
}

/// Sources-only answer used when the model cannot be reached.
pub fn fallback_answer(evidence: &[Evidence]) -> String {
    format!("{}\n\n{}", FALLBACK_INTRO, sources_block(evidence))
}
