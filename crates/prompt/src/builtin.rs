//! Built-in prompt definitions.

use crate::types::PromptDefinition;
use agri_core::{AppError, AppResult};

/// Identifier of the grounded answer prompt.
pub const ANSWER_PROMPT_ID: &str = "agri.answer.grounded";

const ANSWER_PROMPT_YAML: &str = r#"
id: agri.answer.grounded
title: Grounded agriculture answer
apiVersion: "1.0"
createdBy: agri-advisor
behavior:
  tone: practical
  style: concise
system: |
  You are an agriculture assistant for Indian farmers.
  Answer ONLY from the evidence you are given and never state a claim you cannot ground in it.
template: |
  POLICY
  - Answer ONLY using EVIDENCE below and cite sources inline.
  - Be concise and actionable: sowing window, varieties, seed rate, key cautions and a simple next step where the evidence has them.
  - If you cannot ground a claim, do NOT state it.
  {{#if language}}
  - Write the answer in {{language}}.
  {{/if}}

  {{#if focus}}
  FOCUS
  {{focus}}

  {{/if}}
  EVIDENCE
  {{#each evidence}}
  [{{index}}] {{text}}
  (Source: {{source}})
  ---
  {{/each}}

  USER QUESTION
  {{question}}

  Now produce:
  1) A brief recommendation tailored to the location and time in the question
  2) Bullet points with specifics (dates, varieties, seed rates, prices, amounts)
  3) A 'Sources' list with the sources used
output:
  format: markdown
"#;

/// The built-in grounded answer prompt.
pub fn default_answer_prompt() -> AppResult<PromptDefinition> {
    serde_yaml::from_str(ANSWER_PROMPT_YAML)
        .map_err(|e| AppError::Prompt(format!("Built-in prompt is invalid: {}", e)))
}
