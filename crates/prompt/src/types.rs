//! Prompt types for Agri Advisor.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PromptBehavior,

    /// Optional system instruction sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "practical", "formal")
    pub tone: String,

    /// Style (e.g., "concise", "detailed")
    pub style: String,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "markdown")
    pub format: String,
}

/// One evidence snippet as the template sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceLine {
    /// 1-based position in the evidence list
    pub index: usize,
    pub text: String,
    pub source: String,
}

/// Variables available to answer templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptContext {
    /// The user's question as typed
    pub question: String,

    /// Human-readable focus line ("crop: wheat; state: punjab; month: nov")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,

    /// Requested answer language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    pub evidence: Vec<EvidenceLine>,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Evidence snippets rendered into the prompt
    #[serde(rename = "evidenceCount")]
    pub evidence_count: usize,

    /// Answer language, if one was requested
    #[serde(rename = "language", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        evidence_count: usize,
        language: Option<String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                evidence_count,
                language,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: agri.answer.short
title: Short answer
apiVersion: "1.0"
createdBy: agronomy-team
behavior:
  tone: practical
  style: concise
template: "{{question}}"
output:
  format: markdown
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "agri.answer.short");
        assert_eq!(def.behavior.tone, "practical");
        assert!(def.system.is_none());
    }

    #[test]
    fn test_context_skips_empty_optionals() {
        let ctx = PromptContext {
            question: "q".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&ctx).unwrap();
        assert!(value.get("focus").is_none());
        assert!(value.get("language").is_none());
        assert_eq!(value["evidence"].as_array().map(|a| a.len()), Some(0));
    }
}
