//! Prompt builder for rendering answer templates.

use crate::types::{BuiltPrompt, PromptContext, PromptDefinition};
use agri_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Build a prompt from a definition and the answer context.
///
/// # Example
/// ```no_run
/// use agri_prompt::{build_prompt, default_answer_prompt, PromptContext};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = default_answer_prompt()?;
/// let ctx = PromptContext {
///     question: "What should I sow in June in Punjab?".to_string(),
///     ..Default::default()
/// };
/// let built = build_prompt(&def, &ctx)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, context: &PromptContext) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt {} with {} evidence snippets",
        definition.id,
        context.evidence.len()
    );

    let user = render_template(&definition.template, context)?;

    let system = match definition.system {
        Some(ref system) => Some(render_template(system, context)?),
        None => None,
    };

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        context.evidence.len(),
        context.language.clone(),
    ))
}

/// Render a Handlebars template.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Evidence is plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::default_answer_prompt;
    use crate::types::{EvidenceLine, PromptBehavior, PromptOutputSpec};

    fn simple_definition(template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior {
                tone: "practical".to_string(),
                style: "concise".to_string(),
            },
            system: None,
            template: template.to_string(),
            output: PromptOutputSpec {
                format: "markdown".to_string(),
            },
        }
    }

    fn sample_context() -> PromptContext {
        PromptContext {
            question: "When to sow wheat in Punjab?".to_string(),
            focus: Some("crop: wheat; state: punjab".to_string()),
            language: None,
            evidence: vec![
                EvidenceLine {
                    index: 1,
                    text: "Wheat sowing: Nov 1-15 & <late> Nov 25".to_string(),
                    source: "PAU package of practices".to_string(),
                },
                EvidenceLine {
                    index: 2,
                    text: "Seed rate 40 kg/acre".to_string(),
                    source: "ICAR".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_render_does_not_escape() {
        let def = simple_definition("{{#each evidence}}{{text}}|{{/each}}");
        let built = build_prompt(&def, &sample_context()).unwrap();
        assert_eq!(
            built.user,
            "Wheat sowing: Nov 1-15 & <late> Nov 25|Seed rate 40 kg/acre|"
        );
    }

    #[test]
    fn test_builtin_renders_evidence_and_question() {
        let def = default_answer_prompt().unwrap();
        let built = build_prompt(&def, &sample_context()).unwrap();

        assert!(built.user.contains("[1] Wheat sowing"));
        assert!(built.user.contains("(Source: ICAR)"));
        assert!(built.user.contains("When to sow wheat in Punjab?"));
        assert!(built.user.contains("crop: wheat; state: punjab"));
        assert!(!built.user.contains("Write the answer in"));
        assert_eq!(built.metadata.evidence_count, 2);
        assert!(built.system.is_some());
    }

    #[test]
    fn test_language_instruction() {
        let def = default_answer_prompt().unwrap();
        let mut ctx = sample_context();
        ctx.language = Some("Hindi".to_string());

        let built = build_prompt(&def, &ctx).unwrap();
        assert!(built.user.contains("Write the answer in Hindi."));
        assert_eq!(built.metadata.language.as_deref(), Some("Hindi"));
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let def = simple_definition("{{#each evidence}}unclosed");
        let result = build_prompt(&def, &sample_context());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
