//! Prompt system for Agri Advisor.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, overridable per workspace
//! - A built-in grounded answer prompt
//! - Handlebars template rendering over evidence and query focus

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{default_answer_prompt, ANSWER_PROMPT_ID};
pub use loader::{load_prompt, load_prompt_or_default};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, EvidenceLine, PromptBehavior, PromptContext,
    PromptDefinition, PromptOutputSpec,
};
