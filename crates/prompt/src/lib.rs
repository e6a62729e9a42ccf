//! Prompt system for docchat.
//!
//! - YAML prompt definitions with handlebars templates
//! - Built-in prompts for question rewriting, contextualization and answering
//! - Workspace overrides from `.docchat/prompts/`
//! - Few-shot answer examples

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use defaults::{
    builtin_prompt, default_examples, ANSWER_PROMPT_ID, CONTEXTUALIZE_PROMPT_ID, REWRITE_PROMPT_ID,
};
pub use loader::{load_examples, load_prompt, load_prompt_or_builtin};
pub use types::{BuiltPrompt, BuiltPromptMetadata, FewShotExample, PromptDefinition};
