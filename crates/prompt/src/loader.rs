//! Prompt loader for YAML prompt definitions and few-shot examples.

use crate::defaults::{builtin_prompt, default_examples};
use crate::types::{ExampleSet, FewShotExample, PromptDefinition};
use docchat_core::config::STATE_DIR;
use docchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

const EXAMPLES_FILE: &str = "examples.yml";

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.docchat/prompts/`.
///
/// # Example
/// ```no_run
/// use docchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}'",
            prompt_file, definition.id
        )));
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load a workspace override for `prompt_id`, falling back to the built-in.
pub fn load_prompt_or_builtin(
    workspace_path: &Path,
    prompt_id: &str,
) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if override_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    builtin_prompt(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

/// Load few-shot examples from `.docchat/prompts/examples.yml`, or the
/// built-in set when the file is absent.
pub fn load_examples(workspace_path: &Path) -> AppResult<Vec<FewShotExample>> {
    let path = prompts_dir(workspace_path).join(EXAMPLES_FILE);

    if !path.exists() {
        return Ok(default_examples());
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        AppError::Prompt(format!("Failed to read examples file {:?}: {}", path, e))
    })?;

    let set: ExampleSet = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse examples YAML {:?}: {}", path, e))
    })?;

    if let Some(blank) = set
        .examples
        .iter()
        .position(|e| e.input.trim().is_empty() || e.answer.trim().is_empty())
    {
        return Err(AppError::Prompt(format!(
            "Example {} in {:?} has an empty input or answer",
            blank + 1,
            path
        )));
    }

    tracing::debug!("Loaded {} few-shot examples from {:?}", set.examples.len(), path);

    Ok(set.examples)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::ANSWER_PROMPT_ID;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let dir = prompts_dir(dir);
        fs::create_dir_all(&dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Custom Prompt"
apiVersion: "1.0"
createdBy: test
variables: [persona, context]
template: "You are {{{{persona}}}}. Excerpts:\n{{{{context}}}}"
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.answer", true);

        let prompt = load_prompt(temp_dir.path(), "rag.answer").unwrap();
        assert_eq!(prompt.id, "rag.answer");
        assert_eq!(prompt.title, "Custom Prompt");
        assert!(prompt.template.contains("{{persona}}"));
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_id_must_match_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let file = write_prompt(temp_dir.path(), "rag.answer", true);
        fs::rename(&file, file.with_file_name("rag.other.yml")).unwrap();
        assert!(load_prompt(temp_dir.path(), "rag.other").is_err());
    }

    #[test]
    fn test_override_wins_over_builtin() {
        let temp_dir = TempDir::new().unwrap();

        let builtin = load_prompt_or_builtin(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(builtin.created_by, "docchat");

        write_prompt(temp_dir.path(), ANSWER_PROMPT_ID, true);
        let custom = load_prompt_or_builtin(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(custom.title, "Custom Prompt");

        assert!(load_prompt_or_builtin(temp_dir.path(), "rag.unknown").is_err());
    }

    #[test]
    fn test_load_examples() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(load_examples(temp_dir.path()).unwrap(), default_examples());

        let dir = prompts_dir(temp_dir.path());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(EXAMPLES_FILE),
            "examples:\n  - input: \"Who may apply?\"\n    answer: \"Adult residents may apply.\"\n",
        )
        .unwrap();

        let examples = load_examples(temp_dir.path()).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].input, "Who may apply?");
    }

    #[test]
    fn test_load_examples_rejects_blank_answer() {
        let temp_dir = TempDir::new().unwrap();
        let dir = prompts_dir(temp_dir.path());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(EXAMPLES_FILE),
            "examples:\n  - input: \"Who may apply?\"\n    answer: \"  \"\n",
        )
        .unwrap();

        assert!(load_examples(temp_dir.path()).is_err());
    }
}
