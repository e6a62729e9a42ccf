//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use docchat_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every name listed in `definition.variables` must be supplied; other
/// placeholders render as empty strings.
///
/// # Example
/// ```no_run
/// use docchat_prompt::{build_prompt, builtin_prompt, ANSWER_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("persona".to_string(), "a housing expert".to_string());
/// vars.insert("context".to_string(), "Deposits are due on signing.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("System prompt: {}", built.text);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let text = render_template(&definition.template, &variables)?;

    tracing::debug!("Rendered prompt '{}' ({} chars)", definition.id, text.len());

    Ok(BuiltPrompt::new(text, definition.id.clone(), variables))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(template: &str, variables: &[&str]) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            description: String::new(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            template: template.to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{input}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "a < b && \"c\"".to_string());

        let result = render_template("{{context}}", &vars).unwrap();
        assert_eq!(result, "a < b && \"c\"");
    }

    #[test]
    fn test_build_prompt_records_variables() {
        let def = definition("You are {{persona}}.", &["persona"]);
        let mut vars = HashMap::new();
        vars.insert("persona".to_string(), "a housing expert".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.text, "You are a housing expert.");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(
            built.metadata.resolved_variables.get("persona").map(String::as_str),
            Some("a housing expert")
        );
    }

    #[test]
    fn test_build_prompt_missing_required_variable() {
        let def = definition("{{persona}} {{context}}", &["persona", "context"]);
        let mut vars = HashMap::new();
        vars.insert("persona".to_string(), "x".to_string());

        let err = build_prompt(&def, vars).unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_render_template_optional_variable() {
        let vars = HashMap::new();
        // Placeholders not declared as required render empty
        let result = render_template("Question: {{missing}}", &vars).unwrap();
        assert_eq!(result, "Question: ");
    }
}
