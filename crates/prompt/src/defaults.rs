//! Built-in prompts and few-shot examples.
//!
//! A workspace file `.docchat/prompts/<id>.yml` replaces the built-in
//! definition with the same id.

use crate::types::{FewShotExample, PromptDefinition};

pub const REWRITE_PROMPT_ID: &str = "rag.rewrite";
pub const CONTEXTUALIZE_PROMPT_ID: &str = "rag.contextualize";
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

const REWRITE_TEMPLATE: &str = "\
You rewrite user questions about the indexed documents using the dictionary below.
Apply a rule only when it matches the question. Do not answer the question.
If no rule applies, return the question exactly as it was given.
Reply with the question only.

Dictionary:
{{dictionary}}";

const CONTEXTUALIZE_TEMPLATE: &str = "\
Given a chat history and the latest user question which might reference context in the chat history, \
formulate a standalone question which can be understood without the chat history. \
Do NOT answer the question, just reformulate it if needed and otherwise return it as is.";

const ANSWER_TEMPLATE: &str = "\
You are {{persona}}. Answer the user's questions about the documents.
Use only the documents provided below to answer.
If the documents do not contain the answer, say plainly that you cannot answer from the available documents.
Keep every answer to 2-3 sentences.

{{context}}";

/// Built-in definition for `id`, if one exists.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, description, variables, template) = match id {
        REWRITE_PROMPT_ID => (
            "Question Rewriter",
            "Normalizes user wording with dictionary rules without answering.",
            vec!["dictionary"],
            REWRITE_TEMPLATE,
        ),
        CONTEXTUALIZE_PROMPT_ID => (
            "Standalone Question",
            "Turns a follow-up question into one that stands without the chat history.",
            vec![],
            CONTEXTUALIZE_TEMPLATE,
        ),
        ANSWER_PROMPT_ID => (
            "Grounded Answer",
            "Answers from retrieved document excerpts in 2-3 sentences.",
            vec!["persona", "context"],
            ANSWER_TEMPLATE,
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "docchat".to_string(),
        description: description.to_string(),
        variables: variables.into_iter().map(str::to_string).collect(),
        template: template.to_string(),
    })
}

/// Few-shot pairs used when the workspace defines none.
pub fn default_examples() -> Vec<FewShotExample> {
    vec![
        FewShotExample {
            input: "Which documents do I need to submit with my application?".to_string(),
            answer: "You need a copy of your resident registration, proof of income and the \
                     signed application form. All documents must have been issued within the \
                     last three months."
                .to_string(),
        },
        FewShotExample {
            input: "Can I apply if I already own a house?".to_string(),
            answer: "The documents do not say whether current homeowners are eligible, so I \
                     cannot answer that from the available documents. Please check the official \
                     notice or contact the administrator."
                .to_string(),
        },
    ]
}
