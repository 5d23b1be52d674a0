//! Natural-language questions over a kind's snapshot.
//!
//! A question goes through three collaborators in turn: [`prompt`] builds the
//! text from the kind's effective mapping and the selected filters, [`llm`]
//! turns it into SQL, and [`executor`] runs that SQL against the snapshot.
//! The generated SQL travels back with the result; nothing is kept between
//! calls.

pub mod executor;
pub mod llm;
pub mod prompt;

pub use executor::execute_query;
pub use llm::{CompletionClient, OpenAiClient, extract_sql};
pub use prompt::{FilterSelection, build_prompt};

use crate::catalog::CatalogLayout;
use crate::error::{CatalogError, Result};
use crate::kind;
use polars::prelude::DataFrame;

/// A question, with the filter values picked for it.
#[derive(Debug, Clone, Default)]
pub struct Question {
    pub text: String,
    pub filters: Vec<FilterSelection>,
}

/// SQL produced for a question and what it returned.
#[derive(Debug, Clone)]
pub struct Answer {
    pub sql: String,
    pub result: DataFrame,
}

/// Prompt text for `question` about `kind`.
///
/// # Errors
///
/// Returns [`CatalogError::KindNotFound`] if the kind has no effective mapping.
pub fn prepare_prompt(layout: &CatalogLayout, kind: &str, question: &Question) -> Result<String> {
    let mapping = kind::load_effective_mapping(layout, kind)?;
    let description = kind::load_description(layout, kind)?;
    Ok(build_prompt(
        kind,
        description.as_deref(),
        &mapping,
        &question.filters,
        &question.text,
    ))
}

/// Ask the model for SQL and run it.
///
/// # Errors
///
/// Returns [`CatalogError::Completion`] if the model fails or its reply holds
/// no SQL, plus every error of [`prepare_prompt`] and [`execute_query`].
pub async fn ask<C: CompletionClient>(
    layout: &CatalogLayout,
    client: &C,
    kind: &str,
    question: &Question,
) -> Result<Answer> {
    let prompt = prepare_prompt(layout, kind, question)?;
    let reply = client.complete(&prompt).await?;

    let sql = extract_sql(&reply);
    if sql.trim().is_empty() {
        tracing::warn!("No SQL found in completion reply: {reply}");
        return Err(CatalogError::Completion(
            "reply did not contain a JSON object with a \"sql\" key".to_owned(),
        ));
    }
    tracing::info!("Generated SQL for '{kind}': {sql}");

    let result = execute_query(layout, kind, &sql)?;
    Ok(Answer { sql, result })
}
