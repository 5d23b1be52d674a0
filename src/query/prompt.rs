//! Prompt text for SQL generation.

use crate::kind::EffectiveMapping;

const INSTRUCTION: &str = "You are a SQL generation bot. Your ONLY output must be a single JSON \
object with a key named \"sql\". Do not add any other text, explanation, or markdown formatting.";

const TABLE_HINT: &str = "Your query will be executed against a table named 'data'. Please write \
queries starting with SELECT and referencing 'data' in the FROM clause.";

/// Values picked for one filterable column.
pub type FilterSelection = (String, Vec<String>);

/// Build the completion prompt for a question about `kind`.
///
/// Sections are separated by blank lines; the description, schema and filter
/// sections are left out when empty.
pub fn build_prompt(
    kind: &str,
    description: Option<&str>,
    mapping: &EffectiveMapping,
    filters: &[FilterSelection],
    question: &str,
) -> String {
    let mut parts = vec![
        INSTRUCTION.to_owned(),
        TABLE_HINT.to_owned(),
        format!("Dataset: {kind}"),
    ];

    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        parts.push(format!("\nDescription:\n{description}"));
    }

    if !mapping.is_empty() {
        let schema = mapping
            .records()
            .iter()
            .map(|r| {
                format!(
                    "- {} (source column: {}): {}",
                    r.storage_name(),
                    r.original_name,
                    r.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nSchema:\n{schema}"));
    }

    if !filters.is_empty() {
        let lines = filters
            .iter()
            .map(|(column, values)| format!("- {column}: {}", values.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nSelected Filters:\n{lines}"));
    }

    parts.push(format!("\nQuestion:\n{question}"));
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{FormatHint, MappingRecord};

    #[test]
    fn test_prompt_sections() -> crate::error::Result<()> {
        let mut rec = MappingRecord::sample_only("a", FormatHint::String);
        rec.canonical_name = "store_id".to_owned();
        rec.description = "Store identifier".to_owned();
        let mapping = EffectiveMapping::new(vec![rec])?;
        let filters = vec![(
            "store_id".to_owned(),
            vec!["store1".to_owned(), "store2".to_owned()],
        )];

        let prompt = build_prompt(
            "sales",
            Some("Weekly sales."),
            &mapping,
            &filters,
            "Total units?",
        );

        assert!(prompt.starts_with(INSTRUCTION));
        assert!(prompt.contains("Dataset: sales"));
        assert!(prompt.contains("\nDescription:\nWeekly sales."));
        assert!(prompt.contains("- store_id (source column: a): Store identifier"));
        assert!(prompt.contains("\nSelected Filters:\n- store_id: store1, store2"));
        assert!(prompt.ends_with("\nQuestion:\nTotal units?"));
        Ok(())
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let prompt = build_prompt("k", None, &EffectiveMapping::default(), &[], "q");
        assert!(!prompt.contains("Description:"));
        assert!(!prompt.contains("Schema:"));
        assert!(!prompt.contains("Selected Filters:"));
    }
}
