//! Prompt templates and `{placeholder}` rendering.

use crate::index::OntologyIndex;
use crate::models::EntityKind;

/// Longest source text sent for extraction, in characters.
pub const MAX_EXTRACT_CHARS: usize = 5000;

/// Most entities listed per kind in a fill prompt.
pub const MAX_CONTEXT_ENTITIES: usize = 50;

const NONE: &str = "None";
const EMPTY: &str = "Empty";

pub const CONCEPT_FILL_TEMPLATE: &str = "\
# Task: fill in an ontology concept

Fill in the concept **{concept_name}** ({concept_id}).
Write all content in the language with code `{language}`.

## Additional context

{additional_context}

## Existing concepts

{concepts_data}

## Existing problems

{problems_data}

## Existing methods

{methods_data}

## Existing systems

{systems_data}

## Existing artifacts

{artifacts_data}

## Instructions

1. Definition: 2-3 sentences saying what the concept is.
2. Purpose: why it exists and where it applies.
3. meta_meta: one of {meta_types}.
4. Examples: 2-3 short usage examples separated by `;`.
5. Relations: IDs of existing entities from the lists above that this \
concept relates to, separated by `;`, or `-` if none.

## Response format

Reply with a single Markdown table and nothing else:

| id | name | definition | purpose | meta_meta | examples | relations |
|----|------|------------|---------|-----------|----------|-----------|
| {concept_id} | {concept_name} | ... | ... | ... | Example 1; Example 2 | C_2; P_1 |
";

pub const CONTEXT_EXTRACT_TEMPLATE: &str = "\
# Task: extract concepts from text

Analyze the text below and extract its **key concepts**.
Write all content in the language with code `{language}`.

## Text

```
{text}
```

## Concepts already in the ontology

{existing_concepts}

## Instructions

1. Find 3-7 key concepts in the text.
2. For each give a short name (1-3 words), a definition (2-3 sentences), \
its purpose, a type ({meta_types}) and 2-3 usage examples.
3. Do **not** repeat concepts already in the ontology.
4. Prefer concepts that recur or are central to the text.

## Response format

Reply with a single Markdown table and nothing else:

| name | definition | purpose | meta_meta | examples |
|------|------------|---------|-----------|----------|
| Concept 1 | Definition... | Purpose... | characteristic | Example 1; Example 2 |
";

/// Replace each `{key}` in `template` with its value. Unknown placeholders
/// are left as they are.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{}}}", key);
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, value);
        }
    }
    result
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() { default } else { value }
}

fn meta_types() -> String {
    crate::models::MetaMetaType::all()
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `ID_name` entries of one kind joined by `; `, capped.
pub fn kind_listing(index: &OntologyIndex, kind: EntityKind) -> String {
    index
        .by_kind(kind)
        .iter()
        .take(MAX_CONTEXT_ENTITIES)
        .map(|e| format!("{}_{}", e.id, e.name))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Prompt asking the model to fill in one concept.
pub fn concept_fill(
    index: &OntologyIndex,
    concept_id: &str,
    concept_name: &str,
    additional_context: &str,
    language: &str,
) -> String {
    let concepts = kind_listing(index, EntityKind::Concept);
    let problems = kind_listing(index, EntityKind::Problem);
    let methods = kind_listing(index, EntityKind::Method);
    let systems = kind_listing(index, EntityKind::System);
    let artifacts = kind_listing(index, EntityKind::Artifact);
    let meta_types = meta_types();
    render(
        CONCEPT_FILL_TEMPLATE,
        &[
            ("concept_id", concept_id),
            ("concept_name", concept_name),
            ("language", language),
            ("additional_context", or_default(additional_context, NONE)),
            ("concepts_data", or_default(&concepts, EMPTY)),
            ("problems_data", or_default(&problems, EMPTY)),
            ("methods_data", or_default(&methods, EMPTY)),
            ("systems_data", or_default(&systems, EMPTY)),
            ("artifacts_data", or_default(&artifacts, EMPTY)),
            ("meta_types", &meta_types),
        ],
    )
}

/// Prompt asking the model to extract new concepts from `text`.
pub fn context_extract(index: &OntologyIndex, text: &str, language: &str) -> String {
    let text: String = text.chars().take(MAX_EXTRACT_CHARS).collect();
    let existing = index
        .by_kind(EntityKind::Concept)
        .iter()
        .map(|e| format!("{}: {}", e.id, e.name))
        .collect::<Vec<_>>()
        .join("\n");
    let meta_types = meta_types();
    render(
        CONTEXT_EXTRACT_TEMPLATE,
        &[
            ("text", &text),
            ("existing_concepts", or_default(&existing, NONE)),
            ("language", language),
            ("meta_types", &meta_types),
        ],
    )
}
