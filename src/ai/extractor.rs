//! Extracting new concepts from free text.

use super::{AiProvider, parse, prompts};
use crate::index::normalize_name;
use crate::models::{ConceptDetails, ConceptStatus, Entity, EntityDetails, EntityId, EntityKind};
use crate::ontology::Ontology;
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

const EXTRACT_MAX_TOKENS: u32 = 3000;

/// Extracts candidate concepts through an [`AiProvider`].
pub struct ConceptExtractor<'a> {
    provider: &'a dyn AiProvider,
    language: String,
}

impl<'a> ConceptExtractor<'a> {
    pub fn new(provider: &'a dyn AiProvider, language: &str) -> Self {
        Self {
            provider,
            language: language.to_string(),
        }
    }

    /// Ask the model for the key concepts of `text`.
    ///
    /// Returns `draft+filled` concepts with consecutive IDs starting at the
    /// next free concept ID. Names already in the ontology, or repeated in
    /// the answer, are skipped. Nothing is added to the ontology.
    pub fn extract(&self, ontology: &Ontology, text: &str) -> Result<Vec<Entity>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("Nothing to extract from: text is empty".to_string()));
        }
        let prompt = prompts::context_extract(ontology.index(), text, &self.language);
        debug!(chars = prompt.len(), "requesting concept extraction");
        let response = self.provider.generate(&prompt, EXTRACT_MAX_TOKENS)?;

        let existing: HashSet<String> = ontology
            .index()
            .by_kind(EntityKind::Concept)
            .iter()
            .map(|e| normalize_name(&e.name))
            .collect();
        let mut seen = HashSet::new();
        let mut next = ontology.next_id(EntityKind::Concept).number;
        let mut concepts = Vec::new();

        for row in parse::table_rows(&response) {
            if row.len() < 3 {
                continue;
            }
            let name = row[0].as_str();
            let key = normalize_name(name);
            if key.is_empty() || existing.contains(&key) || !seen.insert(key) {
                debug!(name, "skipping known or repeated concept");
                continue;
            }

            let details = EntityDetails::Concept(ConceptDetails {
                status: ConceptStatus::DraftFilled,
                meta_meta: row.get(3).and_then(|c| parse::parse_meta_meta(c)),
            });
            let built = EntityId::new(EntityKind::Concept, next)
                .and_then(|id| Entity::with_details(id, name, details))
                .and_then(|mut concept| {
                    if !parse::is_blank(&row[1]) {
                        concept.set_definition(&row[1])?;
                    }
                    if !parse::is_blank(&row[2]) {
                        concept.set_purpose(&row[2])?;
                    }
                    if let Some(examples) = row.get(4) {
                        concept.set_examples(parse::split_examples(examples));
                    }
                    Ok(concept)
                });
            match built {
                Ok(concept) => {
                    concepts.push(concept);
                    next += 1;
                }
                Err(e) => warn!(name, error = %e, "dropping extracted concept"),
            }
        }

        debug!(count = concepts.len(), "concepts extracted");
        Ok(concepts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::MockProvider;
    use crate::models::MetaMetaType;
    use crate::test_utils::TestEnv;

    const REPLY: &str = "\
| name | definition | purpose | meta_meta | examples |
|------|------------|---------|-----------|----------|
| Attention | Focus of awareness. | Directs effort. | характеристика | Reading; Coding |
| Goal | Already known. | - | state | - |
| Energy | Capacity to act. | Sustains work. | value | Sleep |
| Energy | Duplicate row. | x | value | |
| Short | row |
";

    #[test]
    fn test_extract_assigns_consecutive_ids() {
        let env = TestEnv::new();
        env.init_storage();
        let mut ontology = Ontology::open(&env.root()).unwrap();
        ontology.create_entity(EntityKind::Concept, "goal", None).unwrap();
        let id = EntityId::new(EntityKind::Concept, 7).unwrap();
        ontology.create_entity(EntityKind::Concept, "Flow", Some(id)).unwrap();
        let provider = MockProvider::new(REPLY);

        let concepts = ConceptExtractor::new(&provider, "ru")
            .extract(&ontology, "Attention and energy drive goals.")
            .unwrap();

        let ids: Vec<String> = concepts.iter().map(|c| c.id.to_string()).collect();
        let names: Vec<&str> = concepts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(ids, vec!["C_8", "C_9"]);
        assert_eq!(names, vec!["Attention", "Energy"]);

        let attention = &concepts[0];
        assert_eq!(attention.status(), Some(ConceptStatus::DraftFilled));
        assert_eq!(attention.meta_meta(), Some(MetaMetaType::Characteristic));
        assert_eq!(attention.examples, vec!["Reading", "Coding"]);
        assert_eq!(attention.purpose, "Directs effort.");

        // Extraction does not touch the ontology
        assert_eq!(ontology.index().len(), 2);
        let prompt = &provider.prompts.borrow()[0];
        assert!(prompt.contains("C_7: Flow"));
    }

    #[test]
    fn test_extract_empty_text() {
        let env = TestEnv::new();
        env.init_storage();
        let ontology = Ontology::open(&env.root()).unwrap();
        let provider = MockProvider::new(REPLY);
        let result = ConceptExtractor::new(&provider, "ru").extract(&ontology, "  \n");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_extract_without_table() {
        let env = TestEnv::new();
        env.init_storage();
        let ontology = Ontology::open(&env.root()).unwrap();
        let provider = MockProvider::new("Nothing useful.");
        let concepts = ConceptExtractor::new(&provider, "ru")
            .extract(&ontology, "Some text")
            .unwrap();
        assert!(concepts.is_empty());
    }
}
