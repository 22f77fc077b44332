//! Filling a draft concept from a model's answer.

use super::{AiProvider, parse, prompts};
use crate::models::{ConceptStatus, EntityId, EntityKind, RelationType};
use crate::ontology::Ontology;
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

const FILL_MAX_TOKENS: u32 = 2000;

/// Fields a fill may update.
pub const FILLABLE_FIELDS: &[&str] = &["definition", "purpose", "meta_meta", "examples", "relations"];

// Column order of a fill row
const COL_DEFINITION: usize = 2;
const COL_PURPOSE: usize = 3;
const COL_META_META: usize = 4;
const COL_EXAMPLES: usize = 5;
const COL_RELATIONS: usize = 6;

/// What a fill changed.
#[derive(Debug, Clone, Serialize)]
pub struct FillOutcome {
    pub id: EntityId,
    pub provider: String,
    pub model: String,
    pub updated_fields: Vec<String>,
    pub added_relations: Vec<EntityId>,
    pub status: Option<ConceptStatus>,
}

/// Fills concept fields through an [`AiProvider`].
pub struct ConceptFiller<'a> {
    provider: &'a dyn AiProvider,
    language: String,
}

impl<'a> ConceptFiller<'a> {
    pub fn new(provider: &'a dyn AiProvider, language: &str) -> Self {
        Self {
            provider,
            language: language.to_string(),
        }
    }

    /// Ask the model to fill concept `id` and apply its answer in the index.
    ///
    /// Only `fields` are touched when given. Suggested relations are added
    /// as `relates_to` when the target exists. A `draft` concept becomes
    /// `draft+filled`. The caller persists the entity.
    pub fn fill(
        &self,
        ontology: &mut Ontology,
        id: &EntityId,
        fields: Option<&[String]>,
        context: &str,
    ) -> Result<FillOutcome> {
        if let Some(fields) = fields {
            if let Some(bad) = fields.iter().find(|f| !FILLABLE_FIELDS.contains(&f.as_str())) {
                return Err(Error::Validation(format!(
                    "Unknown field '{}'. Fillable fields: {}",
                    bad,
                    FILLABLE_FIELDS.join(", ")
                )));
            }
        }
        let entity = ontology.get(id)?;
        if entity.kind() != EntityKind::Concept {
            return Err(Error::Validation(format!("{} is not a concept", id)));
        }

        let prompt = prompts::concept_fill(
            ontology.index(),
            &id.to_string(),
            &entity.name,
            context,
            &self.language,
        );
        debug!(id = %id, chars = prompt.len(), "requesting concept fill");
        let response = self.provider.generate(&prompt, FILL_MAX_TOKENS)?;

        let rows = parse::table_rows(&response);
        let row = rows
            .first()
            .ok_or_else(|| Error::Ai(format!("No table found in the response for {}", id)))?;
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let wanted = |name: &str| fields.is_none_or(|f| f.iter().any(|x| x == name));

        let relation_targets: Vec<EntityId> = parse::relation_ids(cell(COL_RELATIONS))
            .into_iter()
            .filter(|t| t != id && ontology.index().contains(t))
            .collect();

        let outcome = ontology.update(id, |concept| -> Result<(Vec<String>, Vec<EntityId>)> {
            let mut updated = Vec::new();
            let mut added = Vec::new();

            if wanted("definition") && !parse::is_blank(cell(COL_DEFINITION)) {
                concept.set_definition(cell(COL_DEFINITION))?;
                updated.push("definition".to_string());
            }
            if wanted("purpose") && !parse::is_blank(cell(COL_PURPOSE)) {
                concept.set_purpose(cell(COL_PURPOSE))?;
                updated.push("purpose".to_string());
            }
            if wanted("meta_meta") {
                if let Some(meta) = parse::parse_meta_meta(cell(COL_META_META)) {
                    concept.set_meta_meta(Some(meta));
                    updated.push("meta_meta".to_string());
                }
            }
            if wanted("examples") {
                let examples = parse::split_examples(cell(COL_EXAMPLES));
                if !examples.is_empty() {
                    concept.set_examples(examples);
                    updated.push("examples".to_string());
                }
            }
            if wanted("relations") {
                for target in &relation_targets {
                    if concept.add_relation(target.to_string(), RelationType::RelatesTo, None) {
                        added.push(*target);
                    }
                }
                if !added.is_empty() {
                    updated.push("relations".to_string());
                }
            }
            concept.mark_filled();
            Ok((updated, added))
        })??;

        let (updated_fields, added_relations) = outcome;
        let status = ontology.get(id)?.status();
        info!(id = %id, fields = ?updated_fields, "concept filled");
        Ok(FillOutcome {
            id: *id,
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            updated_fields,
            added_relations,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::MockProvider;
    use crate::models::MetaMetaType;
    use crate::test_utils::TestEnv;

    const REPLY: &str = "\
| id | name | definition | purpose | meta_meta | examples | relations |
|----|------|------------|---------|-----------|----------|-----------|
| C_1 | Goal | A desired future state. | Gives direction. | состояние | Run a marathon; Learn Rust | C_2_Habit; C_99; M_1 |
";

    fn ontology_with_concepts(env: &TestEnv) -> Ontology {
        env.init_storage();
        let mut ontology = Ontology::open(&env.root()).unwrap();
        ontology.create_entity(EntityKind::Concept, "Goal", None).unwrap();
        ontology.create_entity(EntityKind::Concept, "Habit", None).unwrap();
        ontology.create_entity(EntityKind::Method, "Review", None).unwrap();
        ontology
    }

    fn c(n: u32) -> EntityId {
        EntityId::new(EntityKind::Concept, n).unwrap()
    }

    #[test]
    fn test_fill_applies_all_fields() {
        let env = TestEnv::new();
        let mut ontology = ontology_with_concepts(&env);
        let provider = MockProvider::new(REPLY);

        let outcome = ConceptFiller::new(&provider, "en")
            .fill(&mut ontology, &c(1), None, "life planning")
            .unwrap();

        assert_eq!(outcome.status, Some(ConceptStatus::DraftFilled));
        assert_eq!(
            outcome.updated_fields,
            vec!["definition", "purpose", "meta_meta", "examples", "relations"]
        );
        // C_99 does not exist and is skipped
        assert_eq!(
            outcome.added_relations,
            vec![c(2), EntityId::new(EntityKind::Method, 1).unwrap()]
        );

        let goal = ontology.get(&c(1)).unwrap();
        assert_eq!(goal.definition, "A desired future state.");
        assert_eq!(goal.meta_meta(), Some(MetaMetaType::State));
        assert_eq!(goal.examples, vec!["Run a marathon", "Learn Rust"]);
        assert!(goal.has_relation("C_2", Some(RelationType::RelatesTo)));

        let prompt = &provider.prompts.borrow()[0];
        assert!(prompt.contains("life planning"));
        assert!(prompt.contains("C_2_Habit"));
    }

    #[test]
    fn test_fill_restricted_fields() {
        let env = TestEnv::new();
        let mut ontology = ontology_with_concepts(&env);
        let provider = MockProvider::new(REPLY);
        let fields = vec!["purpose".to_string()];

        let outcome = ConceptFiller::new(&provider, "en")
            .fill(&mut ontology, &c(1), Some(&fields), "")
            .unwrap();

        assert_eq!(outcome.updated_fields, vec!["purpose"]);
        let goal = ontology.get(&c(1)).unwrap();
        assert_eq!(goal.purpose, "Gives direction.");
        assert_eq!(goal.definition, crate::models::PLACEHOLDER);
        assert!(goal.relations.is_empty());
    }

    #[test]
    fn test_fill_rejects_non_concept_and_unknown_field() {
        let env = TestEnv::new();
        let mut ontology = ontology_with_concepts(&env);
        let provider = MockProvider::new(REPLY);
        let filler = ConceptFiller::new(&provider, "en");

        let method = EntityId::new(EntityKind::Method, 1).unwrap();
        assert!(matches!(
            filler.fill(&mut ontology, &method, None, ""),
            Err(Error::Validation(_))
        ));
        let fields = vec!["name".to_string()];
        assert!(matches!(
            filler.fill(&mut ontology, &c(1), Some(&fields), ""),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            filler.fill(&mut ontology, &c(42), None, ""),
            Err(Error::NotFound(_))
        ));
        assert!(provider.prompts.borrow().is_empty());
    }

    #[test]
    fn test_fill_without_table_is_error() {
        let env = TestEnv::new();
        let mut ontology = ontology_with_concepts(&env);
        let provider = MockProvider::new("I cannot help with that.");

        let result = ConceptFiller::new(&provider, "en").fill(&mut ontology, &c(1), None, "");
        assert!(matches!(result, Err(Error::Ai(_))));
        assert_eq!(ontology.get(&c(1)).unwrap().status(), Some(ConceptStatus::Draft));
    }

    #[test]
    fn test_fill_keeps_approved_status() {
        let env = TestEnv::new();
        let mut ontology = ontology_with_concepts(&env);
        ontology.update(&c(1), |e| e.approve()).unwrap();
        let provider = MockProvider::new(REPLY);

        let outcome = ConceptFiller::new(&provider, "en")
            .fill(&mut ontology, &c(1), None, "")
            .unwrap();
        assert_eq!(outcome.status, Some(ConceptStatus::Approved));
    }
}
