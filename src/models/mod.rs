//! Data models for ontology entities.
//!
//! This module defines the core data structures:
//! - `EntityKind` - The five entity variants and their ID prefixes
//! - `EntityId` - `<Prefix>_<N>` identifiers
//! - `Entity` - The shared record with variant-specific `EntityDetails`
//! - `Relation` - Typed, directed links between entities

pub mod graph;

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text stored in `definition`/`purpose` of a draft before it is filled.
pub const PLACEHOLDER: &str = "[empty]";

/// The five kinds of entity managed by the ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Concept,
    Method,
    System,
    Problem,
    Artifact,
}

impl EntityKind {
    /// Get all entity kinds in prefix order (C, M, S, P, A).
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Concept,
            EntityKind::Method,
            EntityKind::System,
            EntityKind::Problem,
            EntityKind::Artifact,
        ]
    }

    /// Single-letter ID prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Concept => "C",
            EntityKind::Method => "M",
            EntityKind::System => "S",
            EntityKind::Problem => "P",
            EntityKind::Artifact => "A",
        }
    }

    /// Look up a kind by its ID prefix (case-insensitive).
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "C" => Some(EntityKind::Concept),
            "M" => Some(EntityKind::Method),
            "S" => Some(EntityKind::System),
            "P" => Some(EntityKind::Problem),
            "A" => Some(EntityKind::Artifact),
            _ => None,
        }
    }

    /// Storage directory name for this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Concept => "concepts",
            EntityKind::Method => "methods",
            EntityKind::System => "systems",
            EntityKind::Problem => "problems",
            EntityKind::Artifact => "artifacts",
        }
    }

    /// Plural title used for spreadsheet sheets and listings.
    pub fn plural_title(&self) -> &'static str {
        match self {
            EntityKind::Concept => "Concepts",
            EntityKind::Method => "Methods",
            EntityKind::System => "Systems",
            EntityKind::Problem => "Problems",
            EntityKind::Artifact => "Artifacts",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Concept => "concept",
            EntityKind::Method => "method",
            EntityKind::System => "system",
            EntityKind::Problem => "problem",
            EntityKind::Artifact => "artifact",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    /// Accepts kind names ("concept"), plural directory names ("concepts")
    /// and ID prefixes ("C").
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let kind = match lower.as_str() {
            "concept" | "concepts" => Some(EntityKind::Concept),
            "method" | "methods" => Some(EntityKind::Method),
            "system" | "systems" => Some(EntityKind::System),
            "problem" | "problems" => Some(EntityKind::Problem),
            "artifact" | "artifacts" => Some(EntityKind::Artifact),
            other => EntityKind::from_prefix(other),
        };
        kind.ok_or_else(|| format!("Unknown entity type: {}", s))
    }
}

/// Entity identifier in `<Prefix>_<N>` form, e.g. `C_12`.
///
/// Ordering is by kind (C, M, S, P, A) and then numerically, so `C_2 < C_10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub kind: EntityKind,
    pub number: u32,
}

impl EntityId {
    /// Build an ID; `number` must be positive.
    pub fn new(kind: EntityKind, number: u32) -> Result<Self> {
        if number == 0 {
            return Err(Error::InvalidId(format!(
                "ID number must be positive, got {}_0",
                kind.prefix()
            )));
        }
        Ok(Self { kind, number })
    }

    /// Parse a relation target that is written exactly as the ID prints.
    ///
    /// `c_1`, `C_01` and ` C_1` are not accepted: relation targets are
    /// matched as written everywhere else.
    pub fn parse_exact(s: &str) -> Option<Self> {
        s.parse::<Self>().ok().filter(|id| id.to_string() == s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.number)
    }
}

impl std::str::FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, number) = s
            .trim()
            .split_once('_')
            .ok_or_else(|| Error::InvalidId(format!("expected <Prefix>_<N>, got: {}", s)))?;
        let kind = EntityKind::from_prefix(prefix)
            .filter(|_| prefix.len() == 1)
            .ok_or_else(|| Error::InvalidId(format!("unknown prefix '{}' in: {}", prefix, s)))?;
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidId(format!("invalid number in: {}", s)));
        }
        let number: u32 = number
            .parse()
            .map_err(|_| Error::InvalidId(format!("number out of range in: {}", s)))?;
        EntityId::new(kind, number)
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle status of a Concept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConceptStatus {
    /// Only the name is set
    #[default]
    #[serde(rename = "draft")]
    Draft,
    /// All descriptive fields populated, not yet reviewed
    #[serde(rename = "draft+filled")]
    DraftFilled,
    /// Reviewed and approved
    #[serde(rename = "approved")]
    Approved,
}

impl ConceptStatus {
    pub fn all() -> &'static [ConceptStatus] {
        &[
            ConceptStatus::Draft,
            ConceptStatus::DraftFilled,
            ConceptStatus::Approved,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptStatus::Draft => "draft",
            ConceptStatus::DraftFilled => "draft+filled",
            ConceptStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for ConceptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConceptStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ConceptStatus::Draft),
            "draft+filled" | "draft_filled" | "filled" => Ok(ConceptStatus::DraftFilled),
            "approved" => Ok(ConceptStatus::Approved),
            _ => Err(format!(
                "Invalid status: {} (expected draft, draft+filled or approved)",
                s
            )),
        }
    }
}

/// Fundamental classification tag of a Concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaMetaType {
    Characteristic,
    Indicator,
    Value,
    State,
    Role,
    Method,
    MethodDescription,
    WorkPlan,
    Execution,
    Artifact,
    System,
    Problem,
}

impl MetaMetaType {
    pub fn all() -> &'static [MetaMetaType] {
        &[
            MetaMetaType::Characteristic,
            MetaMetaType::Indicator,
            MetaMetaType::Value,
            MetaMetaType::State,
            MetaMetaType::Role,
            MetaMetaType::Method,
            MetaMetaType::MethodDescription,
            MetaMetaType::WorkPlan,
            MetaMetaType::Execution,
            MetaMetaType::Artifact,
            MetaMetaType::System,
            MetaMetaType::Problem,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaMetaType::Characteristic => "characteristic",
            MetaMetaType::Indicator => "indicator",
            MetaMetaType::Value => "value",
            MetaMetaType::State => "state",
            MetaMetaType::Role => "role",
            MetaMetaType::Method => "method",
            MetaMetaType::MethodDescription => "method_description",
            MetaMetaType::WorkPlan => "work_plan",
            MetaMetaType::Execution => "execution",
            MetaMetaType::Artifact => "artifact",
            MetaMetaType::System => "system",
            MetaMetaType::Problem => "problem",
        }
    }
}

impl fmt::Display for MetaMetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetaMetaType {
    type Err = String;

    /// Case-insensitive; spaces and hyphens are read as underscores so that
    /// "Method description" and "work-plan" both parse.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        MetaMetaType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("Unknown meta type: {}", s))
    }
}

/// Type of a relation between two entities.
///
/// No symmetry is implied: `A requires B` says nothing about `B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Source depends on target
    Requires,
    /// Source makes target possible
    Enables,
    /// General association
    RelatesTo,
    /// Source is a component of target
    PartOf,
    /// Source is a concrete case of target
    InstanceOf,
    /// Source contrasts with target
    OppositeOf,
    /// Source resembles target
    SimilarTo,
}

impl RelationType {
    /// Get all relation types.
    pub fn all() -> &'static [RelationType] {
        &[
            RelationType::Requires,
            RelationType::Enables,
            RelationType::RelatesTo,
            RelationType::PartOf,
            RelationType::InstanceOf,
            RelationType::OppositeOf,
            RelationType::SimilarTo,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Requires => "requires",
            RelationType::Enables => "enables",
            RelationType::RelatesTo => "relates_to",
            RelationType::PartOf => "part_of",
            RelationType::InstanceOf => "instance_of",
            RelationType::OppositeOf => "opposite_of",
            RelationType::SimilarTo => "similar_to",
        }
    }

    /// Human-readable sentence describing `source <type> target`.
    pub fn describe(&self, source: &str, target: &str) -> String {
        match self {
            RelationType::Requires => format!("{} requires {}", source, target),
            RelationType::Enables => format!("{} enables {}", source, target),
            RelationType::RelatesTo => format!("{} is related to {}", source, target),
            RelationType::PartOf => format!("{} is part of {}", source, target),
            RelationType::InstanceOf => format!("{} is an instance of {}", source, target),
            RelationType::OppositeOf => format!("{} is the opposite of {}", source, target),
            RelationType::SimilarTo => format!("{} is similar to {}", source, target),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "requires" => Ok(RelationType::Requires),
            "enables" => Ok(RelationType::Enables),
            "relates_to" => Ok(RelationType::RelatesTo),
            "part_of" => Ok(RelationType::PartOf),
            "instance_of" => Ok(RelationType::InstanceOf),
            "opposite_of" => Ok(RelationType::OppositeOf),
            "similar_to" => Ok(RelationType::SimilarTo),
            _ => Err(format!("Unknown relation type: {}", s)),
        }
    }
}

/// A typed, directed link to another entity.
///
/// `target` is kept as a raw ID string: it may name an entity that is not
/// loaded, or not even a well-formed ID. Only the validator checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: RelationType,

    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Relation {
    pub fn new(relation_type: RelationType, target: impl Into<String>) -> Self {
        Self {
            relation_type,
            target: target.into(),
            description: None,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.relation_type, self.target)
    }
}

/// Concept-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptDetails {
    pub status: ConceptStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_meta: Option<MetaMetaType>,
}

/// Method-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDetails {
    /// Abstract method, method description, or execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_type: Option<String>,

    pub steps: Vec<String>,
}

/// System-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemDetails {
    /// IDs of component entities
    pub components: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<String>,
}

/// Problem-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<String>,

    pub metrics: Vec<String>,
}

/// Artifact-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactDetails {
    /// Document, code, model, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<String>,
}

/// Variant-specific payload of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityDetails {
    Concept(ConceptDetails),
    Method(MethodDetails),
    System(SystemDetails),
    Problem(ProblemDetails),
    Artifact(ArtifactDetails),
}

impl EntityDetails {
    /// Empty details for the given kind (a Concept starts as `draft`).
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Concept => EntityDetails::Concept(ConceptDetails::default()),
            EntityKind::Method => EntityDetails::Method(MethodDetails::default()),
            EntityKind::System => EntityDetails::System(SystemDetails::default()),
            EntityKind::Problem => EntityDetails::Problem(ProblemDetails::default()),
            EntityKind::Artifact => EntityDetails::Artifact(ArtifactDetails::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDetails::Concept(_) => EntityKind::Concept,
            EntityDetails::Method(_) => EntityKind::Method,
            EntityDetails::System(_) => EntityKind::System,
            EntityDetails::Problem(_) => EntityKind::Problem,
            EntityDetails::Artifact(_) => EntityKind::Artifact,
        }
    }
}

/// An entity of the ontology: a Concept, Method, System, Problem or Artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Unique identifier (e.g., "C_12"); its prefix fixes the variant
    pub id: EntityId,

    /// Short name, singular
    pub name: String,

    /// What it is
    pub definition: String,

    /// Why it exists, where it applies
    pub purpose: String,

    /// Usage examples in authoring order
    pub examples: Vec<String>,

    /// Outgoing relations
    pub relations: Vec<Relation>,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Variant-specific fields
    #[serde(flatten)]
    pub details: EntityDetails,
}

impl Entity {
    /// Create a draft entity of `kind` with the given ID and name.
    ///
    /// Fails if the name is blank or the ID prefix does not belong to `kind`.
    pub fn create(kind: EntityKind, name: &str, id: EntityId) -> Result<Self> {
        Self::with_details(id, name, EntityDetails::empty(kind))
    }

    /// Create a draft entity with explicit variant details.
    pub fn with_details(id: EntityId, name: &str, details: EntityDetails) -> Result<Self> {
        if id.kind != details.kind() {
            return Err(Error::Validation(format!(
                "ID {} does not belong to a {}",
                id,
                details.kind()
            )));
        }
        let name = require_text("name", name)?;
        let now = Utc::now();
        Ok(Self {
            id,
            name,
            definition: PLACEHOLDER.to_string(),
            purpose: PLACEHOLDER.to_string(),
            examples: Vec::new(),
            relations: Vec::new(),
            created: now,
            updated: now,
            notes: None,
            details,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.id.kind
    }

    /// Concept status, `None` for the other variants.
    pub fn status(&self) -> Option<ConceptStatus> {
        match &self.details {
            EntityDetails::Concept(c) => Some(c.status),
            _ => None,
        }
    }

    /// Concept classification tag, `None` for the other variants.
    pub fn meta_meta(&self) -> Option<MetaMetaType> {
        match &self.details {
            EntityDetails::Concept(c) => c.meta_meta,
            _ => None,
        }
    }

    /// Whether both definition and purpose hold real content.
    pub fn is_filled(&self) -> bool {
        is_real_text(&self.definition) && is_real_text(&self.purpose)
    }

    /// Re-check field-level invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.kind != self.details.kind() {
            return Err(Error::Validation(format!(
                "{}: ID prefix does not match a {}",
                self.id,
                self.details.kind()
            )));
        }
        for (field, value) in [
            ("name", &self.name),
            ("definition", &self.definition),
            ("purpose", &self.purpose),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{}: {} must not be empty", self.id, field)));
            }
        }
        Ok(())
    }

    /// Add a relation unless one with the same target and type exists.
    ///
    /// Returns `true` if the relation was appended.
    pub fn add_relation(
        &mut self,
        target: impl Into<String>,
        relation_type: RelationType,
        description: Option<String>,
    ) -> bool {
        let target = target.into();
        if self.has_relation(&target, Some(relation_type)) {
            return false;
        }
        self.relations.push(Relation {
            relation_type,
            target,
            description: description.filter(|d| !d.trim().is_empty()),
        });
        self.touch();
        true
    }

    /// Remove relations to `target`, only of `relation_type` when given.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove_relation(&mut self, target: &str, relation_type: Option<RelationType>) -> bool {
        let before = self.relations.len();
        self.relations.retain(|r| {
            !(r.target == target && relation_type.is_none_or(|t| r.relation_type == t))
        });
        let removed = self.relations.len() < before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn has_relation(&self, target: &str, relation_type: Option<RelationType>) -> bool {
        self.relations
            .iter()
            .any(|r| r.target == target && relation_type.is_none_or(|t| r.relation_type == t))
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.name = require_text("name", name)?;
        self.touch();
        Ok(())
    }

    pub fn set_definition(&mut self, definition: &str) -> Result<()> {
        self.definition = require_text("definition", definition)?;
        self.touch();
        Ok(())
    }

    pub fn set_purpose(&mut self, purpose: &str) -> Result<()> {
        self.purpose = require_text("purpose", purpose)?;
        self.touch();
        Ok(())
    }

    /// Set or clear the notes; blank notes clear.
    pub fn set_notes(&mut self, notes: Option<&str>) {
        self.notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self.touch();
    }

    /// Append an example; blanks and duplicates are ignored. Line breaks
    /// are folded into spaces, an example is one list item.
    pub fn add_example(&mut self, example: &str) -> bool {
        let example = single_line(example);
        if example.is_empty() || self.examples.contains(&example) {
            return false;
        }
        self.examples.push(example);
        self.touch();
        true
    }

    pub fn remove_example(&mut self, example: &str) -> bool {
        let before = self.examples.len();
        self.examples.retain(|e| e != example);
        let removed = self.examples.len() < before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replace all examples, dropping blanks.
    pub fn set_examples(&mut self, examples: Vec<String>) {
        self.examples = examples
            .iter()
            .map(|e| single_line(e))
            .filter(|e| !e.is_empty())
            .collect();
        self.touch();
    }

    /// `draft` -> `draft+filled`. No-op from any other state or variant.
    pub fn mark_filled(&mut self) -> bool {
        if let EntityDetails::Concept(c) = &mut self.details {
            if c.status == ConceptStatus::Draft {
                c.status = ConceptStatus::DraftFilled;
                self.touch();
                return true;
            }
        }
        false
    }

    /// `draft` or `draft+filled` -> `approved`. No-op once approved.
    pub fn approve(&mut self) -> bool {
        if let EntityDetails::Concept(c) = &mut self.details {
            if c.status != ConceptStatus::Approved {
                c.status = ConceptStatus::Approved;
                self.touch();
                return true;
            }
        }
        false
    }

    pub fn set_meta_meta(&mut self, meta_meta: Option<MetaMetaType>) -> bool {
        if let EntityDetails::Concept(c) = &mut self.details {
            c.meta_meta = meta_meta;
            self.touch();
            return true;
        }
        false
    }

    fn touch(&mut self) {
        self.updated = Utc::now();
    }
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_real_text(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != PLACEHOLDER
}
