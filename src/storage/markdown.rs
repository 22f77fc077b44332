//! Markdown codec for entity documents.
//!
//! An entity is stored as a YAML front matter block followed by a body of
//! level-2 sections:
//!
//! ```text
//! ---
//! id: C_1
//! name: Agency
//! status: draft
//! relations: []
//! created: 2026-01-01T10:00:00Z
//! updated: 2026-01-01T10:00:00Z
//! ---
//! # Agency
//!
//! ## Definition
//! ...
//!
//! ## Purpose
//! ...
//!
//! ## Examples
//!
//! - first example
//!
//! ## Notes
//! ...
//! ```

use crate::models::{
    ArtifactDetails, ConceptDetails, Entity, EntityDetails, EntityId, EntityKind, MethodDetails,
    PLACEHOLDER, ProblemDetails, Relation, RelationType, SystemDetails,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use tracing::warn;

/// Longest slug kept in a filename.
pub const MAX_SLUG_LEN: usize = 50;

/// Front matter keys handled by the codec itself rather than variant details.
const COMMON_KEYS: &[&str] = &["id", "name", "relations", "created", "updated"];

/// Serialize an entity to a Markdown document.
pub fn encode(entity: &Entity) -> Result<String> {
    let mut meta = Mapping::new();
    meta.insert("id".into(), Value::String(entity.id.to_string()));
    meta.insert("name".into(), Value::String(entity.name.clone()));

    if let Value::Mapping(details) = serde_yaml::to_value(&entity.details)? {
        for (key, value) in details {
            meta.insert(key, value);
        }
    }

    meta.insert("relations".into(), serde_yaml::to_value(&entity.relations)?);
    meta.insert("created".into(), Value::String(format_timestamp(&entity.created)));
    meta.insert("updated".into(), Value::String(format_timestamp(&entity.updated)));

    let yaml = serde_yaml::to_string(&Value::Mapping(meta))?;

    let mut lines: Vec<String> = vec![format!("# {}", entity.name), String::new()];
    for (title, text) in [("Definition", &entity.definition), ("Purpose", &entity.purpose)] {
        lines.push(format!("## {}", title));
        lines.push(if text.trim().is_empty() {
            PLACEHOLDER.to_string()
        } else {
            escape_section(text)
        });
        lines.push(String::new());
    }

    if !entity.examples.is_empty() {
        lines.push("## Examples".to_string());
        lines.push(String::new());
        for example in &entity.examples {
            lines.push(format!("- {}", example));
        }
        lines.push(String::new());
    }

    if let Some(notes) = entity.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push("## Notes".to_string());
        lines.push(escape_section(notes));
        lines.push(String::new());
    }

    let body = lines.join("\n");
    Ok(format!("---\n{}---\n\n{}\n", yaml, body.trim()))
}

/// Parse a Markdown document into an entity.
///
/// Malformed relation entries and unparseable timestamps are tolerated (with
/// a warning); a missing or malformed ID, a missing name, or invalid variant
/// fields fail the whole document.
pub fn decode(document: &str) -> Result<Entity> {
    let (yaml, body) = split_front_matter(document)
        .ok_or_else(|| Error::Decode("missing YAML front matter block".to_string()))?;

    let meta = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(map) => map,
        _ => return Err(Error::Decode("front matter is not a mapping".to_string())),
    };

    let raw_id = meta
        .get("id")
        .and_then(scalar_to_string)
        .ok_or_else(|| Error::Decode("front matter has no `id`".to_string()))?;
    let id: EntityId = raw_id
        .parse()
        .map_err(|e| Error::Decode(format!("bad `id` {:?}: {}", raw_id, e)))?;

    let sections = parse_sections(body);

    let name = meta
        .get("name")
        .and_then(scalar_to_string)
        .filter(|n| !n.trim().is_empty())
        .or_else(|| title_of(body))
        .ok_or_else(|| Error::Decode(format!("{}: front matter has no `name`", id)))?;

    let details = decode_details(id, &meta)?;
    let relations = decode_relations(id, meta.get("relations"));

    let mut entity = Entity::with_details(id, &name, details)?;
    entity.definition = sections.get("definition").cloned().unwrap_or_default();
    entity.purpose = sections.get("purpose").cloned().unwrap_or_default();
    entity.examples = sections
        .get("examples")
        .map(|s| parse_bullet_list(s))
        .unwrap_or_default();
    entity.notes = sections.get("notes").filter(|n| !n.is_empty()).cloned();
    entity.relations = relations;
    entity.created = decode_timestamp(id, "created", meta.get("created"));
    entity.updated = decode_timestamp(id, "updated", meta.get("updated"));
    Ok(entity)
}

/// Filename for an entity: `<ID>_<slug>.md`, or `<ID>.md` when the name
/// yields an empty slug.
pub fn file_name(entity: &Entity) -> String {
    let slug = slugify(&entity.name);
    if slug.is_empty() {
        format!("{}.md", entity.id)
    } else {
        format!("{}_{}.md", entity.id, slug)
    }
}

/// Build a filesystem-safe slug from a name.
///
/// Lowercases, transliterates Cyrillic, keeps ASCII alphanumerics plus `-`
/// and `_`, and collapses every other run of characters into one `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;

    for ch in name.to_lowercase().chars() {
        let piece: Option<&str> = transliterate(ch);
        let kept = match piece {
            Some(latin) => Some(latin.to_string()),
            None if ch.is_ascii_alphanumeric() || ch == '-' => Some(ch.to_string()),
            None => None,
        };
        match kept {
            Some(text) if !text.is_empty() => {
                if pending_sep && !slug.is_empty() {
                    slug.push('_');
                }
                pending_sep = false;
                slug.push_str(&text);
            }
            // Soft and hard signs transliterate to nothing
            Some(_) => {}
            None => pending_sep = true,
        }
    }

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_matches('_').to_string()
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Split a document into its front matter and body.
///
/// The first line must be `---` (a BOM is tolerated); the block ends at the
/// next `---` or `...` line.
fn split_front_matter(document: &str) -> Option<(&str, &str)> {
    let document = document.trim_start_matches('\u{feff}');
    let rest = document
        .strip_prefix("---\n")
        .or_else(|| document.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Collect level-2 sections keyed by lowercase heading.
fn parse_sections(body: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in body.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(name) = current.take() {
                sections.insert(name, buffer.join("\n").trim().to_string());
            }
            current = Some(heading.trim().to_lowercase());
            buffer.clear();
        } else if current.is_some() {
            buffer.push(unescape_line(line));
        }
    }
    if let Some(name) = current {
        sections.insert(name, buffer.join("\n").trim().to_string());
    }

    sections
}

/// Prefix section lines that would read as a `## ` heading with a backslash.
///
/// Lines already starting with backslashes before `## ` get one more, so
/// [`unescape_line`] can always strip exactly one.
fn escape_section(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim_start_matches('\\').starts_with("## ") {
                format!("\\{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_line(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if rest.trim_start_matches('\\').starts_with("## ") => rest,
        _ => line,
    }
}

fn title_of(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_bullet_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let stripped = line.trim();
            stripped
                .strip_prefix("- ")
                .or_else(|| stripped.strip_prefix("* "))
                .map(|item| item.trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}

fn decode_details(id: EntityId, meta: &Mapping) -> Result<EntityDetails> {
    let mut fields = Mapping::new();
    for (key, value) in meta {
        let is_common = key.as_str().is_some_and(|k| COMMON_KEYS.contains(&k));
        if !is_common {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(match id.kind {
        EntityKind::Concept => EntityDetails::Concept(details_from::<ConceptDetails>(id, fields)?),
        EntityKind::Method => EntityDetails::Method(details_from::<MethodDetails>(id, fields)?),
        EntityKind::System => EntityDetails::System(details_from::<SystemDetails>(id, fields)?),
        EntityKind::Problem => EntityDetails::Problem(details_from::<ProblemDetails>(id, fields)?),
        EntityKind::Artifact => {
            EntityDetails::Artifact(details_from::<ArtifactDetails>(id, fields)?)
        }
    })
}

fn details_from<T: DeserializeOwned>(id: EntityId, fields: Mapping) -> Result<T> {
    serde_yaml::from_value(Value::Mapping(fields))
        .map_err(|e| Error::Decode(format!("{}: invalid {} fields: {}", id, id.kind, e)))
}

fn decode_relations(id: EntityId, raw: Option<&Value>) -> Vec<Relation> {
    let items = match raw {
        Some(Value::Sequence(items)) => items,
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            warn!(entity = %id, value = ?other, "relations is not a list, ignoring");
            return Vec::new();
        }
    };

    let mut relations = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match decode_relation(item) {
            Ok(relation)
                if relations.iter().any(|r: &Relation| {
                    r.target == relation.target && r.relation_type == relation.relation_type
                }) =>
            {
                warn!(entity = %id, position, target = %relation.target, "dropping duplicate relation");
            }
            Ok(relation) => relations.push(relation),
            Err(reason) => {
                warn!(entity = %id, position, %reason, "dropping malformed relation");
            }
        }
    }
    relations
}

fn decode_relation(item: &Value) -> std::result::Result<Relation, String> {
    let map = item.as_mapping().ok_or("relation is not a mapping")?;
    let raw_type = map
        .get("type")
        .and_then(scalar_to_string)
        .ok_or("relation has no `type`")?;
    let relation_type: RelationType = raw_type.parse()?;
    let target = map
        .get("target")
        .and_then(scalar_to_string)
        .filter(|t| !t.trim().is_empty())
        .ok_or("relation has no `target`")?;
    let description = map
        .get("description")
        .and_then(scalar_to_string)
        .filter(|d| !d.trim().is_empty());

    Ok(Relation {
        relation_type,
        target: target.trim().to_string(),
        description,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_timestamp(id: EntityId, field: &str, raw: Option<&Value>) -> DateTime<Utc> {
    let parsed = raw.and_then(scalar_to_string).and_then(|s| parse_timestamp(&s));
    match parsed {
        Some(ts) => ts,
        None => {
            if raw.is_some() {
                warn!(entity = %id, field, value = ?raw, "unparseable timestamp, using now");
            }
            Utc::now()
        }
    }
}

/// Parse RFC 3339, or a naive date-time / date read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
