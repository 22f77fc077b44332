//! Parsing of Markdown pipe tables returned by a model.

use crate::models::{EntityId, MetaMetaType};
use regex::Regex;
use std::sync::OnceLock;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?$").expect("Invalid regex"))
}

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([CMPSA]_\d+)").expect("Invalid regex"))
}

/// Split a table line into trimmed cells, keeping empty cells in place.
fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Data rows of the first pipe table in `response`.
///
/// A table is a header line followed by a `|---|---|` separator; data rows
/// are the consecutive `|` lines after it. Returns an empty list when no
/// table is found.
pub fn table_rows(response: &str) -> Vec<Vec<String>> {
    let lines: Vec<&str> = response.lines().map(str::trim).collect();
    let Some(sep) = lines.iter().enumerate().skip(1).position(|(i, line)| {
        separator_re().is_match(line) && lines[i - 1].starts_with('|')
    }) else {
        return Vec::new();
    };
    // `position` counts from the skipped start
    let sep = sep + 1;

    lines[sep + 1..]
        .iter()
        .take_while(|line| line.starts_with('|'))
        .map(|line| split_row(line))
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect()
}

/// Whether a cell means "no value".
pub fn is_blank(cell: &str) -> bool {
    matches!(cell.trim(), "" | "-" | "—" | "n/a" | "N/A")
}

/// Examples cell split on `;`.
pub fn split_examples(cell: &str) -> Vec<String> {
    if is_blank(cell) {
        return Vec::new();
    }
    cell.split(';')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Meta type from an English or Russian label.
pub fn parse_meta_meta(cell: &str) -> Option<MetaMetaType> {
    if is_blank(cell) {
        return None;
    }
    let label = cell.trim().to_lowercase();
    let russian = match label.as_str() {
        "характеристика" => Some(MetaMetaType::Characteristic),
        "показатель" => Some(MetaMetaType::Indicator),
        "значение" => Some(MetaMetaType::Value),
        "состояние" => Some(MetaMetaType::State),
        "роль" => Some(MetaMetaType::Role),
        "метод" => Some(MetaMetaType::Method),
        "описание метода" => Some(MetaMetaType::MethodDescription),
        "план работ" => Some(MetaMetaType::WorkPlan),
        "выполнение" => Some(MetaMetaType::Execution),
        "артефакт" => Some(MetaMetaType::Artifact),
        "система" => Some(MetaMetaType::System),
        "проблема" => Some(MetaMetaType::Problem),
        _ => None,
    };
    russian.or_else(|| label.parse().ok())
}

/// Entity IDs named in a relations cell, e.g. `C_2_Goal; P_1`.
///
/// Each `;`-separated part contributes the ID it starts with, if any.
pub fn relation_ids(cell: &str) -> Vec<EntityId> {
    if is_blank(cell) {
        return Vec::new();
    }
    let mut ids = Vec::new();
    for part in cell.split(';').map(str::trim) {
        let Some(m) = id_re().captures(part).and_then(|c| c.get(1)) else {
            continue;
        };
        if let Ok(id) = m.as_str().parse::<EntityId>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;

    #[test]
    fn test_table_rows_skips_prose() {
        let response = "Here is the table:\n\n\
| name | definition | purpose |\n\
|------|:----------:|---------|\n\
| Goal | Desired result | Direction |\n\
| Habit |  | Stability |\n\
\nHope this helps.";
        let rows = table_rows(response);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Goal", "Desired result", "Direction"]);
        // Empty cells keep their column
        assert_eq!(rows[1], vec!["Habit", "", "Stability"]);
    }

    #[test]
    fn test_table_rows_without_table() {
        assert!(table_rows("no table here").is_empty());
        assert!(table_rows("| a | b |\n| c | d |").is_empty());
        assert!(table_rows("| a | b |\n|---|---|\n").is_empty());
    }

    #[test]
    fn test_split_examples() {
        assert_eq!(split_examples("one; two ;; three"), vec!["one", "two", "three"]);
        assert!(split_examples("-").is_empty());
    }

    #[test]
    fn test_parse_meta_meta() {
        assert_eq!(parse_meta_meta("Характеристика"), Some(MetaMetaType::Characteristic));
        assert_eq!(parse_meta_meta("план работ"), Some(MetaMetaType::WorkPlan));
        assert_eq!(parse_meta_meta("work plan"), Some(MetaMetaType::WorkPlan));
        assert_eq!(parse_meta_meta("role"), Some(MetaMetaType::Role));
        assert_eq!(parse_meta_meta("mood"), None);
        assert_eq!(parse_meta_meta(""), None);
    }

    #[test]
    fn test_relation_ids() {
        let ids = relation_ids("C_2_Goal; P_1; nonsense; C_2; X_9");
        assert_eq!(
            ids,
            vec![
                EntityId::new(EntityKind::Concept, 2).unwrap(),
                EntityId::new(EntityKind::Problem, 1).unwrap(),
            ]
        );
        assert!(relation_ids("-").is_empty());
    }
}
