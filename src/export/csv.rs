//! CSV export, one row per entity.

use super::{ExportFilter, join_examples, join_relations, select, timestamp};
use crate::Result;
use crate::index::OntologyIndex;
use crate::models::Entity;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const HEADERS: [&str; 10] = [
    "id",
    "name",
    "definition",
    "purpose",
    "status",
    "meta_meta",
    "examples",
    "relations",
    "created",
    "updated",
];

/// UTF-8 byte order mark, so spreadsheet tools detect the encoding.
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write the filtered entities to `path`, returning the row count.
pub fn export_csv(index: &OntologyIndex, path: &Path, filter: &ExportFilter) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(BOM)?;
    let rows = write_csv(&mut file, &select(index, filter))?;
    tracing::debug!(rows, path = %path.display(), "exported CSV");
    Ok(rows)
}

/// Write a header and one row per entity to `out`.
pub fn write_csv<W: Write>(out: W, entities: &[&Entity]) -> Result<usize> {
    let mut writer = ::csv::Writer::from_writer(out);
    writer.write_record(HEADERS)?;
    for entity in entities {
        writer.write_record(row(entity))?;
    }
    writer.flush()?;
    Ok(entities.len())
}

fn row(entity: &Entity) -> [String; 10] {
    [
        entity.id.to_string(),
        entity.name.clone(),
        entity.definition.clone(),
        entity.purpose.clone(),
        entity.status().map(|s| s.to_string()).unwrap_or_default(),
        entity.meta_meta().map(|m| m.to_string()).unwrap_or_default(),
        join_examples(entity),
        join_relations(entity),
        timestamp(&entity.created),
        timestamp(&entity.updated),
    ]
}
