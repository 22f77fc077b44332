//! XLSX export with one sheet per entity kind.

use super::{join_examples, join_relations, timestamp};
use crate::Result;
use crate::index::OntologyIndex;
use crate::models::{Entity, EntityDetails, EntityKind};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::fs;
use std::path::Path;

const MAX_COLUMN_WIDTH: usize = 50;

/// Rows written to one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetCount {
    pub sheet: String,
    pub rows: usize,
}

/// Write a workbook with a sheet for every kind that has entities.
///
/// Returns the row count per sheet, in kind order.
pub fn export_xlsx(index: &OntologyIndex, path: &Path) -> Result<Vec<SheetCount>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let mut counts = Vec::new();

    for kind in EntityKind::all() {
        let entities = index.by_kind(*kind);
        if entities.is_empty() {
            continue;
        }
        let sheet = workbook.add_worksheet();
        sheet.set_name(kind.plural_title())?;
        write_sheet(sheet, *kind, &entities, &header)?;
        counts.push(SheetCount {
            sheet: kind.plural_title().to_string(),
            rows: entities.len(),
        });
    }

    // A workbook needs at least one sheet
    if counts.is_empty() {
        workbook.add_worksheet().set_name(EntityKind::Concept.plural_title())?;
    }

    workbook.save(path)?;
    tracing::debug!(sheets = counts.len(), path = %path.display(), "exported XLSX");
    Ok(counts)
}

fn columns(kind: EntityKind) -> Vec<&'static str> {
    let mut columns = vec!["ID", "Name", "Definition", "Purpose"];
    columns.extend_from_slice(match kind {
        EntityKind::Concept => &["Status", "Meta-meta"],
        EntityKind::Method => &["Method type", "Steps"],
        EntityKind::System => &["Components", "Boundaries"],
        EntityKind::Problem => &["Current state", "Desired state", "Metrics"],
        EntityKind::Artifact => &["Artifact type", "Template"],
    });
    columns.extend_from_slice(&["Examples", "Relations", "Created", "Updated"]);
    columns
}

fn cells(entity: &Entity) -> Vec<String> {
    let mut cells = vec![
        entity.id.to_string(),
        entity.name.clone(),
        entity.definition.clone(),
        entity.purpose.clone(),
    ];
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    match &entity.details {
        EntityDetails::Concept(c) => {
            cells.push(c.status.to_string());
            cells.push(c.meta_meta.map(|m| m.to_string()).unwrap_or_default());
        }
        EntityDetails::Method(m) => {
            cells.push(opt(&m.method_type));
            cells.push(m.steps.join("; "));
        }
        EntityDetails::System(s) => {
            cells.push(s.components.join("; "));
            cells.push(opt(&s.boundaries));
        }
        EntityDetails::Problem(p) => {
            cells.push(opt(&p.current_state));
            cells.push(opt(&p.desired_state));
            cells.push(p.metrics.join("; "));
        }
        EntityDetails::Artifact(a) => {
            cells.push(opt(&a.artifact_type));
            cells.push(opt(&a.template_ref));
        }
    }
    cells.push(join_examples(entity));
    cells.push(join_relations(entity));
    cells.push(timestamp(&entity.created));
    cells.push(timestamp(&entity.updated));
    cells
}

fn write_sheet(
    sheet: &mut Worksheet,
    kind: EntityKind,
    entities: &[&Entity],
    header: &Format,
) -> Result<()> {
    let columns = columns(kind);
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();

    for (col, title) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }
    for (row, entity) in entities.iter().enumerate() {
        for (col, value) in cells(entity).into_iter().enumerate() {
            let width = value.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            widths[col] = widths[col].max(width);
            sheet.write_string(row as u32 + 1, col as u16, value)?;
        }
    }
    for (col, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(col as u16, (width + 2).min(MAX_COLUMN_WIDTH) as f64)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}
