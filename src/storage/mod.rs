//! Storage layer for ontology data.
//!
//! Every entity lives in its own Markdown file under the ontology root:
//!
//! ```text
//! .ontology/
//!   README.md
//!   config.kdl
//!   concepts/C_1_agency.md
//!   methods/M_1_retro.md
//!   systems/  problems/  artifacts/
//! ```
//!
//! See [`markdown`] for the document format.

pub mod markdown;

use crate::models::{Entity, EntityId, EntityKind};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default ontology root, relative to the working directory.
pub const DEFAULT_ROOT: &str = ".ontology";

/// A file that could not be turned into an entity during a bulk load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of [`Storage::load_all`]: everything that decoded, plus what did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Decoded entities with the file each came from
    pub entities: Vec<(PathBuf, Entity)>,
    pub failures: Vec<LoadFailure>,
}

/// Storage manager for a single ontology root.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Root directory holding the kind directories
    pub root: PathBuf,
}

impl Storage {
    /// Open an existing ontology.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(Error::NotInitialized(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Create the directory layout and README. Safe to run twice.
    pub fn init(root: &Path, project_name: &str) -> Result<Self> {
        for kind in EntityKind::all() {
            fs::create_dir_all(root.join(kind.dir_name()))?;
        }

        let readme = root.join("README.md");
        if !readme.exists() {
            fs::write(&readme, readme_content(project_name))?;
        }

        debug!(root = %root.display(), "initialized ontology layout");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Check whether an ontology exists at `root`.
    pub fn exists(root: &Path) -> bool {
        root.is_dir() && root.join(EntityKind::Concept.dir_name()).is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding entities of one kind.
    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path an entity is written to.
    pub fn entity_path(&self, entity: &Entity) -> PathBuf {
        self.kind_dir(entity.kind()).join(markdown::file_name(entity))
    }

    /// Path of the session config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.kdl")
    }

    /// Decode every `*.md` file in every kind directory.
    ///
    /// Files are visited in name order. A file that fails to read or decode,
    /// or whose ID belongs to a different kind than its directory, is recorded
    /// as a [`LoadFailure`] and skipped.
    pub fn load_all(&self) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for kind in EntityKind::all() {
            for path in self.markdown_files(*kind)? {
                match self.load_file(&path, *kind) {
                    Ok(entity) => report.entities.push((path, entity)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable entity file");
                        report.failures.push(LoadFailure {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            loaded = report.entities.len(),
            failed = report.failures.len(),
            "loaded ontology from {}",
            self.root.display()
        );
        Ok(report)
    }

    /// Decode a single file, requiring it to hold an entity of `kind`.
    pub fn load_file(&self, path: &Path, kind: EntityKind) -> Result<Entity> {
        let content = fs::read_to_string(path)?;
        let entity = markdown::decode(&content)?;
        if entity.kind() != kind {
            return Err(Error::Decode(format!(
                "{} is a {} but lives in {}/",
                entity.id,
                entity.kind(),
                kind.dir_name()
            )));
        }
        Ok(entity)
    }

    /// Write an entity to `<kind dir>/<ID>_<slug>.md`.
    ///
    /// Without `overwrite`, fails if any file for this ID already exists.
    /// With it, files for the same ID under an older name are removed.
    pub fn save(&self, entity: &Entity, overwrite: bool) -> Result<PathBuf> {
        let path = self.entity_path(entity);
        let existing = self.find_files(&entity.id)?;

        if !overwrite {
            if let Some(found) = existing.first() {
                return Err(Error::AlreadyExists(found.clone()));
            }
        }

        fs::create_dir_all(self.kind_dir(entity.kind()))?;
        fs::write(&path, markdown::encode(entity)?)?;

        for stale in existing.iter().filter(|p| **p != path) {
            debug!(id = %entity.id, path = %stale.display(), "removing stale entity file");
            fs::remove_file(stale)?;
        }

        debug!(id = %entity.id, path = %path.display(), "saved entity");
        Ok(path)
    }

    /// Delete every file stored for `id`.
    pub fn delete(&self, id: &EntityId) -> Result<Vec<PathBuf>> {
        let files = self.find_files(id)?;
        if files.is_empty() {
            return Err(Error::NotFound(format!("no file for {}", id)));
        }
        for path in &files {
            fs::remove_file(path)?;
        }
        debug!(id = %id, count = files.len(), "deleted entity files");
        Ok(files)
    }

    /// Files named `<ID>.md` or `<ID>_*.md` in the entity's kind directory.
    pub fn find_files(&self, id: &EntityId) -> Result<Vec<PathBuf>> {
        let exact = format!("{}.md", id);
        let prefix = format!("{}_", id);
        Ok(self
            .markdown_files(id.kind)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n == exact || n.starts_with(&prefix))
            })
            .collect())
    }

    fn markdown_files(&self, kind: EntityKind) -> Result<Vec<PathBuf>> {
        let dir = self.kind_dir(kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn readme_content(project_name: &str) -> String {
    let mut layout = String::new();
    for kind in EntityKind::all() {
        layout.push_str(&format!(
            "- `{}/`: {} ({}_*)\n",
            kind.dir_name(),
            kind.plural_title().to_lowercase(),
            kind.prefix()
        ));
    }
    format!(
        "# {}\n\nProject ontology managed with `ontology`.\n\n## Layout\n\n{}\n## Usage\n\n```bash\nontology add \"Concept name\"\nontology list\nontology audit\nontology export --format csv\n```\n",
        project_name, layout
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationType;
    use crate::test_utils::TestEnv;

    fn concept(id: &str, name: &str) -> Entity {
        let id: EntityId = id.parse().unwrap();
        Entity::create(EntityKind::Concept, name, id).unwrap()
    }

    #[test]
    fn test_init_creates_layout() {
        let env = TestEnv::new();
        let storage = env.init_storage();

        for kind in EntityKind::all() {
            assert!(storage.kind_dir(*kind).is_dir());
        }
        let readme = fs::read_to_string(env.root().join("README.md")).unwrap();
        assert!(readme.starts_with("# Test Ontology\n"));
        assert!(readme.contains("`concepts/`"));
        assert!(Storage::exists(&env.root()));
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_readme() {
        let env = TestEnv::new();
        env.init_storage();
        fs::write(env.root().join("README.md"), "custom").unwrap();

        Storage::init(&env.root(), "Other").unwrap();
        assert_eq!(fs::read_to_string(env.root().join("README.md")).unwrap(), "custom");
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let env = TestEnv::new();
        assert!(matches!(
            Storage::open(&env.root()),
            Err(Error::NotInitialized(_))
        ));
    }

    #[test]
    fn test_save_and_load_all() {
        let env = TestEnv::new();
        let storage = env.init_storage();

        let mut entity = concept("C_1", "Личный контракт");
        entity.add_relation("C_2", RelationType::Requires, None);
        let path = storage.save(&entity, false).unwrap();
        assert!(path.ends_with("concepts/C_1_lichnyy_kontrakt.md"));

        let report = env.open_storage().load_all().unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.entities, vec![(path, entity)]);
    }

    #[test]
    fn test_save_without_overwrite_fails_on_existing() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let entity = concept("C_1", "Agency");
        storage.save(&entity, false).unwrap();

        let err = storage.save(&entity, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        storage.save(&entity, true).unwrap();
    }

    #[test]
    fn test_save_after_rename_removes_stale_file() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let mut entity = concept("C_1", "Agency");
        let old = storage.save(&entity, false).unwrap();

        entity.rename("Autonomy").unwrap();
        let new = storage.save(&entity, true).unwrap();

        assert!(!old.exists());
        assert!(new.exists());
        assert_eq!(storage.find_files(&entity.id).unwrap(), vec![new]);
    }

    #[test]
    fn test_find_files_does_not_match_longer_ids() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage.save(&concept("C_1", "One"), false).unwrap();
        storage.save(&concept("C_10", "Ten"), false).unwrap();
        storage.save(&concept("C_11", "???"), false).unwrap();

        let found = storage.find_files(&"C_1".parse().unwrap()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("C_1_one.md"));
    }

    #[test]
    fn test_delete() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let entity = concept("C_1", "Agency");
        let path = storage.save(&entity, false).unwrap();

        assert_eq!(storage.delete(&entity.id).unwrap(), vec![path.clone()]);
        assert!(!path.exists());
        assert!(matches!(storage.delete(&entity.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_all_collects_failures_and_continues() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage.save(&concept("C_1", "Good"), false).unwrap();
        env.write_raw("concepts", "C_2_broken.md", "no front matter here");
        env.write_raw("concepts", "C_3_bad_yaml.md", "---\nid: [unclosed\n---\n");
        env.write_raw("methods", "C_4_misplaced.md", "---\nid: C_4\nname: Misplaced\n---\n");
        env.write_raw("concepts", "notes.txt", "ignored");

        let report = storage.load_all().unwrap();
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.failures.len(), 3);
        assert!(report.failures.iter().any(|f| f.path.ends_with("C_4_misplaced.md")
            && f.reason.contains("methods/")));
    }

    #[test]
    fn test_load_all_sorted_by_filename() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage.save(&concept("C_2", "b"), false).unwrap();
        storage.save(&concept("C_1", "a"), false).unwrap();

        let ids: Vec<String> = storage
            .load_all()
            .unwrap()
            .entities
            .iter()
            .map(|(_, e)| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["C_1", "C_2"]);
    }

    #[test]
    fn test_load_all_tolerates_missing_kind_dir() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        fs::remove_dir(storage.kind_dir(EntityKind::Artifact)).unwrap();
        assert!(storage.load_all().unwrap().entities.is_empty());
    }
}
