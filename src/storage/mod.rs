//! File-backed storage engine.
//!
//! [`FileStore`] owns the canonical in-memory table of every live entity,
//! keyed by the `Kind.id` composite key, and mirrors it to a single JSON
//! document. Durability is on demand: mutating operations update the table
//! only, and the caller decides when [`FileStore::persist`] runs.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Entity, KindRegistry};

/// Store path used when `HBNB_FILE` is unset.
pub const DEFAULT_STORE_FILE: &str = "file.json";

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("store file references unknown kind {0:?}")]
    UnknownKind(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// The object table plus its durable destination.
pub struct FileStore {
    path: PathBuf,
    objects: BTreeMap<String, Entity>,
}

impl FileStore {
    /// Open a store at `path`, loading the document if one exists. A
    /// missing file is not an error: the table starts empty.
    pub fn open(path: PathBuf, registry: &KindRegistry) -> Result<Self, StoreError> {
        let mut store = Self {
            path,
            objects: BTreeMap::new(),
        };
        store.reload(registry)?;
        Ok(store)
    }

    /// Open the store at the path named by `HBNB_FILE`, falling back to
    /// [`DEFAULT_STORE_FILE`] in the working directory.
    pub fn open_default(registry: &KindRegistry) -> Result<Self, StoreError> {
        let path = std::env::var("HBNB_FILE").unwrap_or_else(|_| DEFAULT_STORE_FILE.to_string());
        Self::open(PathBuf::from(path), registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ============================================================
    // Persistence
    // ============================================================

    /// Rebuild the table from the document, resolving each entry's kind
    /// through the registry. All-or-nothing: the new table is built aside
    /// and swapped in only on full success, so a failed reload leaves the
    /// prior table untouched.
    pub fn reload(&mut self, registry: &KindRegistry) -> Result<(), StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no store file, starting empty");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let doc: Map<String, Value> = serde_json::from_str(&text)
            .map_err(|err| self.corrupt(format!("not a JSON object: {err}")))?;

        let mut objects = BTreeMap::new();
        for (key, value) in &doc {
            let (kind_name, _) = key
                .split_once('.')
                .ok_or_else(|| self.corrupt(format!("bad composite key {key:?}")))?;
            let kind = registry
                .resolve(kind_name)
                .map_err(|_| StoreError::UnknownKind(kind_name.to_string()))?;
            let fields = value
                .as_object()
                .ok_or_else(|| self.corrupt(format!("entry {key:?} is not an object")))?;
            let entity = Entity::restore(kind, fields)
                .map_err(|err| self.corrupt(format!("entry {key:?}: {err}")))?;
            objects.insert(entity.key(), entity);
        }

        tracing::debug!(path = %self.path.display(), count = objects.len(), "reloaded store");
        self.objects = objects;
        Ok(())
    }

    /// Serialize the whole table and overwrite the destination atomically:
    /// the document is written to a sibling temp file and renamed over the
    /// target, so a failed write never leaves a half-written store.
    pub fn persist(&self) -> Result<(), StoreError> {
        let mut doc = Map::new();
        for (key, entity) in &self.objects {
            doc.insert(key.clone(), Value::Object(entity.to_document()));
        }
        let text = serde_json::to_string(&doc).map_err(io::Error::from)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), count = self.objects.len(), "persisted store");
        Ok(())
    }

    // ============================================================
    // Table operations
    // ============================================================

    /// Insert or replace the entry for the entity's composite key. Does not
    /// persist; durability is triggered explicitly by the caller.
    pub fn put(&mut self, entity: Entity) {
        self.objects.insert(entity.key(), entity);
    }

    pub fn get(&self, kind: &str, id: &str) -> Option<&Entity> {
        self.objects.get(&composite_key(kind, id))
    }

    pub fn get_mut(&mut self, kind: &str, id: &str) -> Option<&mut Entity> {
        self.objects.get_mut(&composite_key(kind, id))
    }

    /// Entities in key order, restricted to one kind if a filter is given.
    /// Order is stable across calls within a session.
    pub fn all<'a>(&'a self, kind: Option<&'a str>) -> impl Iterator<Item = &'a Entity> + 'a {
        self.objects
            .values()
            .filter(move |entity| kind.map_or(true, |k| entity.kind_name() == k))
    }

    /// Remove one entry. Not-found is a reportable outcome for the caller,
    /// not an error.
    pub fn remove(&mut self, kind: &str, id: &str) -> bool {
        let removed = self.objects.remove(&composite_key(kind, id)).is_some();
        if removed {
            tracing::debug!(kind, id, "removed entity");
        }
        removed
    }

    pub fn count(&self, kind: Option<&str>) -> usize {
        self.all(kind).count()
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

fn composite_key(kind: &str, id: &str) -> String {
    format!("{kind}.{id}")
}
