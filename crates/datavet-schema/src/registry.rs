//! Concurrent schema cache

use crate::loader::load_from_file;
use crate::model::SchemaDocument;
use crate::Result;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Parsed schemas keyed by canonical path, shared across concurrent runs
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<PathBuf, Arc<SchemaDocument>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema for a path, loading it on first use
    ///
    /// # Errors
    ///
    /// Any error from [`load_from_file`]; failures are not cached.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<SchemaDocument>> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if let Some(cached) = self.schemas.get(&key) {
            debug!("Cache hit for schema: {:?}", key);
            return Ok(Arc::clone(cached.value()));
        }

        trace!("Cache miss for schema: {:?}", key);
        let schema = Arc::new(load_from_file(path)?);
        let entry = self.schemas.entry(key).or_insert(schema);
        Ok(Arc::clone(entry.value()))
    }

    /// Register an already loaded schema under a path
    pub fn register(&self, path: impl Into<PathBuf>, schema: SchemaDocument) {
        self.schemas.insert(path.into(), Arc::new(schema));
    }

    /// Check if a path is cached
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.schemas.contains_key(path)
    }

    /// Number of cached schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
