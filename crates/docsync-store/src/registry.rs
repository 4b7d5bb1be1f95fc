//! Registry mapping storage type tags to factories.
//!
//! A [`StorageSpec`] is a JSON object with a `type` tag and free-form options.
//! Decorating storages (`uuid`, `document`, `replicate`) nest their sub
//! storage specs and build them through the same registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::DocumentStorage;
use crate::error::{Result, StoreError};
use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;
use crate::traits::Storage;
use crate::uuid_storage::UuidStorage;

/// Description of a storage to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Type tag selecting the factory.
    #[serde(rename = "type")]
    pub kind: String,
    /// Everything else in the spec object.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl StorageSpec {
    /// A spec with no options.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Map::new(),
        }
    }

    /// Add an option.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Parse a spec from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| StoreError::InvalidSpec(e.to_string()))
    }

    /// Optional string option.
    pub fn str_option(&self, key: &str) -> Result<Option<&str>> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(StoreError::InvalidSpec(format!(
                "{}: expected a string, got {}",
                key, other
            ))),
        }
    }

    /// Required nested sub storage spec.
    pub fn sub_storage(&self, key: &str) -> Result<StorageSpec> {
        let value = self
            .options
            .get(key)
            .ok_or_else(|| StoreError::InvalidSpec(format!("{}: missing sub storage", key)))?;
        Self::from_value(value.clone())
    }
}

/// Builds a storage from its spec. The registry is passed along so that
/// decorators can build their sub storages.
pub type StorageFactory =
    Arc<dyn Fn(&StorageSpec, &StorageRegistry) -> Result<Arc<dyn Storage>> + Send + Sync>;

/// Explicit registry of storage factories.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    factories: HashMap<String, StorageFactory>,
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("StorageRegistry").field("kinds", &kinds).finish()
    }
}

impl StorageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `memory`, `sqlite`, `uuid` and `document` registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register("memory", |_, _| Ok(Arc::new(MemoryStorage::new())));

        registry.register("sqlite", |spec, _| {
            let storage = match spec.str_option("path")? {
                Some(path) => SqliteStorage::open(path)?,
                None => SqliteStorage::open_memory()?,
            };
            Ok(Arc::new(storage))
        });

        registry.register("uuid", |spec, registry| {
            let inner = registry.create(&spec.sub_storage("sub_storage")?)?;
            Ok(Arc::new(UuidStorage::new(inner)))
        });

        registry.register("document", |spec, registry| {
            let inner = registry.create(&spec.sub_storage("sub_storage")?)?;
            let host = spec
                .str_option("document_id")?
                .ok_or_else(|| StoreError::InvalidSpec("document_id: missing".into()))?;
            Ok(Arc::new(DocumentStorage::new(inner, host)))
        });

        registry
    }

    /// Register (or replace) the factory for a type tag.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&StorageSpec, &StorageRegistry) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Whether a factory is registered for the tag.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build a storage from a spec.
    pub fn create(&self, spec: &StorageSpec) -> Result<Arc<dyn Storage>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| StoreError::UnknownType(spec.kind.clone()))?;
        debug!(kind = %spec.kind, "creating storage");
        factory(spec, self)
    }

    /// Build a storage from a raw JSON spec.
    pub fn create_from_json(&self, value: Value) -> Result<Arc<dyn Storage>> {
        self.create(&StorageSpec::from_value(value)?)
    }
}
