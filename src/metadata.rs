//! Type schema registration and the property metadata cache
//!
//! Rust has no runtime member discovery, so object types are described by
//! explicitly registered [`TypeSchema`]s. The registry memoizes the ordered
//! property sequence per type name; discovery is idempotent (it reads an
//! immutable schema), so concurrent first access simply computes redundantly
//! and the last writer wins with an identical result. No caller ever observes
//! a partially populated entry because entries are inserted whole.

use crate::error::{FixtureError, FixtureResult};
use crate::property::{Property, TypeSpec};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-type descriptor table: ordered properties registered under a name
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    properties: Vec<Property>,
}

impl TypeSchema {
    /// New empty schema for the given type name
    pub fn new(name: impl Into<String>) -> Self {
        TypeSchema {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property, preserving declaration order
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Registered type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered property sequence
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }
}

/// Registry of type schemas with a memoized property lookup
#[derive(Debug, Default)]
pub struct TypeRegistry {
    schemas: RwLock<HashMap<String, Arc<TypeSchema>>>,
    cache: RwLock<HashMap<String, Arc<[Property]>>>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Register a schema. Setup-time only; re-registering a name replaces
    /// the previous schema and drops its cached properties.
    pub fn register(&self, schema: TypeSchema) {
        let name = schema.name().to_string();
        self.write_schemas().insert(name.clone(), Arc::new(schema));
        self.write_cache().remove(&name);
    }

    /// Whether a schema is registered under this name
    pub fn contains(&self, type_name: &str) -> bool {
        self.read_schemas().contains_key(type_name)
    }

    /// Ordered property sequence for a registered object type
    ///
    /// The first caller for a type runs discovery and populates the cache;
    /// later callers get the cached sequence. Schemas containing a volatile
    /// property are re-discovered on every call and never cached.
    pub fn get_properties(&self, type_name: &str) -> FixtureResult<Arc<[Property]>> {
        if let Some(cached) = self.read_cache().get(type_name) {
            return Ok(Arc::clone(cached));
        }

        let schema = self
            .read_schemas()
            .get(type_name)
            .cloned()
            .ok_or_else(|| FixtureError::UnsupportedType {
                type_spec: TypeSpec::Object(type_name.to_string()).to_string(),
            })?;

        let properties: Arc<[Property]> = schema.properties().to_vec().into();
        if properties.iter().all(Property::is_cacheable) {
            debug!("caching {} properties for type `{}`", properties.len(), type_name);
            self.write_cache()
                .insert(type_name.to_string(), Arc::clone(&properties));
        } else {
            debug!("type `{}` holds volatile properties, skipping cache", type_name);
        }
        Ok(properties)
    }

    /// Drop every cached property sequence. Intended for isolation between
    /// test suites or benchmark iterations; not called concurrently with
    /// active generation by contract.
    pub fn clear_cache(&self) {
        self.write_cache().clear();
    }

    fn read_schemas(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<TypeSchema>>> {
        self.schemas.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_schemas(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<TypeSchema>>> {
        self.schemas.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<[Property]>>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<[Property]>>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}
