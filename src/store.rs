//! Persistence collaborator.
//!
//! Controllers only ever fetch by id, fetch a collection, save and delete.
//! Everything else about storage belongs to the [`Store`] implementation.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Error;

/// A persisted record addressed by integer id.
///
/// Serializes flat, so templates read `resource.id` and `resource.title` alike.
/// The record id always wins over a stored field called `id`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Resource {
    id: Option<i64>,
    model: String,
    fields: BTreeMap<String, String>,
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields.iter().filter(|(name, _)| name.as_str() != "id");
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Resource {
    /// An unsaved record of `model`.
    pub fn new(model: &str) -> Self {
        Self { id: None, model: model.to_owned(), fields: BTreeMap::new() }
    }

    /// An unsaved record of `model` holding `fields`.
    pub fn with_fields<I, K, V>(model: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut resource = Self::new(model);
        for (name, value) in fields {
            resource.set(name, value);
        }
        resource
    }

    pub fn id(&self) -> Option<i64> { self.id }
    pub fn model(&self) -> &str { &self.model }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &BTreeMap<String, String> { &self.fields }

    /// Show-page location under `base`: `base/{id}`. `None` until saved.
    pub fn link(&self, base: &str) -> Option<String> {
        self.id.map(|id| format!("{base}/{id}"))
    }

    /// Edit-page location under `base`: `base/{id}/edit`.
    pub fn edit_link(&self, base: &str) -> Option<String> {
        self.link(base).map(|link| link + "/edit")
    }
}

/// The persistence collaborator. Calls are synchronous and either return or fail.
pub trait Store: Send + Sync {
    fn fetch_by_id(&self, model: &str, id: i64) -> Result<Option<Resource>, Error>;

    fn fetch_all(&self, model: &str) -> Result<Vec<Resource>, Error>;

    /// Inserts or overwrites `resource`, assigning an id on first save.
    fn save(&self, resource: &mut Resource) -> Result<i64, Error>;

    fn delete(&self, resource: &Resource) -> Result<(), Error>;
}

/// A process-local [`Store`], ordered by id within each model.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    models: HashMap<String, BTreeMap<i64, Resource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn fetch_by_id(&self, model: &str, id: i64) -> Result<Option<Resource>, Error> {
        Ok(self.inner.read().models.get(model).and_then(|rows| rows.get(&id)).cloned())
    }

    fn fetch_all(&self, model: &str) -> Result<Vec<Resource>, Error> {
        Ok(self.inner.read()
            .models
            .get(model)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn save(&self, resource: &mut Resource) -> Result<i64, Error> {
        if resource.model.is_empty() {
            return Err(Error::Store("resource has no model".to_owned()));
        }
        let mut tables = self.inner.write();
        let id = match resource.id {
            Some(id) => id,
            None => {
                tables.next_id += 1;
                tables.next_id
            }
        };
        resource.id = Some(id);
        tables.models.entry(resource.model.clone()).or_default().insert(id, resource.clone());
        Ok(id)
    }

    fn delete(&self, resource: &Resource) -> Result<(), Error> {
        let id = resource.id.ok_or_else(|| Error::Store("cannot delete an unsaved resource".to_owned()))?;
        if let Some(rows) = self.inner.write().models.get_mut(&resource.model) {
            rows.remove(&id);
        }
        Ok(())
    }
}
