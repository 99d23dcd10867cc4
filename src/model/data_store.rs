use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id, ObjRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named data source owned by exactly one workspace, owning resources.
/// The name is unique within the owning workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    pub id: Id,
    pub name: String,
    pub workspace: ObjRef,
    pub enabled: bool,
    pub connection_parameters: BTreeMap<String, String>,
    pub date_created: Option<DateTime<Utc>>,
}

impl DataStore {
    pub fn new(name: impl Into<String>, workspace: ObjRef) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            workspace,
            enabled: true,
            connection_parameters: BTreeMap::new(),
            date_created: None,
        }
    }
}

impl CatalogEntity for DataStore {
    const KIND: EntityKind = EntityKind::Store;

    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn index_key(&self) -> EntityKey {
        EntityKey::scoped(self.workspace.target_id(), &self.name)
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
