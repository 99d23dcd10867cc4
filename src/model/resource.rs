use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id, ObjRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    FeatureType,
    Coverage,
    RemoteLayer,
}

/// A published dataset owned by one store and one namespace. The name is
/// unique within the namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Id,
    pub name: String,
    /// Name of the dataset inside the backing store, defaults to `name`.
    pub native_name: Option<String>,
    pub title: Option<String>,
    pub kind: ResourceKind,
    pub store: ObjRef,
    pub namespace: ObjRef,
    pub enabled: bool,
    pub advertised: bool,
    pub date_created: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        kind: ResourceKind,
        store: ObjRef,
        namespace: ObjRef,
    ) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            native_name: None,
            title: None,
            kind,
            store,
            namespace,
            enabled: true,
            advertised: true,
            date_created: None,
        }
    }
}

impl CatalogEntity for Resource {
    const KIND: EntityKind = EntityKind::Resource;

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
        EntityKey::scoped(self.namespace.target_id(), &self.name)
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
