use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// The kinds of objects the catalog manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Workspace,
    Namespace,
    Store,
    Resource,
    Layer,
    Style,
    LayerGroup,
    /// The catalog itself, used as the target of default-selection change events.
    Catalog,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Workspace => "workspace",
            EntityKind::Namespace => "namespace",
            EntityKind::Store => "store",
            EntityKind::Resource => "resource",
            EntityKind::Layer => "layer",
            EntityKind::Style => "style",
            EntityKind::LayerGroup => "layer group",
            EntityKind::Catalog => "catalog",
        };
        write!(f, "{}", name)
    }
}

/// Index key for name lookups. `scope` is the owning workspace/namespace id
/// for entities whose names are only unique within that scope, `None` for
/// globally named entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub scope: Option<Id>,
    pub name: String,
}

impl EntityKey {
    pub fn global(name: &str) -> Self {
        Self {
            scope: None,
            name: name.to_string(),
        }
    }

    pub fn scoped(scope: Option<&Id>, name: &str) -> Self {
        Self {
            scope: scope.cloned(),
            name: name.to_string(),
        }
    }
}

/// Common capability of every object stored in the catalog: a stable id,
/// a display name and the key it is indexed under.
pub trait CatalogEntity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn id(&self) -> &Id;
    fn set_id(&mut self, id: Id);
    fn display_name(&self) -> &str;
    fn index_key(&self) -> EntityKey;
    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>>;
}

/// Serialize an entity to its property map. Entities are plain structs with
/// no skipped fields, so the map always carries the full shape.
pub fn to_property_map<E: CatalogEntity>(entity: &E) -> serde_json::Map<String, serde_json::Value> {
    match serde_json::to_value(entity) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Rebuild a typed entity from its property map.
pub fn from_property_map<E: CatalogEntity>(
    map: serde_json::Map<String, serde_json::Value>,
) -> Result<E, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(map))
}
