use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named container scoping stores and workspace-local styles and layer
/// groups. Paired 1:1 with a namespace by name/prefix equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Id,
    pub name: String,
    pub isolated: bool,
    pub date_created: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            isolated: false,
            date_created: None,
        }
    }
}

impl CatalogEntity for Workspace {
    const KIND: EntityKind = EntityKind::Workspace;

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
        EntityKey::global(&self.name)
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
