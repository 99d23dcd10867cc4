use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id, ObjRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named rendering rule set. Globally named, or unique within a workspace
/// when one is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: Id,
    pub name: String,
    pub workspace: Option<ObjRef>,
    pub filename: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
}

impl Style {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            workspace: None,
            filename: None,
            date_created: None,
        }
    }

    /// Minimal style carrying just a name, used for virtual group-style
    /// references. Not registered in the catalog.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            workspace: None,
            filename: None,
            date_created: None,
        }
    }
}

impl CatalogEntity for Style {
    const KIND: EntityKind = EntityKind::Style;

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
        EntityKey::scoped(
            self.workspace.as_ref().and_then(|w| w.target_id()),
            &self.name,
        )
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
