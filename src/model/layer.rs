use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id, ObjRef, StyleRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named publication of exactly one resource, with a default style and a
/// set of alternate styles. The name defaults from the wrapped resource
/// when left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Id,
    pub name: String,
    pub resource: ObjRef,
    pub default_style: Option<StyleRef>,
    pub styles: Vec<StyleRef>,
    pub enabled: bool,
    pub advertised: bool,
    pub date_created: Option<DateTime<Utc>>,
}

impl Layer {
    pub fn new(name: impl Into<String>, resource: ObjRef) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            resource,
            default_style: None,
            styles: Vec::new(),
            enabled: true,
            advertised: true,
            date_created: None,
        }
    }
}

impl CatalogEntity for Layer {
    const KIND: EntityKind = EntityKind::Layer;

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
