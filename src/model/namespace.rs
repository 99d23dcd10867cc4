use crate::model::{generate_id, CatalogEntity, EntityKey, EntityKind, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix + URI pair, paired 1:1 with the workspace of the same name.
/// Resources hang off a namespace, the prefix qualifies their names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: Id,
    pub prefix: String,
    pub uri: String,
    pub isolated: bool,
    pub date_created: Option<DateTime<Utc>>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            prefix: prefix.into(),
            uri: uri.into(),
            isolated: false,
            date_created: None,
        }
    }
}

impl CatalogEntity for Namespace {
    const KIND: EntityKind = EntityKind::Namespace;

    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn display_name(&self) -> &str {
        &self.prefix
    }

    fn index_key(&self) -> EntityKey {
        EntityKey::global(&self.prefix)
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
