use crate::error::CatalogError;
use crate::model::{EntityKind, Id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Ordered list of (property, old, new) value triples describing a staged
/// modification. This is exactly what a modify event carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifiedDiff {
    entries: Vec<DiffEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub property: String,
    pub old_value: Value,
    pub new_value: Value,
}

impl ModifiedDiff {
    pub fn push(&mut self, property: String, old_value: Value, new_value: Value) {
        self.entries.push(DiffEntry {
            property,
            old_value,
            new_value,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn properties(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.property.as_str()).collect()
    }

    pub fn values_of(&self, property: &str) -> Option<(&Value, &Value)> {
        self.entries
            .iter()
            .find(|e| e.property == property)
            .map(|e| (&e.old_value, &e.new_value))
    }

    pub fn contains(&self, property: &str) -> bool {
        self.entries.iter().any(|e| e.property == property)
    }
}

/// Lifecycle notification fired by the catalog. The affected entity rides
/// along as its serialized property map so listeners of any kind can look
/// at it without generics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEvent {
    pub kind: EntityKind,
    pub id: Id,
    pub name: String,
    pub change: CatalogChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum CatalogChange {
    Added { entity: Value },
    /// Fired before the diff is applied; a listener error here aborts the
    /// commit.
    Modified { diff: ModifiedDiff },
    /// Fired after the diff has been applied and indices updated.
    PostModified { diff: ModifiedDiff },
    Removed { entity: Value },
}

impl CatalogEvent {
    pub fn change_name(&self) -> &'static str {
        match self.change {
            CatalogChange::Added { .. } => "added",
            CatalogChange::Modified { .. } => "modified",
            CatalogChange::PostModified { .. } => "post-modified",
            CatalogChange::Removed { .. } => "removed",
        }
    }
}

/// Observer of catalog mutations. Dispatch is synchronous, in registration
/// order; an error return propagates to the caller of the mutating
/// operation. Events are advisory: a failing listener never rolls back a
/// change that was already applied.
pub trait CatalogListener: Send + Sync {
    fn handle(&self, event: &CatalogEvent) -> anyhow::Result<()>;
}

/// Listener registry owned by one catalog instance. No process-wide state.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn CatalogListener>>,
}

impl ListenerRegistry {
    pub fn add(&mut self, listener: Arc<dyn CatalogListener>) {
        self.listeners.push(listener);
    }

    pub fn remove(&mut self, listener: &Arc<dyn CatalogListener>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn CatalogListener>> {
        self.listeners.clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Fire an event at every listener in order, stopping at the first error.
pub fn dispatch(
    listeners: &[Arc<dyn CatalogListener>],
    event: &CatalogEvent,
) -> Result<(), CatalogError> {
    for listener in listeners {
        listener
            .handle(event)
            .map_err(|source| CatalogError::Listener {
                event: event.change_name(),
                source,
            })?;
    }
    Ok(())
}
