use crate::error::CatalogError;
use crate::model::{
    DataStore, EntityKey, Id, Layer, LayerGroup, Namespace, Resource, Style, Workspace,
};
use crate::store::EntityIndex;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The canonical catalog state: one index per entity kind plus the default
/// selections. Cloneable so the facade can build the next state off to the
/// side and publish it in one swap.
#[derive(Debug, Clone)]
pub struct CatalogData {
    pub workspaces: EntityIndex<Workspace>,
    pub namespaces: EntityIndex<Namespace>,
    pub stores: EntityIndex<DataStore>,
    pub resources: EntityIndex<Resource>,
    pub layers: EntityIndex<Layer>,
    pub styles: EntityIndex<Style>,
    pub layer_groups: EntityIndex<LayerGroup>,
    pub default_workspace: Option<Id>,
    pub default_namespace: Option<Id>,
    /// Default store per workspace id.
    pub default_stores: BTreeMap<Id, Id>,
}

impl Default for CatalogData {
    fn default() -> Self {
        Self {
            workspaces: EntityIndex::new(),
            namespaces: EntityIndex::with_alt_key(|ns: &Namespace| Some(ns.uri.clone())),
            stores: EntityIndex::new(),
            resources: EntityIndex::new(),
            layers: EntityIndex::new(),
            styles: EntityIndex::new(),
            layer_groups: EntityIndex::new(),
            default_workspace: None,
            default_namespace: None,
            default_stores: BTreeMap::new(),
        }
    }
}

impl CatalogData {
    pub fn workspace_by_name(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.find_one_by_key(&EntityKey::global(name))
    }

    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<&Namespace> {
        self.namespaces.find_one_by_key(&EntityKey::global(prefix))
    }

    pub fn namespace_by_uri(&self, uri: &str) -> Option<&Namespace> {
        self.namespaces.find_by_alt_key(uri).into_iter().next()
    }

    pub fn store_by_name(&self, workspace: Option<&Id>, name: &str) -> Option<&DataStore> {
        self.stores
            .find_one_by_key(&EntityKey::scoped(workspace, name))
    }

    /// Store by name in any workspace, insertion order deciding ties.
    pub fn store_by_name_any(&self, name: &str) -> Option<&DataStore> {
        self.stores.iter().find(|s| s.name == name)
    }

    pub fn resource_by_name(&self, namespace: Option<&Id>, name: &str) -> Option<&Resource> {
        match namespace {
            Some(_) => self
                .resources
                .find_one_by_key(&EntityKey::scoped(namespace, name)),
            None => self.resources.iter().find(|r| r.name == name),
        }
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.find_one_by_key(&EntityKey::global(name))
    }

    /// Workspace-scoped style, falling back to the global bucket when the
    /// scoped lookup misses or no scope is given.
    pub fn style_by_name(&self, workspace: Option<&Id>, name: &str) -> Option<&Style> {
        if workspace.is_some() {
            if let Some(style) = self
                .styles
                .find_one_by_key(&EntityKey::scoped(workspace, name))
            {
                return Some(style);
            }
        }
        self.styles.find_one_by_key(&EntityKey::global(name))
    }

    pub fn layer_group_by_name(&self, workspace: Option<&Id>, name: &str) -> Option<&LayerGroup> {
        if workspace.is_some() {
            if let Some(group) = self
                .layer_groups
                .find_one_by_key(&EntityKey::scoped(workspace, name))
            {
                return Some(group);
            }
        }
        self.layer_groups.find_one_by_key(&EntityKey::global(name))
    }

    pub fn stores_by_workspace(&self, workspace: &Id) -> Vec<&DataStore> {
        self.stores
            .iter()
            .filter(|s| s.workspace.points_to(workspace))
            .collect()
    }

    pub fn resources_by_store(&self, store: &Id) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.store.points_to(store))
            .collect()
    }

    pub fn resources_by_namespace(&self, namespace: &Id) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.namespace.points_to(namespace))
            .collect()
    }

    pub fn layers_by_resource(&self, resource: &Id) -> Vec<&Layer> {
        self.layers
            .iter()
            .filter(|l| l.resource.points_to(resource))
            .collect()
    }

    pub fn styles_by_workspace(&self, workspace: &Id) -> Vec<&Style> {
        self.styles
            .iter()
            .filter(|s| {
                s.workspace
                    .as_ref()
                    .map(|w| w.points_to(workspace))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn layer_groups_by_workspace(&self, workspace: &Id) -> Vec<&LayerGroup> {
        self.layer_groups
            .iter()
            .filter(|g| {
                g.workspace
                    .as_ref()
                    .map(|w| w.points_to(workspace))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Groups with an entry referencing the given layer, in their main
    /// sequence or any nested group style.
    pub fn layer_groups_referencing_layer(&self, layer: &Id) -> Vec<&LayerGroup> {
        self.layer_groups
            .iter()
            .filter(|g| {
                !g.positions_of_layer(layer).is_empty()
                    || g.group_styles
                        .iter()
                        .any(|gs| gs.layers.iter().any(|e| e.points_to_layer(layer)))
            })
            .collect()
    }

    /// Groups containing the given group as a nested entry.
    pub fn layer_groups_referencing_group(&self, group: &Id) -> Vec<&LayerGroup> {
        self.layer_groups
            .iter()
            .filter(|g| {
                !g.positions_of_group(group).is_empty()
                    || g.group_styles
                        .iter()
                        .any(|gs| gs.layers.iter().any(|e| e.points_to_group(group)))
            })
            .collect()
    }

    /// Whether a name exists as the label of a group style nested in any
    /// layer group. Such names are style identities without a standalone
    /// catalog style behind them.
    pub fn has_group_style_named(&self, name: &str) -> bool {
        self.layer_groups
            .iter()
            .any(|g| g.group_styles.iter().any(|gs| gs.name == name))
    }
}

/// Snapshot holder. Readers clone the `Arc` out of a briefly-held read
/// lock and work on an immutable, fully-committed state; writers serialize
/// on the write mutex, build the next state aside and publish it in one
/// swap. A failed mutation leaves the published state untouched.
pub struct CatalogFacade {
    current: RwLock<Arc<CatalogData>>,
    write_lock: Mutex<()>,
}

impl Default for CatalogFacade {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogData::default())),
            write_lock: Mutex::new(()),
        }
    }
}

impl CatalogFacade {
    pub fn snapshot(&self) -> Arc<CatalogData> {
        self.current.read().clone()
    }

    pub fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut CatalogData) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let _writer = self.write_lock.lock();
        let mut next = (**self.current.read()).clone();
        let out = apply(&mut next)?;
        *self.current.write() = Arc::new(next);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, ObjRef};

    #[test]
    fn failed_mutation_leaves_the_snapshot_untouched() {
        let facade = CatalogFacade::default();
        facade
            .mutate(|data| {
                data.workspaces.add(Workspace::new("topp"));
                Ok(())
            })
            .unwrap();

        let result: Result<(), _> = facade.mutate(|data| {
            data.workspaces.add(Workspace::new("doomed"));
            Err(CatalogError::validation(
                EntityKind::Workspace,
                "doomed",
                "refused",
            ))
        });
        assert!(result.is_err());
        assert_eq!(facade.snapshot().workspaces.len(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot_across_writes() {
        let facade = CatalogFacade::default();
        let before = facade.snapshot();
        facade
            .mutate(|data| {
                data.workspaces.add(Workspace::new("topp"));
                Ok(())
            })
            .unwrap();
        assert_eq!(before.workspaces.len(), 0);
        assert_eq!(facade.snapshot().workspaces.len(), 1);
    }

    #[test]
    fn style_lookup_prefers_the_workspace_scope() {
        let facade = CatalogFacade::default();
        let ws = Workspace::new("topp");
        let ws_id = ws.id.clone();
        facade
            .mutate(|data| {
                data.workspaces.add(ws.clone());
                data.styles.add(Style::new("roads"));
                let mut scoped = Style::new("roads");
                scoped.workspace = Some(ObjRef::Id(ws.id.clone()));
                data.styles.add(scoped);
                Ok(())
            })
            .unwrap();

        let snapshot = facade.snapshot();
        let scoped = snapshot.style_by_name(Some(&ws_id), "roads").unwrap();
        assert!(scoped.workspace.is_some());
        let global = snapshot.style_by_name(None, "roads").unwrap();
        assert!(global.workspace.is_none());
    }
}
