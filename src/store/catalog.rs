use crate::config::CascadeConfig;
use crate::error::CatalogError;
use crate::logic::{
    apply_group_change, apply_layer_change, CascadeOp, CascadePlan, CascadePlanner,
    ModificationProxy, Resolver, Validator,
};
use crate::model::{
    CatalogEntity, DataStore, EntityKind, Id, Layer, LayerGroup, Namespace, ObjRef, Resource,
    Style, Workspace,
};
use crate::store::{
    dispatch, CatalogChange, CatalogData, CatalogEvent, CatalogFacade, CatalogListener,
    ListenerRegistry, ModifiedDiff,
};
use chrono::Utc;
use log::debug;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The catalog: canonical owner of every configuration entity.
///
/// All mutation goes through `add_*`, `save_*` and `remove_*`; lookups hand
/// out modification proxies (or owned snapshots for bulk queries), never
/// the canonical instances. Reads work on immutable snapshots and never
/// block behind a writer; writes serialize on the facade and publish fully
/// committed states only.
pub struct Catalog {
    facade: CatalogFacade,
    listeners: RwLock<ListenerRegistry>,
    cascade: CascadeConfig,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CascadeConfig::default())
    }
}

impl Catalog {
    pub fn new(cascade: CascadeConfig) -> Self {
        Self {
            facade: CatalogFacade::default(),
            listeners: RwLock::new(ListenerRegistry::default()),
            cascade,
        }
    }

    /// Immutable snapshot of the current state. Stale the moment a writer
    /// commits, consistent forever.
    pub fn snapshot(&self) -> Arc<CatalogData> {
        self.facade.snapshot()
    }

    pub fn cascade_config(&self) -> &CascadeConfig {
        &self.cascade
    }

    // ---- listeners -----------------------------------------------------

    pub fn add_listener(&self, listener: Arc<dyn CatalogListener>) {
        self.listeners.write().add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn CatalogListener>) {
        self.listeners.write().remove(listener);
    }

    fn fire(&self, event: CatalogEvent) -> Result<(), CatalogError> {
        let listeners = self.listeners.read().snapshot();
        dispatch(&listeners, &event)
    }

    // ---- workspaces ----------------------------------------------------

    pub fn add_workspace(&self, mut workspace: Workspace) -> Result<Id, CatalogError> {
        prepare(&mut workspace);
        let id = workspace.id.clone();
        let promoted = self.facade.mutate(|data| {
            Validator::workspace(data, &workspace, true)?;
            data.workspaces.add(workspace.clone());
            if data.default_workspace.is_none() {
                data.default_workspace = Some(id.clone());
                return Ok(true);
            }
            Ok(false)
        })?;
        debug!("added workspace `{}`", workspace.name);
        self.fire(added_event(&workspace))?;
        if promoted {
            self.fire(defaults_event("default_workspace", Value::Null, json!(id)))?;
        }
        Ok(id)
    }

    pub fn get_workspace(&self, id: &Id) -> Option<ModificationProxy<Workspace>> {
        self.snapshot()
            .workspaces
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<ModificationProxy<Workspace>> {
        self.snapshot()
            .workspace_by_name(name)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn workspaces(&self) -> Vec<ModificationProxy<Workspace>> {
        self.snapshot()
            .workspaces
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn default_workspace(&self) -> Option<ModificationProxy<Workspace>> {
        let snapshot = self.snapshot();
        snapshot
            .default_workspace
            .as_ref()
            .and_then(|id| snapshot.workspaces.get(id))
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn set_default_workspace(&self, id: Option<&Id>) -> Result<(), CatalogError> {
        let (old, new) = self.facade.mutate(|data| {
            if let Some(id) = id {
                if !data.workspaces.contains(id) {
                    return Err(CatalogError::not_found(EntityKind::Workspace, id.clone()));
                }
            }
            let old = data.default_workspace.clone();
            data.default_workspace = id.cloned();
            Ok((old, id.cloned()))
        })?;
        self.fire(defaults_event(
            "default_workspace",
            old.map(Value::String).unwrap_or(Value::Null),
            new.map(Value::String).unwrap_or(Value::Null),
        ))
    }

    /// Commit staged edits. Renaming a workspace renames the paired
    /// namespace's prefix along with it.
    pub fn save_workspace(
        &self,
        proxy: &mut ModificationProxy<Workspace>,
    ) -> Result<(), CatalogError> {
        let old_name = proxy.original().name.clone();
        self.save_entity(
            proxy,
            Validator::workspace,
            |data, entity| data.workspaces.update(entity),
            |data, id| data.workspaces.contains(id),
        )?;
        let new_name = proxy.original().name.clone();
        if old_name != new_name {
            if let Some(mut paired) = self
                .snapshot()
                .namespace_by_prefix(&old_name)
                .cloned()
                .map(ModificationProxy::wrap)
            {
                paired.update(|ns| ns.prefix = new_name.clone());
                self.save_namespace(&mut paired)?;
            }
        }
        Ok(())
    }

    pub fn remove_workspace(&self, id: &Id) -> Result<(), CatalogError> {
        let plan = self.plan_workspace_removal(id)?;
        self.execute_plan(plan)
    }

    pub fn plan_workspace_removal(&self, id: &Id) -> Result<CascadePlan, CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.workspaces.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Workspace, id.clone()));
        }
        Ok(CascadePlanner::new(&snapshot, &self.cascade).plan_workspace(id))
    }

    // ---- namespaces ----------------------------------------------------

    pub fn add_namespace(&self, mut namespace: Namespace) -> Result<Id, CatalogError> {
        prepare(&mut namespace);
        let id = namespace.id.clone();
        let promoted = self.facade.mutate(|data| {
            Validator::namespace(data, &namespace, true)?;
            data.namespaces.add(namespace.clone());
            if data.default_namespace.is_none() {
                data.default_namespace = Some(id.clone());
                return Ok(true);
            }
            Ok(false)
        })?;
        debug!("added namespace `{}`", namespace.prefix);
        self.fire(added_event(&namespace))?;
        if promoted {
            self.fire(defaults_event("default_namespace", Value::Null, json!(id)))?;
        }
        Ok(id)
    }

    pub fn get_namespace(&self, id: &Id) -> Option<ModificationProxy<Namespace>> {
        self.snapshot()
            .namespaces
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<ModificationProxy<Namespace>> {
        self.snapshot()
            .namespace_by_prefix(prefix)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn namespace_by_uri(&self, uri: &str) -> Option<ModificationProxy<Namespace>> {
        self.snapshot()
            .namespace_by_uri(uri)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn namespaces(&self) -> Vec<ModificationProxy<Namespace>> {
        self.snapshot()
            .namespaces
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn default_namespace(&self) -> Option<ModificationProxy<Namespace>> {
        let snapshot = self.snapshot();
        snapshot
            .default_namespace
            .as_ref()
            .and_then(|id| snapshot.namespaces.get(id))
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn set_default_namespace(&self, id: Option<&Id>) -> Result<(), CatalogError> {
        let (old, new) = self.facade.mutate(|data| {
            if let Some(id) = id {
                if !data.namespaces.contains(id) {
                    return Err(CatalogError::not_found(EntityKind::Namespace, id.clone()));
                }
            }
            let old = data.default_namespace.clone();
            data.default_namespace = id.cloned();
            Ok((old, id.cloned()))
        })?;
        self.fire(defaults_event(
            "default_namespace",
            old.map(Value::String).unwrap_or(Value::Null),
            new.map(Value::String).unwrap_or(Value::Null),
        ))
    }

    /// Commit staged edits. Renaming a namespace prefix renames the paired
    /// workspace along with it.
    pub fn save_namespace(
        &self,
        proxy: &mut ModificationProxy<Namespace>,
    ) -> Result<(), CatalogError> {
        let old_prefix = proxy.original().prefix.clone();
        self.save_entity(
            proxy,
            Validator::namespace,
            |data, entity| data.namespaces.update(entity),
            |data, id| data.namespaces.contains(id),
        )?;
        let new_prefix = proxy.original().prefix.clone();
        if old_prefix != new_prefix {
            if let Some(mut paired) = self
                .snapshot()
                .workspace_by_name(&old_prefix)
                .cloned()
                .map(ModificationProxy::wrap)
            {
                paired.update(|ws| ws.name = new_prefix.clone());
                self.save_workspace(&mut paired)?;
            }
        }
        Ok(())
    }

    pub fn remove_namespace(&self, id: &Id) -> Result<(), CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.namespaces.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Namespace, id.clone()));
        }
        let plan = CascadePlanner::new(&snapshot, &self.cascade).plan_namespace(id);
        self.execute_plan(plan)
    }

    // ---- stores --------------------------------------------------------

    pub fn add_store(&self, mut store: DataStore) -> Result<Id, CatalogError> {
        prepare(&mut store);
        {
            let snapshot = self.snapshot();
            Resolver::store(&mut store, &snapshot);
            // A store added without a workspace lands in the default one.
            if ref_is_blank(&store.workspace) {
                if let Some(default) = &snapshot.default_workspace {
                    store.workspace = ObjRef::Id(default.clone());
                }
            }
        }
        let id = store.id.clone();
        let workspace_id = store.workspace.target_id().cloned();
        let promoted = self.facade.mutate(|data| {
            Validator::store(data, &store, true)?;
            data.stores.add(store.clone());
            if let Some(ws) = &workspace_id {
                if !data.default_stores.contains_key(ws) {
                    data.default_stores.insert(ws.clone(), id.clone());
                    return Ok(true);
                }
            }
            Ok(false)
        })?;
        debug!("added store `{}`", store.name);
        self.fire(added_event(&store))?;
        if promoted {
            self.fire(defaults_event("default_store", Value::Null, json!(id)))?;
        }
        Ok(id)
    }

    pub fn get_store(&self, id: &Id) -> Option<ModificationProxy<DataStore>> {
        self.snapshot()
            .stores
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    /// Store by name, scoped to a workspace or searched across all of them.
    pub fn store_by_name(
        &self,
        workspace: Option<&Id>,
        name: &str,
    ) -> Option<ModificationProxy<DataStore>> {
        let snapshot = self.snapshot();
        let found = match workspace {
            Some(_) => snapshot.store_by_name(workspace, name),
            None => snapshot.store_by_name_any(name),
        };
        found.cloned().map(ModificationProxy::wrap)
    }

    pub fn stores(&self) -> Vec<ModificationProxy<DataStore>> {
        self.snapshot()
            .stores
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn stores_by_workspace(&self, workspace: &Id) -> Vec<ModificationProxy<DataStore>> {
        self.snapshot()
            .stores_by_workspace(workspace)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn default_store(&self, workspace: &Id) -> Option<ModificationProxy<DataStore>> {
        let snapshot = self.snapshot();
        snapshot
            .default_stores
            .get(workspace)
            .and_then(|id| snapshot.stores.get(id))
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn set_default_store(&self, workspace: &Id, store: Option<&Id>) -> Result<(), CatalogError> {
        let (old, new) = self.facade.mutate(|data| {
            if let Some(store_id) = store {
                let Some(stored) = data.stores.get(store_id) else {
                    return Err(CatalogError::not_found(EntityKind::Store, store_id.clone()));
                };
                if !stored.workspace.points_to(workspace) {
                    return Err(CatalogError::validation(
                        EntityKind::Store,
                        stored.name.clone(),
                        "store is not contained in that workspace",
                    ));
                }
            }
            let old = data.default_stores.get(workspace).cloned();
            match store {
                Some(store_id) => {
                    data.default_stores.insert(workspace.clone(), store_id.clone());
                }
                None => {
                    data.default_stores.remove(workspace);
                }
            }
            Ok((old, store.cloned()))
        })?;
        self.fire(defaults_event(
            "default_store",
            old.map(Value::String).unwrap_or(Value::Null),
            new.map(Value::String).unwrap_or(Value::Null),
        ))
    }

    pub fn save_store(&self, proxy: &mut ModificationProxy<DataStore>) -> Result<(), CatalogError> {
        self.save_entity(
            proxy,
            Validator::store,
            |data, entity| data.stores.update(entity),
            |data, id| data.stores.contains(id),
        )
    }

    pub fn remove_store(&self, id: &Id) -> Result<(), CatalogError> {
        let plan = self.plan_store_removal(id)?;
        self.execute_plan(plan)
    }

    pub fn plan_store_removal(&self, id: &Id) -> Result<CascadePlan, CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.stores.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Store, id.clone()));
        }
        Ok(CascadePlanner::new(&snapshot, &self.cascade).plan_store(id))
    }

    // ---- resources -----------------------------------------------------

    pub fn add_resource(&self, mut resource: Resource) -> Result<Id, CatalogError> {
        prepare(&mut resource);
        {
            let snapshot = self.snapshot();
            Resolver::resource(&mut resource, &snapshot);
            // A resource added without a namespace lands in the default one.
            if ref_is_blank(&resource.namespace) {
                if let Some(default) = &snapshot.default_namespace {
                    resource.namespace = ObjRef::Id(default.clone());
                }
            }
        }
        if resource.native_name.is_none() {
            resource.native_name = Some(resource.name.clone());
        }
        let id = resource.id.clone();
        self.facade.mutate(|data| {
            Validator::resource(data, &resource, true)?;
            data.resources.add(resource.clone());
            Ok(())
        })?;
        debug!("added resource `{}`", resource.name);
        self.fire(added_event(&resource))?;
        Ok(id)
    }

    pub fn get_resource(&self, id: &Id) -> Option<ModificationProxy<Resource>> {
        self.snapshot()
            .resources
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn resource_by_name(
        &self,
        namespace: Option<&Id>,
        name: &str,
    ) -> Option<ModificationProxy<Resource>> {
        self.snapshot()
            .resource_by_name(namespace, name)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn resources(&self) -> Vec<ModificationProxy<Resource>> {
        self.snapshot()
            .resources
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn resources_by_store(&self, store: &Id) -> Vec<ModificationProxy<Resource>> {
        self.snapshot()
            .resources_by_store(store)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn resources_by_namespace(&self, namespace: &Id) -> Vec<ModificationProxy<Resource>> {
        self.snapshot()
            .resources_by_namespace(namespace)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn save_resource(
        &self,
        proxy: &mut ModificationProxy<Resource>,
    ) -> Result<(), CatalogError> {
        self.save_entity(
            proxy,
            Validator::resource,
            |data, entity| data.resources.update(entity),
            |data, id| data.resources.contains(id),
        )
    }

    pub fn remove_resource(&self, id: &Id) -> Result<(), CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.resources.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Resource, id.clone()));
        }
        let plan = CascadePlanner::new(&snapshot, &self.cascade).plan_resource(id);
        self.execute_plan(plan)
    }

    // ---- layers --------------------------------------------------------

    pub fn add_layer(&self, mut layer: Layer) -> Result<Id, CatalogError> {
        prepare(&mut layer);
        {
            let snapshot = self.snapshot();
            Resolver::layer(&mut layer, &snapshot);
            // The layer name defaults from the published resource.
            if layer.name.is_empty() {
                if let Some(resource) = layer
                    .resource
                    .target_id()
                    .and_then(|id| snapshot.resources.get(id))
                {
                    layer.name = resource.name.clone();
                }
            }
        }
        let id = layer.id.clone();
        self.facade.mutate(|data| {
            Validator::layer(data, &layer, true)?;
            data.layers.add(layer.clone());
            Ok(())
        })?;
        debug!("added layer `{}`", layer.name);
        self.fire(added_event(&layer))?;
        Ok(id)
    }

    pub fn get_layer(&self, id: &Id) -> Option<ModificationProxy<Layer>> {
        self.snapshot()
            .layers
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<ModificationProxy<Layer>> {
        self.snapshot()
            .layer_by_name(name)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn layers(&self) -> Vec<ModificationProxy<Layer>> {
        self.snapshot()
            .layers
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn layers_by_resource(&self, resource: &Id) -> Vec<ModificationProxy<Layer>> {
        self.snapshot()
            .layers_by_resource(resource)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn save_layer(&self, proxy: &mut ModificationProxy<Layer>) -> Result<(), CatalogError> {
        self.save_entity(
            proxy,
            Validator::layer,
            |data, entity| data.layers.update(entity),
            |data, id| data.layers.contains(id),
        )
    }

    pub fn remove_layer(&self, id: &Id) -> Result<(), CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.layers.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Layer, id.clone()));
        }
        let plan = CascadePlanner::new(&snapshot, &self.cascade).plan_layer(id);
        self.execute_plan(plan)
    }

    // ---- styles --------------------------------------------------------

    pub fn add_style(&self, mut style: Style) -> Result<Id, CatalogError> {
        prepare(&mut style);
        {
            let snapshot = self.snapshot();
            Resolver::style(&mut style, &snapshot);
        }
        let id = style.id.clone();
        self.facade.mutate(|data| {
            Validator::style(data, &style, true)?;
            data.styles.add(style.clone());
            Ok(())
        })?;
        debug!("added style `{}`", style.name);
        self.fire(added_event(&style))?;
        Ok(id)
    }

    pub fn get_style(&self, id: &Id) -> Option<ModificationProxy<Style>> {
        self.snapshot()
            .styles
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn style_by_name(
        &self,
        workspace: Option<&Id>,
        name: &str,
    ) -> Option<ModificationProxy<Style>> {
        self.snapshot()
            .style_by_name(workspace, name)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn styles(&self) -> Vec<ModificationProxy<Style>> {
        self.snapshot()
            .styles
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn styles_by_workspace(&self, workspace: &Id) -> Vec<ModificationProxy<Style>> {
        self.snapshot()
            .styles_by_workspace(workspace)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn save_style(&self, proxy: &mut ModificationProxy<Style>) -> Result<(), CatalogError> {
        self.save_entity(
            proxy,
            Validator::style,
            |data, entity| data.styles.update(entity),
            |data, id| data.styles.contains(id),
        )
    }

    pub fn remove_style(&self, id: &Id) -> Result<(), CatalogError> {
        let plan = self.plan_style_removal(id)?;
        self.execute_plan(plan)
    }

    pub fn plan_style_removal(&self, id: &Id) -> Result<CascadePlan, CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.styles.contains(id) {
            return Err(CatalogError::not_found(EntityKind::Style, id.clone()));
        }
        Ok(CascadePlanner::new(&snapshot, &self.cascade).plan_style(id))
    }

    // ---- layer groups --------------------------------------------------

    pub fn add_layer_group(&self, mut group: LayerGroup) -> Result<Id, CatalogError> {
        prepare(&mut group);
        {
            let snapshot = self.snapshot();
            Resolver::layer_group(&mut group, &snapshot);
        }
        let id = group.id.clone();
        self.facade.mutate(|data| {
            Validator::layer_group(data, &group, true)?;
            data.layer_groups.add(group.clone());
            Ok(())
        })?;
        debug!("added layer group `{}`", group.name);
        self.fire(added_event(&group))?;
        Ok(id)
    }

    pub fn get_layer_group(&self, id: &Id) -> Option<ModificationProxy<LayerGroup>> {
        self.snapshot()
            .layer_groups
            .get(id)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn layer_group_by_name(
        &self,
        workspace: Option<&Id>,
        name: &str,
    ) -> Option<ModificationProxy<LayerGroup>> {
        self.snapshot()
            .layer_group_by_name(workspace, name)
            .cloned()
            .map(ModificationProxy::wrap)
    }

    pub fn layer_groups(&self) -> Vec<ModificationProxy<LayerGroup>> {
        self.snapshot()
            .layer_groups
            .iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn layer_groups_by_workspace(&self, workspace: &Id) -> Vec<ModificationProxy<LayerGroup>> {
        self.snapshot()
            .layer_groups_by_workspace(workspace)
            .into_iter()
            .cloned()
            .map(ModificationProxy::wrap)
            .collect()
    }

    pub fn save_layer_group(
        &self,
        proxy: &mut ModificationProxy<LayerGroup>,
    ) -> Result<(), CatalogError> {
        self.save_entity(
            proxy,
            Validator::layer_group,
            |data, entity| data.layer_groups.update(entity),
            |data, id| data.layer_groups.contains(id),
        )
    }

    pub fn remove_layer_group(&self, id: &Id) -> Result<(), CatalogError> {
        let snapshot = self.snapshot();
        if !snapshot.layer_groups.contains(id) {
            return Err(CatalogError::not_found(EntityKind::LayerGroup, id.clone()));
        }
        let plan = CascadePlanner::new(&snapshot, &self.cascade).plan_layer_group(id);
        self.execute_plan(plan)
    }

    // ---- save / cascade internals --------------------------------------

    /// Shared save path: diff, validate the staged state, fire the
    /// pre-commit modify event (a listener error here aborts, nothing has
    /// been applied), commit to the canonical state, update indices, fire
    /// post-modify. Validation failure leaves the proxy uncommitted.
    fn save_entity<E: CatalogEntity>(
        &self,
        proxy: &mut ModificationProxy<E>,
        validate: fn(&CatalogData, &E, bool) -> Result<(), CatalogError>,
        update_in: fn(&mut CatalogData, E),
        exists_in: fn(&CatalogData, &Id) -> bool,
    ) -> Result<(), CatalogError> {
        let staged = proxy.value();
        let diff = proxy.diff();
        if diff.is_empty() {
            return Ok(());
        }
        {
            let snapshot = self.snapshot();
            if !exists_in(&snapshot, staged.id()) {
                return Err(CatalogError::not_found(E::KIND, staged.id().clone()));
            }
            validate(&snapshot, &staged, false)?;
        }
        self.fire(modified_event(&staged, diff.clone()))?;
        self.facade.mutate(|data| {
            if !exists_in(data, staged.id()) {
                return Err(CatalogError::not_found(E::KIND, staged.id().clone()));
            }
            validate(data, &staged, false)?;
            update_in(data, staged.clone());
            Ok(())
        })?;
        proxy.commit();
        debug!("saved {} `{}`", E::KIND, staged.display_name());
        self.fire(post_modified_event(&staged, diff))
    }

    /// Replay a cascade plan through the store: stage every update on a
    /// proxy, fire the pre-commit modify events, apply all updates and
    /// deletes in one atomic swap, then fire post-modify and removed
    /// events in plan order.
    fn execute_plan(&self, plan: CascadePlan) -> Result<(), CatalogError> {
        if !plan.is_empty() {
            debug!("executing cascade plan: {}", plan.describe());
        }
        let snapshot = self.snapshot();
        let mut group_edits: BTreeMap<Id, ModificationProxy<LayerGroup>> = BTreeMap::new();
        let mut layer_edits: BTreeMap<Id, ModificationProxy<Layer>> = BTreeMap::new();

        for action in plan.updates() {
            debug!("cascade: {}", action);
            if let CascadeOp::Update(change) = &action.op {
                match action.kind {
                    EntityKind::LayerGroup => {
                        if let Some(group) = snapshot.layer_groups.get(&action.id) {
                            let proxy = group_edits
                                .entry(action.id.clone())
                                .or_insert_with(|| ModificationProxy::wrap(group.clone()));
                            proxy.update(|g| apply_group_change(g, change));
                        }
                    }
                    EntityKind::Layer => {
                        if let Some(layer) = snapshot.layers.get(&action.id) {
                            let proxy = layer_edits
                                .entry(action.id.clone())
                                .or_insert_with(|| ModificationProxy::wrap(layer.clone()));
                            proxy.update(|l| apply_layer_change(l, change));
                        }
                    }
                    _ => {}
                }
            }
        }

        // Pre-commit modify events: refusal here aborts the whole cascade
        // before anything is applied.
        for proxy in group_edits.values() {
            if proxy.is_dirty() {
                self.fire(modified_event(&proxy.value(), proxy.diff()))?;
            }
        }
        for proxy in layer_edits.values() {
            if proxy.is_dirty() {
                self.fire(modified_event(&proxy.value(), proxy.diff()))?;
            }
        }

        let mut removed: Vec<CatalogEvent> = Vec::new();
        let mut defaults: Vec<CatalogEvent> = Vec::new();
        self.facade.mutate(|data| {
            for proxy in group_edits.values() {
                if proxy.is_dirty() {
                    data.layer_groups.update(proxy.value());
                }
            }
            for proxy in layer_edits.values() {
                if proxy.is_dirty() {
                    data.layers.update(proxy.value());
                }
            }
            for action in plan.deletes() {
                debug!("cascade: {}", action);
                Self::remove_raw(data, action.kind, &action.id, &mut removed, &mut defaults);
            }
            Ok(())
        })?;

        for proxy in group_edits.values() {
            if proxy.is_dirty() {
                self.fire(post_modified_event(&proxy.value(), proxy.diff()))?;
            }
        }
        for proxy in layer_edits.values() {
            if proxy.is_dirty() {
                self.fire(post_modified_event(&proxy.value(), proxy.diff()))?;
            }
        }
        for event in removed {
            self.fire(event)?;
        }
        for event in defaults {
            self.fire(event)?;
        }
        Ok(())
    }

    /// Remove one entity from the canonical state, reassigning defaults
    /// per the auto-promotion invariant. Collects the events to fire once
    /// the new state is published.
    fn remove_raw(
        data: &mut CatalogData,
        kind: EntityKind,
        id: &Id,
        removed: &mut Vec<CatalogEvent>,
        defaults: &mut Vec<CatalogEvent>,
    ) {
        match kind {
            EntityKind::Workspace => {
                let Some(workspace) = data.workspaces.remove(id) else {
                    return;
                };
                data.default_stores.remove(id);
                if data.default_workspace.as_ref() == Some(id) {
                    let next = data.workspaces.first().map(|w| w.id.clone());
                    data.default_workspace = next.clone();
                    defaults.push(defaults_event(
                        "default_workspace",
                        json!(id),
                        next.clone().map(Value::String).unwrap_or(Value::Null),
                    ));
                    // Keep the default namespace paired with the promoted
                    // workspace when one of the same name exists.
                    let paired = next
                        .and_then(|next_id| data.workspaces.get(&next_id))
                        .and_then(|ws| data.namespace_by_prefix(&ws.name))
                        .map(|ns| ns.id.clone());
                    if let Some(ns_id) = paired {
                        data.default_namespace = Some(ns_id);
                    }
                }
                removed.push(removed_event(&workspace));
            }
            EntityKind::Namespace => {
                let Some(namespace) = data.namespaces.remove(id) else {
                    return;
                };
                if data.default_namespace.as_ref() == Some(id) {
                    let next = data.namespaces.first().map(|n| n.id.clone());
                    data.default_namespace = next.clone();
                    defaults.push(defaults_event(
                        "default_namespace",
                        json!(id),
                        next.clone().map(Value::String).unwrap_or(Value::Null),
                    ));
                    let paired = next
                        .and_then(|next_id| data.namespaces.get(&next_id))
                        .and_then(|ns| data.workspace_by_name(&ns.prefix))
                        .map(|ws| ws.id.clone());
                    if let Some(ws_id) = paired {
                        data.default_workspace = Some(ws_id);
                    }
                }
                removed.push(removed_event(&namespace));
            }
            EntityKind::Store => {
                let Some(store) = data.stores.remove(id) else {
                    return;
                };
                if let Some(workspace) = store.workspace.target_id() {
                    if data.default_stores.get(workspace) == Some(id) {
                        let next = data
                            .stores_by_workspace(workspace)
                            .first()
                            .map(|s| s.id.clone());
                        match &next {
                            Some(next_id) => {
                                data.default_stores.insert(workspace.clone(), next_id.clone());
                            }
                            None => {
                                data.default_stores.remove(workspace);
                            }
                        }
                        defaults.push(defaults_event(
                            "default_store",
                            json!(id),
                            next.map(Value::String).unwrap_or(Value::Null),
                        ));
                    }
                }
                removed.push(removed_event(&store));
            }
            EntityKind::Resource => {
                if let Some(resource) = data.resources.remove(id) {
                    removed.push(removed_event(&resource));
                }
            }
            EntityKind::Layer => {
                if let Some(layer) = data.layers.remove(id) {
                    removed.push(removed_event(&layer));
                }
            }
            EntityKind::Style => {
                if let Some(style) = data.styles.remove(id) {
                    removed.push(removed_event(&style));
                }
            }
            EntityKind::LayerGroup => {
                if let Some(group) = data.layer_groups.remove(id) {
                    removed.push(removed_event(&group));
                }
            }
            EntityKind::Catalog => {}
        }
    }
}

/// Assign a generated id to entities arriving without one and stamp the
/// creation time.
fn prepare<E: CatalogEntity>(entity: &mut E) {
    if entity.id().is_empty() {
        entity.set_id(crate::model::generate_id());
    }
    entity.date_created_mut().get_or_insert_with(Utc::now);
}

fn ref_is_blank(reference: &ObjRef) -> bool {
    match reference {
        ObjRef::Id(id) => id.is_empty(),
        ObjRef::Name(name) => name.is_empty(),
    }
}

fn added_event<E: CatalogEntity>(entity: &E) -> CatalogEvent {
    CatalogEvent {
        kind: E::KIND,
        id: entity.id().clone(),
        name: entity.display_name().to_string(),
        change: CatalogChange::Added {
            entity: serde_json::to_value(entity).unwrap_or(Value::Null),
        },
    }
}

fn modified_event<E: CatalogEntity>(entity: &E, diff: ModifiedDiff) -> CatalogEvent {
    CatalogEvent {
        kind: E::KIND,
        id: entity.id().clone(),
        name: entity.display_name().to_string(),
        change: CatalogChange::Modified { diff },
    }
}

fn post_modified_event<E: CatalogEntity>(entity: &E, diff: ModifiedDiff) -> CatalogEvent {
    CatalogEvent {
        kind: E::KIND,
        id: entity.id().clone(),
        name: entity.display_name().to_string(),
        change: CatalogChange::PostModified { diff },
    }
}

fn removed_event<E: CatalogEntity>(entity: &E) -> CatalogEvent {
    CatalogEvent {
        kind: E::KIND,
        id: entity.id().clone(),
        name: entity.display_name().to_string(),
        change: CatalogChange::Removed {
            entity: serde_json::to_value(entity).unwrap_or(Value::Null),
        },
    }
}

fn defaults_event(property: &str, old_value: Value, new_value: Value) -> CatalogEvent {
    let mut diff = ModifiedDiff::default();
    diff.push(property.to_string(), old_value, new_value);
    CatalogEvent {
        kind: EntityKind::Catalog,
        id: "catalog".to_string(),
        name: "catalog".to_string(),
        change: CatalogChange::Modified { diff },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        refuse: &'static str,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                refuse: "",
            })
        }

        fn refusing(change: &'static str) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                refuse: change,
            })
        }

        fn log(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl CatalogListener for Recorder {
        fn handle(&self, event: &CatalogEvent) -> anyhow::Result<()> {
            self.seen
                .lock()
                .push(format!("{}:{}:{}", event.change_name(), event.kind, event.name));
            if event.change_name() == self.refuse {
                anyhow::bail!("refused");
            }
            Ok(())
        }
    }

    fn catalog_with_workspace() -> (Catalog, Id) {
        let catalog = Catalog::default();
        let id = catalog.add_workspace(Workspace::new("topp")).unwrap();
        catalog
            .add_namespace(Namespace::new("topp", "http://topp.org"))
            .unwrap();
        (catalog, id)
    }

    #[test]
    fn first_workspace_becomes_default_and_removal_promotes_the_next() {
        let catalog = Catalog::default();
        let a = catalog.add_workspace(Workspace::new("a")).unwrap();
        let b = catalog.add_workspace(Workspace::new("b")).unwrap();

        assert_eq!(catalog.default_workspace().unwrap().id(), &a);
        catalog.remove_workspace(&a).unwrap();
        assert_eq!(catalog.default_workspace().unwrap().id(), &b);

        catalog.remove_workspace(&b).unwrap();
        assert!(catalog.default_workspace().is_none());
    }

    #[test]
    fn add_validates_before_anything_is_stored() {
        let catalog = Catalog::default();
        catalog.add_workspace(Workspace::new("topp")).unwrap();

        let err = catalog.add_workspace(Workspace::new("topp")).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
        assert_eq!(catalog.workspaces().len(), 1);
    }

    #[test]
    fn lookups_hand_out_proxies_not_canonical_state() {
        let (catalog, id) = catalog_with_workspace();

        let mut proxy = catalog.get_workspace(&id).unwrap();
        proxy.update(|w| w.name = "changed".to_string());

        // Unsaved proxy edits are invisible to other readers.
        assert_eq!(catalog.get_workspace(&id).unwrap().original().name, "topp");

        catalog.save_workspace(&mut proxy).unwrap();
        assert_eq!(
            catalog.get_workspace(&id).unwrap().original().name,
            "changed"
        );
    }

    #[test]
    fn save_fires_modify_then_post_modify_with_the_diff() {
        let (catalog, id) = catalog_with_workspace();
        let recorder = Recorder::new();
        catalog.add_listener(recorder.clone());

        let mut proxy = catalog.get_workspace(&id).unwrap();
        proxy.update(|w| w.isolated = true);
        catalog.save_workspace(&mut proxy).unwrap();

        let log = recorder.log();
        assert_eq!(
            log,
            vec![
                "modified:workspace:topp".to_string(),
                "post-modified:workspace:topp".to_string()
            ]
        );
    }

    #[test]
    fn pre_commit_listener_error_aborts_the_save() {
        let (catalog, id) = catalog_with_workspace();
        catalog.add_listener(Recorder::refusing("modified"));

        let mut proxy = catalog.get_workspace(&id).unwrap();
        proxy.update(|w| w.isolated = true);
        let err = catalog.save_workspace(&mut proxy).unwrap_err();
        assert!(matches!(err, CatalogError::Listener { .. }));

        // Nothing was applied and the proxy still carries its diff.
        assert!(!catalog.get_workspace(&id).unwrap().original().isolated);
        assert!(proxy.is_dirty());
    }

    #[test]
    fn post_commit_listener_error_propagates_but_the_add_stands() {
        let catalog = Catalog::default();
        catalog.add_listener(Recorder::refusing("added"));

        let err = catalog.add_workspace(Workspace::new("topp")).unwrap_err();
        assert!(matches!(err, CatalogError::Listener { .. }));
        assert_eq!(catalog.workspaces().len(), 1);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let catalog = Catalog::default();
        let first = Recorder::new();
        let second = Recorder::new();
        catalog.add_listener(first.clone());
        catalog.add_listener(second.clone());

        catalog.add_workspace(Workspace::new("topp")).unwrap();
        assert_eq!(first.log(), second.log());
        assert_eq!(first.log()[0], "added:workspace:topp");

        let second_dyn: Arc<dyn CatalogListener> = second.clone();
        catalog.remove_listener(&second_dyn);
        catalog.add_workspace(Workspace::new("nurc")).unwrap();
        assert_eq!(first.log().len(), 3);
        assert_eq!(second.log().len(), 1);
    }

    #[test]
    fn renaming_a_workspace_renames_the_paired_namespace() {
        let (catalog, id) = catalog_with_workspace();

        let mut proxy = catalog.get_workspace(&id).unwrap();
        proxy.update(|w| w.name = "tiger".to_string());
        catalog.save_workspace(&mut proxy).unwrap();

        assert!(catalog.namespace_by_prefix("topp").is_none());
        assert!(catalog.namespace_by_prefix("tiger").is_some());
    }

    #[test]
    fn renaming_a_namespace_renames_the_paired_workspace() {
        let (catalog, _) = catalog_with_workspace();

        let mut proxy = catalog.namespace_by_prefix("topp").unwrap();
        proxy.update(|ns| ns.prefix = "tiger".to_string());
        catalog.save_namespace(&mut proxy).unwrap();

        assert!(catalog.workspace_by_name("topp").is_none());
        assert!(catalog.workspace_by_name("tiger").is_some());
    }

    #[test]
    fn first_store_of_a_workspace_becomes_its_default() {
        let (catalog, ws) = catalog_with_workspace();
        let first = catalog
            .add_store(DataStore::new("one", ObjRef::Id(ws.clone())))
            .unwrap();
        let second = catalog
            .add_store(DataStore::new("two", ObjRef::Id(ws.clone())))
            .unwrap();

        assert_eq!(catalog.default_store(&ws).unwrap().id(), &first);
        catalog.remove_store(&first).unwrap();
        assert_eq!(catalog.default_store(&ws).unwrap().id(), &second);
    }

    #[test]
    fn store_added_without_a_workspace_lands_in_the_default() {
        let (catalog, ws) = catalog_with_workspace();
        let id = catalog
            .add_store(DataStore::new("floating", ObjRef::name("")))
            .unwrap();
        let store = catalog.get_store(&id).unwrap();
        assert!(store.original().workspace.points_to(&ws));
    }

    #[test]
    fn save_key_change_moves_the_entity_in_the_index() {
        let (catalog, _) = catalog_with_workspace();
        let id = catalog.add_style(Style::new("simple")).unwrap();

        let mut proxy = catalog.get_style(&id).unwrap();
        proxy.update(|s| s.name = "fancy".to_string());
        catalog.save_style(&mut proxy).unwrap();

        assert!(catalog.style_by_name(None, "simple").is_none());
        assert_eq!(catalog.style_by_name(None, "fancy").unwrap().id(), &id);
    }

    #[test]
    fn layer_name_defaults_from_its_resource() {
        let (catalog, ws) = catalog_with_workspace();
        let store = catalog
            .add_store(DataStore::new("shapefiles", ObjRef::Id(ws)))
            .unwrap();
        let ns = catalog.namespace_by_prefix("topp").unwrap();
        let resource = catalog
            .add_resource(Resource::new(
                "roads",
                crate::model::ResourceKind::FeatureType,
                ObjRef::Id(store),
                ObjRef::Id(ns.id().clone()),
            ))
            .unwrap();

        let id = catalog
            .add_layer(Layer::new("", ObjRef::Id(resource)))
            .unwrap();
        assert_eq!(catalog.get_layer(&id).unwrap().original().name, "roads");
    }

    #[test]
    fn failed_save_leaves_the_proxy_uncommitted() {
        let catalog = Catalog::default();
        catalog.add_workspace(Workspace::new("a")).unwrap();
        let b = catalog.add_workspace(Workspace::new("b")).unwrap();

        let mut proxy = catalog.get_workspace(&b).unwrap();
        proxy.update(|w| w.name = "a".to_string());
        let err = catalog.save_workspace(&mut proxy).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));

        assert!(proxy.is_dirty());
        assert_eq!(catalog.get_workspace(&b).unwrap().original().name, "b");
    }
}
