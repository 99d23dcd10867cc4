use crate::config::CascadeConfig;
use crate::model::{EntityKind, Id, Layer, LayerGroup};
use crate::store::CatalogData;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;

/// Secondary edit required to keep the graph consistent after a removal.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeChange {
    /// The layer's default style is being removed; reset it to none.
    ResetDefaultStyle { style: Id },
    /// Drop the removed style from the layer's alternate set.
    RemoveAlternateStyle { style: Id },
    /// Drop the removed member's paired (layer, style) entries from the
    /// group's sequences, including nested group styles.
    RemoveMemberEntries { member: Id },
}

impl fmt::Display for CascadeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeChange::ResetDefaultStyle { style } => {
                write!(f, "reset default style (was `{}`)", style)
            }
            CascadeChange::RemoveAlternateStyle { style } => {
                write!(f, "remove `{}` from alternate styles", style)
            }
            CascadeChange::RemoveMemberEntries { member } => {
                write!(f, "remove paired entries for member `{}`", member)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOp {
    Delete,
    Update(CascadeChange),
}

/// One step of a cascade plan, aimed at a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeAction {
    pub kind: EntityKind,
    pub id: Id,
    pub name: String,
    pub op: CascadeOp,
}

impl fmt::Display for CascadeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            CascadeOp::Delete => write!(f, "delete {} `{}`", self.kind, self.name),
            CascadeOp::Update(change) => {
                write!(f, "update {} `{}`: {}", self.kind, self.name, change)
            }
        }
    }
}

/// Ordered set of delete/update actions keeping the graph consistent after
/// removing a root entity. Updates come before deletes and deletes are
/// ordered deepest-dependent first, so applying front to back never leaves
/// a dangling canonical reference behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadePlan {
    pub actions: Vec<CascadeAction>,
}

impl CascadePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn deletes(&self) -> impl Iterator<Item = &CascadeAction> {
        self.actions
            .iter()
            .filter(|a| matches!(a.op, CascadeOp::Delete))
    }

    pub fn updates(&self) -> impl Iterator<Item = &CascadeAction> {
        self.actions
            .iter()
            .filter(|a| matches!(a.op, CascadeOp::Update(_)))
    }

    pub fn deleted_ids(&self, kind: EntityKind) -> Vec<&Id> {
        self.deletes()
            .filter(|a| a.kind == kind)
            .map(|a| &a.id)
            .collect()
    }

    /// One-line summary, the shape shown by "what would this break" previews.
    pub fn describe(&self) -> String {
        self.actions.iter().map(ToString::to_string).join("; ")
    }
}

/// Deletion closure of a removal root, kept per kind so the final plan can
/// be emitted in dependency order.
#[derive(Debug, Default)]
struct Closure {
    groups: Vec<Id>,
    layers: Vec<Id>,
    resources: Vec<Id>,
    stores: Vec<Id>,
    styles: Vec<Id>,
    namespaces: Vec<Id>,
    workspaces: Vec<Id>,
    seen: HashSet<Id>,
}

impl Closure {
    fn mark(&mut self, bucket: EntityKind, id: &Id) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        let list = match bucket {
            EntityKind::LayerGroup => &mut self.groups,
            EntityKind::Layer => &mut self.layers,
            EntityKind::Resource => &mut self.resources,
            EntityKind::Store => &mut self.stores,
            EntityKind::Style => &mut self.styles,
            EntityKind::Namespace => &mut self.namespaces,
            EntityKind::Workspace => &mut self.workspaces,
            _ => return false,
        };
        list.push(id.clone());
        true
    }

    fn contains(&self, id: &Id) -> bool {
        self.seen.contains(id)
    }
}

/// Computes the full set of secondary deletions and updates required when a
/// root entity is removed. Pure: works on a catalog snapshot and reports
/// the plan without touching anything, which is exactly what "what would
/// this break" previews consume. The executor lives in the catalog, which
/// replays the same plan through its sanctioned mutation paths.
pub struct CascadePlanner<'a> {
    data: &'a CatalogData,
    config: &'a CascadeConfig,
}

impl<'a> CascadePlanner<'a> {
    pub fn new(data: &'a CatalogData, config: &'a CascadeConfig) -> Self {
        Self { data, config }
    }

    pub fn plan_workspace(&self, workspace: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        for store in self.data.stores_by_workspace(workspace) {
            self.close_over_store(&mut closure, &store.id);
        }
        for group in self.data.layer_groups_by_workspace(workspace) {
            closure.mark(EntityKind::LayerGroup, &group.id);
        }
        for style in self.data.styles_by_workspace(workspace) {
            closure.mark(EntityKind::Style, &style.id);
        }
        if let Some(ws) = self.data.workspaces.get(workspace) {
            if let Some(ns) = self.data.namespace_by_prefix(&ws.name) {
                closure.mark(EntityKind::Namespace, &ns.id);
            }
        }
        closure.mark(EntityKind::Workspace, workspace);
        self.finish(closure)
    }

    pub fn plan_store(&self, store: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        self.close_over_store(&mut closure, store);
        self.finish(closure)
    }

    pub fn plan_resource(&self, resource: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        self.close_over_resource(&mut closure, resource);
        self.finish(closure)
    }

    pub fn plan_layer(&self, layer: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        closure.mark(EntityKind::Layer, layer);
        self.finish(closure)
    }

    pub fn plan_style(&self, style: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        closure.mark(EntityKind::Style, style);
        self.finish(closure)
    }

    pub fn plan_layer_group(&self, group: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        closure.mark(EntityKind::LayerGroup, group);
        self.finish(closure)
    }

    pub fn plan_namespace(&self, namespace: &Id) -> CascadePlan {
        let mut closure = Closure::default();
        closure.mark(EntityKind::Namespace, namespace);
        self.finish(closure)
    }

    fn close_over_store(&self, closure: &mut Closure, store: &Id) {
        for resource in self.data.resources_by_store(store) {
            self.close_over_resource(closure, &resource.id);
        }
        closure.mark(EntityKind::Store, store);
    }

    fn close_over_resource(&self, closure: &mut Closure, resource: &Id) {
        for layer in self.data.layers_by_resource(resource) {
            closure.mark(EntityKind::Layer, &layer.id);
        }
        closure.mark(EntityKind::Resource, resource);
    }

    /// Derive group/layer updates from the deletion closure, grow the
    /// closure for groups emptied by those updates (policy permitting),
    /// then emit the ordered plan.
    fn finish(&self, mut closure: Closure) -> CascadePlan {
        // Groups emptied by member removal may themselves cascade, which
        // can empty further groups that nested them. Iterate to a fixpoint;
        // each round only ever adds groups, so it terminates.
        loop {
            let mut grew = false;
            for group in self.data.layer_groups.iter() {
                if closure.contains(&group.id) {
                    continue;
                }
                let removed = self.removed_member_count(group, &closure);
                if removed == 0 {
                    continue;
                }
                if removed == group.layers.len() && self.config.delete_emptied_groups {
                    closure.mark(EntityKind::LayerGroup, &group.id);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let mut plan = CascadePlan::default();

        // Updates first: membership edits on surviving groups, style
        // resets on surviving layers.
        for group in self.data.layer_groups.iter() {
            if closure.contains(&group.id) {
                continue;
            }
            for member in self.deleted_members(group, &closure) {
                plan.actions.push(CascadeAction {
                    kind: EntityKind::LayerGroup,
                    id: group.id.clone(),
                    name: group.name.clone(),
                    op: CascadeOp::Update(CascadeChange::RemoveMemberEntries { member }),
                });
            }
        }
        for layer in self.data.layers.iter() {
            if closure.contains(&layer.id) {
                continue;
            }
            for style_id in &closure.styles {
                if layer
                    .default_style
                    .as_ref()
                    .map(|s| s.points_to(style_id))
                    .unwrap_or(false)
                {
                    plan.actions.push(CascadeAction {
                        kind: EntityKind::Layer,
                        id: layer.id.clone(),
                        name: layer.name.clone(),
                        op: CascadeOp::Update(CascadeChange::ResetDefaultStyle {
                            style: style_id.clone(),
                        }),
                    });
                }
                if layer.styles.iter().any(|s| s.points_to(style_id)) {
                    plan.actions.push(CascadeAction {
                        kind: EntityKind::Layer,
                        id: layer.id.clone(),
                        name: layer.name.clone(),
                        op: CascadeOp::Update(CascadeChange::RemoveAlternateStyle {
                            style: style_id.clone(),
                        }),
                    });
                }
            }
        }

        // Deletes, deepest-dependent first: a layer goes before the
        // resource it wraps, a store after its resources.
        self.push_deletes(&mut plan, EntityKind::LayerGroup, &closure.groups);
        self.push_deletes(&mut plan, EntityKind::Layer, &closure.layers);
        self.push_deletes(&mut plan, EntityKind::Resource, &closure.resources);
        self.push_deletes(&mut plan, EntityKind::Store, &closure.stores);
        self.push_deletes(&mut plan, EntityKind::Style, &closure.styles);
        self.push_deletes(&mut plan, EntityKind::Namespace, &closure.namespaces);
        self.push_deletes(&mut plan, EntityKind::Workspace, &closure.workspaces);
        plan
    }

    fn removed_member_count(&self, group: &LayerGroup, closure: &Closure) -> usize {
        group
            .layers
            .iter()
            .filter(|entry| {
                entry
                    .obj_ref()
                    .target_id()
                    .map(|id| closure.contains(id))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Deleted ids referenced by the group, in the group's entry order,
    /// nested group styles included, each member once.
    fn deleted_members(&self, group: &LayerGroup, closure: &Closure) -> Vec<Id> {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let entries = group
            .layers
            .iter()
            .chain(group.group_styles.iter().flat_map(|gs| gs.layers.iter()));
        for entry in entries {
            if let Some(id) = entry.obj_ref().target_id() {
                if closure.contains(id) && seen.insert(id.clone()) {
                    members.push(id.clone());
                }
            }
        }
        members
    }

    fn push_deletes(&self, plan: &mut CascadePlan, kind: EntityKind, ids: &[Id]) {
        for id in ids {
            plan.actions.push(CascadeAction {
                kind,
                id: id.clone(),
                name: self.display_name(kind, id),
                op: CascadeOp::Delete,
            });
        }
    }

    fn display_name(&self, kind: EntityKind, id: &Id) -> String {
        let name = match kind {
            EntityKind::LayerGroup => self.data.layer_groups.get(id).map(|g| g.name.clone()),
            EntityKind::Layer => self.data.layers.get(id).map(|l| l.name.clone()),
            EntityKind::Resource => self.data.resources.get(id).map(|r| r.name.clone()),
            EntityKind::Store => self.data.stores.get(id).map(|s| s.name.clone()),
            EntityKind::Style => self.data.styles.get(id).map(|s| s.name.clone()),
            EntityKind::Namespace => self.data.namespaces.get(id).map(|n| n.prefix.clone()),
            EntityKind::Workspace => self.data.workspaces.get(id).map(|w| w.name.clone()),
            EntityKind::Catalog => None,
        };
        name.unwrap_or_else(|| id.clone())
    }
}

/// Apply a membership change to a group, editing the paired sequences in
/// lockstep by position, nested group styles included.
pub fn apply_group_change(group: &mut LayerGroup, change: &CascadeChange) {
    if let CascadeChange::RemoveMemberEntries { member } = change {
        let positions: Vec<usize> = group
            .layers
            .iter()
            .enumerate()
            .filter(|(_, e)| e.obj_ref().points_to(member))
            .map(|(pos, _)| pos)
            .collect();
        group.remove_entries(&positions);
        for group_style in group.group_styles.iter_mut() {
            let positions: Vec<usize> = group_style
                .layers
                .iter()
                .enumerate()
                .filter(|(_, e)| e.obj_ref().points_to(member))
                .map(|(pos, _)| pos)
                .collect();
            for &pos in positions.iter().rev() {
                group_style.layers.remove(pos);
                group_style.styles.remove(pos);
            }
        }
    }
}

/// Apply a style-removal change to a layer.
pub fn apply_layer_change(layer: &mut Layer, change: &CascadeChange) {
    match change {
        CascadeChange::ResetDefaultStyle { style } => {
            if layer
                .default_style
                .as_ref()
                .map(|s| s.points_to(style))
                .unwrap_or(false)
            {
                layer.default_style = None;
            }
        }
        CascadeChange::RemoveAlternateStyle { style } => {
            layer.styles.retain(|s| !s.points_to(style));
        }
        CascadeChange::RemoveMemberEntries { .. } => {}
    }
}
