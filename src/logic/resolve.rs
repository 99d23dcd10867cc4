use crate::model::{DataStore, Layer, LayerGroup, ObjRef, Resource, Style, StyleRef};
use crate::store::CatalogData;

/// Rehydrates by-name placeholder references into live id references.
///
/// Invoked whenever an entity enters the graph from the outside (reload,
/// deserialization), before it is handed to `add`. Each entity kind has its
/// reference-bearing fields walked explicitly. A placeholder whose target
/// the lookup does not know stays untouched — never nulled, never an error —
/// so partially loaded graphs keep working. Resolving twice is a no-op.
pub struct Resolver;

impl Resolver {
    pub fn store(store: &mut DataStore, data: &CatalogData) {
        Self::workspace_ref(&mut store.workspace, data);
    }

    pub fn resource(resource: &mut Resource, data: &CatalogData) {
        if let ObjRef::Name(name) = &resource.store {
            if let Some(found) = data.store_by_name_any(name) {
                resource.store = ObjRef::Id(found.id.clone());
            }
        }
        if let ObjRef::Name(prefix) = &resource.namespace {
            if let Some(found) = data.namespace_by_prefix(prefix) {
                resource.namespace = ObjRef::Id(found.id.clone());
            }
        }
    }

    pub fn layer(layer: &mut Layer, data: &CatalogData) {
        if let ObjRef::Name(name) = &layer.resource {
            if let Some(found) = data.resource_by_name(None, name) {
                layer.resource = ObjRef::Id(found.id.clone());
            }
        }
        if let Some(style) = layer.default_style.as_mut() {
            Self::style_ref(style, None, data);
        }
        for style in layer.styles.iter_mut() {
            Self::style_ref(style, None, data);
        }
    }

    pub fn style(style: &mut Style, data: &CatalogData) {
        if let Some(workspace) = style.workspace.as_mut() {
            Self::workspace_ref(workspace, data);
        }
    }

    pub fn layer_group(group: &mut LayerGroup, data: &CatalogData) {
        if let Some(workspace) = group.workspace.as_mut() {
            Self::workspace_ref(workspace, data);
        }
        let scope = group
            .workspace
            .as_ref()
            .and_then(|w| w.target_id())
            .cloned();

        if let Some(root) = group.root_layer.as_mut() {
            if let ObjRef::Name(name) = root {
                if let Some(found) = data.layer_by_name(name) {
                    *root = ObjRef::Id(found.id.clone());
                }
            }
        }
        if let Some(style) = group.root_layer_style.as_mut() {
            Self::group_style_ref(style, scope.as_ref(), data);
        }

        Self::published_list(&mut group.layers, scope.as_ref(), data);
        for style in group.styles.iter_mut().flatten() {
            Self::group_style_ref(style, scope.as_ref(), data);
        }
        for group_style in group.group_styles.iter_mut() {
            Self::published_list(&mut group_style.layers, scope.as_ref(), data);
            for style in group_style.styles.iter_mut().flatten() {
                Self::group_style_ref(style, scope.as_ref(), data);
            }
        }
    }

    fn published_list(
        entries: &mut [crate::model::PublishedRef],
        scope: Option<&crate::model::Id>,
        data: &CatalogData,
    ) {
        use crate::model::PublishedRef;
        for entry in entries.iter_mut() {
            match entry {
                PublishedRef::Layer(r) => {
                    if let ObjRef::Name(name) = r {
                        if let Some(found) = data.layer_by_name(name) {
                            *r = ObjRef::Id(found.id.clone());
                        }
                    }
                }
                PublishedRef::Group(r) => {
                    if let ObjRef::Name(name) = r {
                        if let Some(found) = data.layer_group_by_name(scope, name) {
                            *r = ObjRef::Id(found.id.clone());
                        }
                    }
                }
            }
        }
    }

    fn workspace_ref(reference: &mut ObjRef, data: &CatalogData) {
        if let ObjRef::Name(name) = reference {
            if let Some(found) = data.workspace_by_name(name) {
                *reference = ObjRef::Id(found.id.clone());
            }
        }
    }

    /// Style references inside layer groups get one extra rule: a name that
    /// is not a catalog style but does exist as the label of a group style
    /// nested in some layer group resolves to a fresh minimal style
    /// carrying just that name. Those virtual names are real style
    /// identities for rendering purposes, they just have no standalone
    /// style object behind them.
    fn group_style_ref(style: &mut StyleRef, scope: Option<&crate::model::Id>, data: &CatalogData) {
        if let StyleRef::Name(name) = style {
            if let Some(found) = data.style_by_name(scope, name) {
                *style = StyleRef::Id(found.id.clone());
            } else if data.has_group_style_named(name) {
                *style = StyleRef::Virtual(Box::new(Style::named(name.clone())));
            }
        }
    }

    /// Plain style references (layer default/alternates): by-name lookup
    /// only, unknown names stay as placeholders.
    fn style_ref(style: &mut StyleRef, scope: Option<&crate::model::Id>, data: &CatalogData) {
        if let StyleRef::Name(name) = style {
            if let Some(found) = data.style_by_name(scope, name) {
                *style = StyleRef::Id(found.id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupStyle, PublishedRef, ResourceKind, Workspace};

    fn data_with_workspace() -> (CatalogData, Workspace) {
        let mut data = CatalogData::default();
        let ws = Workspace::new("topp");
        data.workspaces.add(ws.clone());
        (data, ws)
    }

    #[test]
    fn name_placeholders_become_id_refs() {
        let (mut data, ws) = data_with_workspace();
        let mut store = DataStore::new("shapefiles", ObjRef::name("topp"));
        Resolver::store(&mut store, &data);
        assert_eq!(store.workspace, ObjRef::Id(ws.id.clone()));

        data.stores.add(store.clone());
        let ns = crate::model::Namespace::new("topp", "http://topp.org");
        data.namespaces.add(ns.clone());

        let mut resource = Resource::new(
            "roads",
            ResourceKind::FeatureType,
            ObjRef::name("shapefiles"),
            ObjRef::name("topp"),
        );
        Resolver::resource(&mut resource, &data);
        assert_eq!(resource.store, ObjRef::Id(store.id));
        assert_eq!(resource.namespace, ObjRef::Id(ns.id));
    }

    #[test]
    fn unknown_targets_stay_untouched() {
        let (data, _) = data_with_workspace();
        let mut layer = Layer::new("roads", ObjRef::name("missing"));
        layer.default_style = Some(StyleRef::name("missing-style"));
        Resolver::layer(&mut layer, &data);

        assert_eq!(layer.resource, ObjRef::name("missing"));
        assert_eq!(layer.default_style, Some(StyleRef::name("missing-style")));
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let (data, ws) = data_with_workspace();
        let mut store = DataStore::new("shapefiles", ObjRef::name("topp"));
        Resolver::store(&mut store, &data);
        let once = store.clone();
        Resolver::store(&mut store, &data);
        assert_eq!(store, once);
        assert_eq!(store.workspace, ObjRef::Id(ws.id));
    }

    #[test]
    fn virtual_group_style_names_materialize_a_minimal_style() {
        let mut data = CatalogData::default();
        let mut other = LayerGroup::new("base");
        other.group_styles.push(GroupStyle::new("winter"));
        data.layer_groups.add(other);

        let mut group = LayerGroup::new("overlay");
        group.push_entry(
            PublishedRef::Layer(ObjRef::id("l-1")),
            Some(StyleRef::name("winter")),
        );
        Resolver::layer_group(&mut group, &data);

        match &group.styles[0] {
            Some(StyleRef::Virtual(style)) => assert_eq!(style.name, "winter"),
            other => panic!("expected a virtual style, got {:?}", other),
        }
    }

    #[test]
    fn catalog_style_wins_over_a_virtual_name() {
        let mut data = CatalogData::default();
        let style = Style::new("winter");
        data.styles.add(style.clone());
        let mut other = LayerGroup::new("base");
        other.group_styles.push(GroupStyle::new("winter"));
        data.layer_groups.add(other);

        let mut group = LayerGroup::new("overlay");
        group.push_entry(
            PublishedRef::Layer(ObjRef::id("l-1")),
            Some(StyleRef::name("winter")),
        );
        Resolver::layer_group(&mut group, &data);
        assert_eq!(group.styles[0], Some(StyleRef::Id(style.id)));
    }
}
