use gis_catalog_rust::model::{
    DataStore, EntityKind, Layer, LayerGroup, Namespace, ObjRef, PublishedRef, Resource,
    ResourceKind, Style, StyleRef, Workspace,
};
use gis_catalog_rust::store::Catalog;
use gis_catalog_rust::CascadeOp;
use std::sync::Arc;
use std::thread;

struct Fixture {
    catalog: Catalog,
    workspace: String,
    store: String,
    layers: Vec<String>,
    group: String,
}

/// One workspace/namespace, one store with two feature types, each
/// published by a layer, both layers collected into a group.
fn fixture() -> Fixture {
    let catalog = Catalog::default();
    let workspace = catalog.add_workspace(Workspace::new("topp")).unwrap();
    catalog
        .add_namespace(Namespace::new("topp", "http://www.openplans.org/topp"))
        .unwrap();
    let store = catalog
        .add_store(DataStore::new("shapefiles", ObjRef::name("topp")))
        .unwrap();

    let mut layers = Vec::new();
    for name in ["roads", "rivers"] {
        let resource = catalog
            .add_resource(Resource::new(
                name,
                ResourceKind::FeatureType,
                ObjRef::Id(store.clone()),
                ObjRef::name("topp"),
            ))
            .unwrap();
        layers.push(
            catalog
                .add_layer(Layer::new(name, ObjRef::Id(resource)))
                .unwrap(),
        );
    }

    let mut group = LayerGroup::new("base-map");
    for id in &layers {
        group.push_entry(PublishedRef::Layer(ObjRef::Id(id.clone())), None);
    }
    // A third member that outlives the store removal below.
    let outside = catalog
        .add_style(Style::new("plain"))
        .and_then(|_| {
            catalog.add_layer(Layer::new("graticule", ObjRef::name("virtual-grid")))
        })
        .unwrap();
    group.push_entry(PublishedRef::Layer(ObjRef::Id(outside)), None);
    let group = catalog.add_layer_group(group).unwrap();

    Fixture {
        catalog,
        workspace,
        store,
        layers,
        group,
    }
}

#[test]
fn store_removal_cascades_to_resources_layers_and_group_entries() {
    let f = fixture();

    // Preview first: the plan reports without touching anything.
    let plan = f.catalog.plan_store_removal(&f.store).unwrap();
    assert_eq!(plan.deleted_ids(EntityKind::Layer).len(), 2);
    assert_eq!(plan.deleted_ids(EntityKind::Resource).len(), 2);
    assert_eq!(f.catalog.layers().len(), 3);

    f.catalog.remove_store(&f.store).unwrap();

    assert!(f.catalog.get_store(&f.store).is_none());
    assert!(f.catalog.resources().is_empty());
    for layer in &f.layers {
        assert!(f.catalog.get_layer(layer).is_none());
    }

    // The group survived with its paired sequences edited in lockstep.
    let group = f.catalog.get_layer_group(&f.group).unwrap();
    let group = group.original();
    assert_eq!(group.layers.len(), 1);
    assert_eq!(group.styles.len(), 1);
    assert!(f.catalog.layer_by_name("graticule").is_some());
}

#[test]
fn workspace_removal_takes_the_whole_subtree_and_reassigns_defaults() {
    let f = fixture();
    let other = f.catalog.add_workspace(Workspace::new("nurc")).unwrap();
    f.catalog
        .add_namespace(Namespace::new("nurc", "http://www.nurc.nato.int"))
        .unwrap();

    assert_eq!(f.catalog.default_workspace().unwrap().id(), &f.workspace);
    f.catalog.remove_workspace(&f.workspace).unwrap();

    assert_eq!(f.catalog.default_workspace().unwrap().id(), &other);
    assert_eq!(f.catalog.default_namespace().unwrap().original().prefix, "nurc");
    assert!(f.catalog.namespace_by_prefix("topp").is_none());
    assert!(f.catalog.stores().is_empty());
    assert!(f.catalog.resources().is_empty());
    // Only the layer not owned by the removed workspace's store remains.
    assert_eq!(f.catalog.layers().len(), 1);
}

#[test]
fn style_removal_resets_defaults_and_trims_alternates() {
    let catalog = Catalog::default();
    let doomed = catalog.add_style(Style::new("doomed")).unwrap();
    let kept = catalog.add_style(Style::new("kept")).unwrap();

    let mut by_default = Layer::new("roads", ObjRef::name("r"));
    by_default.default_style = Some(StyleRef::Id(doomed.clone()));
    by_default.styles.push(StyleRef::Id(kept.clone()));
    let by_default = catalog.add_layer(by_default).unwrap();

    let mut by_alternate = Layer::new("rivers", ObjRef::name("r"));
    by_alternate.default_style = Some(StyleRef::Id(kept.clone()));
    by_alternate.styles.push(StyleRef::Id(doomed.clone()));
    let by_alternate = catalog.add_layer(by_alternate).unwrap();

    let plan = catalog.plan_style_removal(&doomed).unwrap();
    assert_eq!(plan.updates().count(), 2);
    assert!(plan
        .updates()
        .all(|a| matches!(a.op, CascadeOp::Update(_))));

    catalog.remove_style(&doomed).unwrap();

    let layer = catalog.get_layer(&by_default).unwrap();
    assert_eq!(layer.original().default_style, None);
    assert_eq!(layer.original().styles, vec![StyleRef::Id(kept.clone())]);

    let layer = catalog.get_layer(&by_alternate).unwrap();
    assert_eq!(layer.original().default_style, Some(StyleRef::Id(kept)));
    assert!(layer.original().styles.is_empty());
}

#[test]
fn layer_removal_edits_groups_by_paired_position() {
    let f = fixture();
    f.catalog.remove_layer(&f.layers[0]).unwrap();

    let group = f.catalog.get_layer_group(&f.group).unwrap();
    let group = group.original();
    assert_eq!(group.layers.len(), 2);
    assert_eq!(group.styles.len(), 2);
    assert!(group
        .layers
        .iter()
        .all(|entry| !entry.points_to_layer(&f.layers[0])));
}

#[test]
fn reloaded_entities_resolve_against_the_live_graph() {
    let f = fixture();

    // Simulate the loader: a layer deserialized with by-name references.
    let json = r#"{
        "id": "",
        "name": "roads-copy",
        "resource": {"name": "roads"},
        "default_style": {"name": "plain"},
        "styles": [{"name": "no-such-style"}],
        "enabled": true,
        "advertised": true,
        "date_created": null
    }"#;
    let layer: Layer = serde_json::from_str(json).unwrap();
    let id = f.catalog.add_layer(layer).unwrap();

    let stored = f.catalog.get_layer(&id).unwrap();
    let stored = stored.original().clone();
    assert!(stored.resource.is_resolved());
    assert!(matches!(stored.default_style, Some(StyleRef::Id(_))));
    // The unknown style stayed a placeholder instead of failing the add.
    assert_eq!(stored.styles, vec![StyleRef::name("no-such-style")]);
}

#[test]
fn concurrent_adds_are_always_visible_to_readers() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 50;

    let catalog = Arc::new(Catalog::default());
    let mut handles = Vec::new();

    for writer in 0..WRITERS {
        let catalog = Arc::clone(&catalog);
        handles.push(thread::spawn(move || {
            let mut ids = Vec::new();
            for n in 0..PER_WRITER {
                let name = format!("layer-{}-{}", writer, n);
                let id = catalog
                    .add_layer(Layer::new(name, ObjRef::name("shared")))
                    .expect("add must succeed");
                // Once add returned, the layer is visible to any reader.
                assert!(catalog.get_layer(&id).is_some());
                ids.push(id);
            }
            // Re-read everything this writer produced, racing the others.
            for id in &ids {
                assert!(catalog.get_layer(id).is_some());
            }
            ids
        }));
    }

    let mut all_ids = Vec::new();
    for handle in handles {
        all_ids.extend(handle.join().unwrap());
    }

    assert_eq!(catalog.layers().len(), WRITERS * PER_WRITER);
    all_ids.sort();
    all_ids.dedup();
    assert_eq!(all_ids.len(), WRITERS * PER_WRITER);
}

#[test]
fn emptied_group_policy_is_configurable() {
    use gis_catalog_rust::config::CascadeConfig;

    for (delete_emptied_groups, survives) in [(true, false), (false, true)] {
        let catalog = Catalog::new(CascadeConfig {
            delete_emptied_groups,
        });
        catalog.add_workspace(Workspace::new("topp")).unwrap();
        catalog
            .add_namespace(Namespace::new("topp", "http://topp.org"))
            .unwrap();
        let store = catalog
            .add_store(DataStore::new("shapefiles", ObjRef::name("topp")))
            .unwrap();
        let resource = catalog
            .add_resource(Resource::new(
                "roads",
                ResourceKind::FeatureType,
                ObjRef::Id(store.clone()),
                ObjRef::name("topp"),
            ))
            .unwrap();
        let layer = catalog
            .add_layer(Layer::new("roads", ObjRef::Id(resource)))
            .unwrap();

        let mut group = LayerGroup::new("only-roads");
        group.push_entry(PublishedRef::Layer(ObjRef::Id(layer)), None);
        let group = catalog.add_layer_group(group).unwrap();

        catalog.remove_store(&store).unwrap();

        match survives {
            true => {
                let kept = catalog.get_layer_group(&group).unwrap();
                assert!(kept.original().layers.is_empty());
            }
            false => assert!(catalog.get_layer_group(&group).is_none()),
        }
    }
}
