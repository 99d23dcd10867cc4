use crate::error::CatalogError;
use crate::model::{
    DataStore, GroupStyle, Layer, LayerGroup, Namespace, ObjRef, PublishedRef, Resource,
    ResourceKind, Style, StyleRef, Workspace,
};
use crate::store::Catalog;

/// Load a small demonstration graph: two workspaces with their namespaces,
/// a store each, a few published layers with styles and one layer group
/// with a nested group style. Used by the demo binary and handy as a
/// fixture when exploring the API.
pub fn load_seed_data(catalog: &Catalog) -> Result<(), CatalogError> {
    let topp = catalog.add_workspace(Workspace::new("topp"))?;
    catalog.add_namespace(Namespace::new("topp", "http://www.openplans.org/topp"))?;
    catalog.add_workspace(Workspace::new("nurc"))?;
    catalog.add_namespace(Namespace::new("nurc", "http://www.nurc.nato.int"))?;

    let shapefiles = catalog.add_store(DataStore::new("shapefiles", ObjRef::name("topp")))?;
    catalog.add_store(DataStore::new("arc-grid", ObjRef::name("nurc")))?;

    let simple = catalog.add_style(Style::new("simple"))?;
    let mut local = Style::new("polygon");
    local.workspace = Some(ObjRef::name("topp"));
    catalog.add_style(local)?;

    let mut layer_ids = Vec::new();
    for name in ["states", "roads"] {
        let resource = Resource::new(
            name,
            ResourceKind::FeatureType,
            ObjRef::Id(shapefiles.clone()),
            ObjRef::name("topp"),
        );
        let resource_id = catalog.add_resource(resource)?;
        let mut layer = Layer::new(name, ObjRef::Id(resource_id));
        layer.default_style = Some(StyleRef::Id(simple.clone()));
        layer_ids.push(catalog.add_layer(layer)?);
    }

    let coverage = Resource::new(
        "mosaic",
        ResourceKind::Coverage,
        ObjRef::name("arc-grid"),
        ObjRef::name("nurc"),
    );
    let coverage_id = catalog.add_resource(coverage)?;
    layer_ids.push(catalog.add_layer(Layer::new("mosaic", ObjRef::Id(coverage_id)))?);

    let mut group = LayerGroup::new("base-map");
    for id in &layer_ids {
        group.push_entry(PublishedRef::Layer(ObjRef::Id(id.clone())), None);
    }
    let mut winter = GroupStyle::new("winter");
    winter
        .layers
        .push(PublishedRef::Layer(ObjRef::Id(layer_ids[0].clone())));
    winter.styles.push(Some(StyleRef::name("polygon")));
    group.group_styles.push(winter);
    catalog.add_layer_group(group)?;

    Ok(())
}
