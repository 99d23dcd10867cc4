use crate::error::CatalogError;
use crate::model::{
    CatalogEntity, DataStore, EntityKind, Layer, LayerGroup, Namespace, Resource, Style, Workspace,
};
use crate::store::CatalogData;

/// Reserved keyword that names the default workspace/namespace in lookups,
/// so no real entity may claim it.
pub const DEFAULT_KEYWORD: &str = "default";

/// Per-kind validation run on add (`is_new = true`) and save. A failure
/// leaves the graph untouched: the catalog validates against the current
/// snapshot before any index is written.
pub struct Validator;

impl Validator {
    pub fn workspace(
        data: &CatalogData,
        workspace: &Workspace,
        _is_new: bool,
    ) -> Result<(), CatalogError> {
        if workspace.name.is_empty() {
            return Err(invalid(workspace, "workspace name must not be empty"));
        }
        if workspace.name == DEFAULT_KEYWORD {
            return Err(invalid(
                workspace,
                "`default` is a reserved keyword, it cannot be used as the workspace name",
            ));
        }
        if let Some(existing) = data.workspace_by_name(&workspace.name) {
            if existing.id != workspace.id {
                return Err(invalid(
                    workspace,
                    format!("workspace named `{}` already exists", workspace.name),
                ));
            }
        }
        Ok(())
    }

    pub fn namespace(
        data: &CatalogData,
        namespace: &Namespace,
        _is_new: bool,
    ) -> Result<(), CatalogError> {
        if namespace.prefix.is_empty() {
            return Err(invalid(namespace, "namespace prefix must not be empty"));
        }
        if namespace.prefix == DEFAULT_KEYWORD {
            return Err(invalid(
                namespace,
                "`default` is a reserved keyword, it cannot be used as the namespace prefix",
            ));
        }
        if namespace.uri.is_empty() {
            return Err(invalid(namespace, "namespace uri must not be empty"));
        }
        if namespace.uri.contains(char::is_whitespace) || !namespace.uri.contains(':') {
            return Err(invalid(
                namespace,
                format!("invalid uri syntax for `{}`", namespace.uri),
            ));
        }
        if let Some(existing) = data.namespace_by_prefix(&namespace.prefix) {
            if existing.id != namespace.id {
                return Err(invalid(
                    namespace,
                    format!(
                        "namespace with prefix `{}` already exists",
                        namespace.prefix
                    ),
                ));
            }
        }
        if !namespace.isolated {
            if let Some(existing) = data.namespace_by_uri(&namespace.uri) {
                if existing.id != namespace.id {
                    return Err(invalid(
                        namespace,
                        format!("namespace with uri `{}` already exists", namespace.uri),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn store(data: &CatalogData, store: &DataStore, _is_new: bool) -> Result<(), CatalogError> {
        if store.name.is_empty() {
            return Err(invalid(store, "store name must not be empty"));
        }
        let Some(workspace_id) = store.workspace.target_id() else {
            return Err(invalid(store, "store must be part of a workspace"));
        };
        if !data.workspaces.contains(workspace_id) {
            return Err(invalid(
                store,
                format!("workspace `{}` does not exist", workspace_id),
            ));
        }
        if let Some(existing) = data.store_by_name(Some(workspace_id), &store.name) {
            if existing.id != store.id {
                return Err(invalid(
                    store,
                    format!("store `{}` already exists in its workspace", store.name),
                ));
            }
        }
        Ok(())
    }

    pub fn resource(
        data: &CatalogData,
        resource: &Resource,
        _is_new: bool,
    ) -> Result<(), CatalogError> {
        if resource.name.is_empty() {
            return Err(invalid(resource, "resource name must not be empty"));
        }
        let Some(store_id) = resource.store.target_id() else {
            return Err(invalid(resource, "resource must be part of a store"));
        };
        if !data.stores.contains(store_id) {
            return Err(invalid(
                resource,
                format!("store `{}` does not exist", store_id),
            ));
        }
        let Some(namespace_id) = resource.namespace.target_id() else {
            return Err(invalid(resource, "resource must be part of a namespace"));
        };
        if !data.namespaces.contains(namespace_id) {
            return Err(invalid(
                resource,
                format!("namespace `{}` does not exist", namespace_id),
            ));
        }
        if let Some(existing) = data.resource_by_name(Some(namespace_id), &resource.name) {
            if existing.id != resource.id {
                return Err(invalid(
                    resource,
                    format!(
                        "resource `{}` already exists in its namespace",
                        resource.name
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn layer(data: &CatalogData, layer: &Layer, _is_new: bool) -> Result<(), CatalogError> {
        if layer.name.is_empty() {
            return Err(invalid(layer, "layer name must not be empty"));
        }
        // A dangling resource reference is tolerated, a blank one is not.
        let blank = match &layer.resource {
            crate::model::ObjRef::Id(id) => id.is_empty(),
            crate::model::ObjRef::Name(name) => name.is_empty(),
        };
        if blank {
            return Err(invalid(layer, "layer must publish a resource"));
        }
        if let Some(existing) = data.layer_by_name(&layer.name) {
            if existing.id != layer.id {
                return Err(invalid(
                    layer,
                    format!("layer named `{}` already exists", layer.name),
                ));
            }
        }
        Ok(())
    }

    pub fn style(data: &CatalogData, style: &Style, _is_new: bool) -> Result<(), CatalogError> {
        if style.name.is_empty() {
            return Err(invalid(style, "style name must not be empty"));
        }
        let scope = style.workspace.as_ref().and_then(|w| w.target_id());
        let existing = match scope {
            Some(_) => data
                .styles
                .find_one_by_key(&crate::model::EntityKey::scoped(scope, &style.name)),
            None => data
                .styles
                .find_one_by_key(&crate::model::EntityKey::global(&style.name)),
        };
        if let Some(existing) = existing {
            if existing.id != style.id {
                return Err(invalid(
                    style,
                    format!("style named `{}` already exists in its scope", style.name),
                ));
            }
        }
        Ok(())
    }

    pub fn layer_group(
        data: &CatalogData,
        group: &LayerGroup,
        _is_new: bool,
    ) -> Result<(), CatalogError> {
        if group.name.is_empty() {
            return Err(invalid(group, "layer group name must not be empty"));
        }
        if group.layers.len() != group.styles.len() {
            return Err(invalid(
                group,
                format!(
                    "layer and style sequences are positionally paired, got {} layers and {} styles",
                    group.layers.len(),
                    group.styles.len()
                ),
            ));
        }
        for group_style in &group.group_styles {
            if group_style.layers.len() != group_style.styles.len() {
                return Err(invalid(
                    group,
                    format!(
                        "group style `{}` has mismatched layer/style sequences",
                        group_style.name
                    ),
                ));
            }
        }
        let scope = group.workspace.as_ref().and_then(|w| w.target_id());
        let existing = data
            .layer_groups
            .find_one_by_key(&crate::model::EntityKey::scoped(scope, &group.name));
        if let Some(existing) = existing {
            if existing.id != group.id {
                return Err(invalid(
                    group,
                    format!("layer group named `{}` already exists in its scope", group.name),
                ));
            }
        }
        Ok(())
    }
}

fn invalid<E: CatalogEntity>(entity: &E, reason: impl Into<String>) -> CatalogError {
    CatalogError::validation(E::KIND, entity.display_name(), reason)
}
