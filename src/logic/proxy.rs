use crate::logic::Cloner;
use crate::model::{from_property_map, to_property_map, CatalogEntity, Id};
use crate::store::ModifiedDiff;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Copy-on-write staging wrapper around a catalog entity.
///
/// The wrapped original is snapshotted into its property map once at wrap
/// time; edits land in a sparse pending map and become visible to the rest
/// of the catalog only when the owning store commits the proxy. Reads hand
/// out defensive copies, so nested containers of catalog state can never be
/// mutated in place through a proxy.
///
/// Proxies compare equal by the wrapped entity's id: a proxy equals its
/// original and equals any other proxy of the same original, pending edits
/// or dangling references notwithstanding.
#[derive(Debug, Clone)]
pub struct ModificationProxy<E: CatalogEntity> {
    original: E,
    baseline: Map<String, Value>,
    pending: BTreeMap<String, Value>,
}

impl<E: CatalogEntity> ModificationProxy<E> {
    pub fn wrap(original: E) -> Self {
        let baseline = to_property_map(&original);
        Self {
            original,
            baseline,
            pending: BTreeMap::new(),
        }
    }

    /// Id of the wrapped entity.
    pub fn id(&self) -> &Id {
        self.original.id()
    }

    /// The wrapped, unmodified entity.
    pub fn original(&self) -> &E {
        &self.original
    }

    /// Currently visible value of a property: the pending edit if one is
    /// staged, otherwise a defensive copy of the original's value.
    pub fn get(&self, property: &str) -> Value {
        if let Some(staged) = self.pending.get(property) {
            return staged.clone();
        }
        self.baseline
            .get(property)
            .map(Cloner::clone_value)
            .unwrap_or(Value::Null)
    }

    /// Mutable access to a property, snapshotting the original's value into
    /// the pending set on first access. Subsequent calls return the same
    /// staged slot, not a fresh copy.
    pub fn get_mut(&mut self, property: &str) -> &mut Value {
        let baseline = &self.baseline;
        self.pending.entry(property.to_string()).or_insert_with(|| {
            baseline
                .get(property)
                .map(Cloner::clone_value)
                .unwrap_or(Value::Null)
        })
    }

    /// Stage a new value. Recorded only when it differs from the currently
    /// visible value; re-staging the same property overwrites the pending
    /// slot without touching the baseline.
    pub fn set(&mut self, property: &str, value: Value) {
        if self.get(property) == value {
            return;
        }
        self.pending.insert(property.to_string(), value);
    }

    /// Typed editing: materialize the staged entity, let the caller mutate
    /// it, and stage every field that now differs from the visible state.
    pub fn update(&mut self, edit: impl FnOnce(&mut E)) {
        let mut staged = self.value();
        edit(&mut staged);
        for (property, value) in to_property_map(&staged) {
            self.set(&property, value);
        }
    }

    /// The staged entity: original with all pending edits applied.
    pub fn value(&self) -> E {
        let mut merged = self.baseline.clone();
        for (property, value) in &self.pending {
            merged.insert(property.clone(), value.clone());
        }
        from_property_map(merged).unwrap_or_else(|_| self.original.clone())
    }

    /// Exactly the properties whose staged value differs from the wrapped
    /// original, as (property, old, new) triples. Edits staged back to the
    /// original value do not show up.
    pub fn diff(&self) -> ModifiedDiff {
        let mut diff = ModifiedDiff::default();
        for (property, new_value) in &self.pending {
            let old_value = self.baseline.get(property).cloned().unwrap_or(Value::Null);
            if &old_value != new_value {
                diff.push(property.clone(), old_value, new_value.clone());
            }
        }
        diff
    }

    pub fn is_dirty(&self) -> bool {
        !self.diff().is_empty()
    }

    /// Apply every pending edit onto the wrapped original and clear the
    /// pending set. The proxy stays usable with an empty diff; committing
    /// again without intervening writes is a no-op.
    pub fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let committed = self.value();
        self.baseline = to_property_map(&committed);
        self.original = committed;
        self.pending.clear();
    }

    /// Drop pending edits without applying them.
    pub fn rollback(&mut self) {
        self.pending.clear();
    }

    /// Swap the wrapped instance (e.g. after the canonical object was
    /// reloaded) while carrying the pending edits forward. `swap` returning
    /// `None` keeps the current instance.
    pub fn rewrap(self, swap: impl FnOnce(&E) -> Option<E>) -> Self {
        let remapped = swap(&self.original).unwrap_or(self.original);
        let baseline = to_property_map(&remapped);
        Self {
            original: remapped,
            baseline,
            pending: self.pending,
        }
    }
}

impl<E: CatalogEntity> PartialEq for ModificationProxy<E> {
    fn eq(&self, other: &Self) -> bool {
        self.original.id() == other.original.id()
    }
}

impl<E: CatalogEntity> PartialEq<E> for ModificationProxy<E> {
    fn eq(&self, other: &E) -> bool {
        self.original.id() == other.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataStore, Layer, ObjRef, StyleRef, Workspace};
    use serde_json::json;

    #[test]
    fn edits_are_invisible_until_commit() {
        let ws = Workspace::new("topp");
        let mut proxy = ModificationProxy::wrap(ws.clone());
        proxy.update(|w| w.name = "renamed".to_string());

        assert_eq!(proxy.original().name, "topp");
        assert_eq!(proxy.value().name, "renamed");
        assert_eq!(ws.name, "topp");

        proxy.commit();
        assert_eq!(proxy.original().name, "renamed");
    }

    #[test]
    fn commit_is_idempotent() {
        let mut proxy = ModificationProxy::wrap(Workspace::new("topp"));
        proxy.update(|w| w.isolated = true);
        proxy.commit();
        let after_first = proxy.original().clone();
        proxy.commit();
        assert_eq!(proxy.original(), &after_first);
        assert!(proxy.diff().is_empty());
    }

    #[test]
    fn diff_reports_exactly_the_changed_properties() {
        let mut proxy = ModificationProxy::wrap(Workspace::new("topp"));
        proxy.update(|w| {
            w.name = "renamed".to_string();
            w.isolated = true;
        });
        // Stage a property back to its original value; it must not appear.
        proxy.set("isolated", json!(false));

        let diff = proxy.diff();
        assert_eq!(diff.properties(), vec!["name"]);
        let (old, new) = diff.values_of("name").unwrap();
        assert_eq!(old, &json!("topp"));
        assert_eq!(new, &json!("renamed"));
    }

    #[test]
    fn rollback_discards_pending_edits() {
        let mut proxy = ModificationProxy::wrap(Workspace::new("topp"));
        proxy.update(|w| w.name = "renamed".to_string());
        proxy.rollback();
        assert!(proxy.diff().is_empty());
        assert_eq!(proxy.value().name, "topp");
    }

    #[test]
    fn container_snapshot_is_staged_once() {
        let store = DataStore::new("shapefiles", ObjRef::id("ws-1"));
        let mut proxy = ModificationProxy::wrap(store);

        proxy.get_mut("connection_parameters")
            .as_object_mut()
            .unwrap()
            .insert("host".to_string(), json!("localhost"));
        // Second access sees the staged edit instead of a fresh clone.
        assert_eq!(
            proxy.get_mut("connection_parameters")["host"],
            json!("localhost")
        );
        assert!(proxy.original().connection_parameters.is_empty());

        proxy.commit();
        assert_eq!(
            proxy.original().connection_parameters.get("host"),
            Some(&"localhost".to_string())
        );
    }

    #[test]
    fn reads_hand_out_defensive_copies() {
        let mut store = DataStore::new("shapefiles", ObjRef::id("ws-1"));
        store
            .connection_parameters
            .insert("host".to_string(), "localhost".to_string());
        let proxy = ModificationProxy::wrap(store);

        let mut copy = proxy.get("connection_parameters");
        copy.as_object_mut()
            .unwrap()
            .insert("port".to_string(), json!("5432"));
        assert_eq!(proxy.get("connection_parameters").as_object().unwrap().len(), 1);
    }

    #[test]
    fn equality_delegates_to_the_wrapped_id() {
        let ws = Workspace::new("topp");
        let a = ModificationProxy::wrap(ws.clone());
        let mut b = ModificationProxy::wrap(ws.clone());
        b.update(|w| w.name = "other".to_string());

        assert_eq!(a, b);
        assert_eq!(a, ws);

        // Holds for entities with dangling references too.
        let layer = Layer::new("roads", ObjRef::name("missing-resource"));
        let p = ModificationProxy::wrap(layer.clone());
        assert_eq!(p, layer);
    }

    #[test]
    fn rewrap_carries_the_pending_diff() {
        let ws = Workspace::new("topp");
        let mut proxy = ModificationProxy::wrap(ws.clone());
        proxy.update(|w| w.isolated = true);

        let mut reloaded = ws.clone();
        reloaded.date_created = Some(chrono::Utc::now());
        let rewrapped = proxy.rewrap(|_| Some(reloaded.clone()));

        assert_eq!(rewrapped.original(), &reloaded);
        assert_eq!(rewrapped.diff().properties(), vec!["isolated"]);
        assert!(rewrapped.value().isolated);
    }

    #[test]
    fn staged_style_refs_survive_the_value_round_trip() {
        let mut layer = Layer::new("roads", ObjRef::id("r-1"));
        layer.default_style = Some(StyleRef::name("simple"));
        let mut proxy = ModificationProxy::wrap(layer);
        proxy.update(|l| l.styles.push(StyleRef::id("s-9")));

        let staged = proxy.value();
        assert_eq!(staged.default_style, Some(StyleRef::name("simple")));
        assert_eq!(staged.styles, vec![StyleRef::id("s-9")]);
    }
}
