use crate::model::{
    generate_id, CatalogEntity, EntityKey, EntityKind, Id, ObjRef, PublishedRef, StyleRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// Rendered as one unit, exposed through the root layer.
    Single,
    /// Rendered as one unit, exposed under the group's own name.
    Named,
    /// Pure container, only the member layers are exposed.
    Container,
}

/// A named alternate presentation of a layer group: its own parallel
/// layer/style sequences under a label local to the owning group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStyle {
    pub name: String,
    pub layers: Vec<PublishedRef>,
    pub styles: Vec<Option<StyleRef>>,
}

impl GroupStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
            styles: Vec::new(),
        }
    }
}

/// Ordered sequence of layers (or nested groups) positionally paired with a
/// style sequence; `None` style entries mean "use the layer's default".
/// Optionally scoped to a workspace, shadowing a globally named group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: Id,
    pub name: String,
    pub mode: GroupMode,
    pub workspace: Option<ObjRef>,
    pub root_layer: Option<ObjRef>,
    pub root_layer_style: Option<StyleRef>,
    pub layers: Vec<PublishedRef>,
    pub styles: Vec<Option<StyleRef>>,
    pub group_styles: Vec<GroupStyle>,
    pub date_created: Option<DateTime<Utc>>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            mode: GroupMode::Named,
            workspace: None,
            root_layer: None,
            root_layer_style: None,
            layers: Vec::new(),
            styles: Vec::new(),
            group_styles: Vec::new(),
            date_created: None,
        }
    }

    /// Append a (layer, style) pair, keeping the two sequences in lockstep.
    pub fn push_entry(&mut self, layer: PublishedRef, style: Option<StyleRef>) {
        self.layers.push(layer);
        self.styles.push(style);
    }

    /// Remove the entry pairs at the given positions from both sequences.
    /// Positions must be in ascending order.
    pub fn remove_entries(&mut self, positions: &[usize]) {
        for &pos in positions.iter().rev() {
            if pos < self.layers.len() {
                self.layers.remove(pos);
                self.styles.remove(pos);
            }
        }
    }

    /// Positions of entries referencing the given layer id.
    pub fn positions_of_layer(&self, layer_id: &Id) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.points_to_layer(layer_id))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Positions of entries referencing the given nested group id.
    pub fn positions_of_group(&self, group_id: &Id) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.points_to_group(group_id))
            .map(|(pos, _)| pos)
            .collect()
    }
}

impl CatalogEntity for LayerGroup {
    const KIND: EntityKind = EntityKind::LayerGroup;

    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn index_key(&self) -> EntityKey {
        EntityKey::scoped(
            self.workspace.as_ref().and_then(|w| w.target_id()),
            &self.name,
        )
    }

    fn date_created_mut(&mut self) -> &mut Option<chrono::DateTime<chrono::Utc>> {
        &mut self.date_created
    }
}
