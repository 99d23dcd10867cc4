use crate::model::{Id, Style};
use serde::{Deserialize, Serialize};

/// Reference to another catalog object.
///
/// Freshly deserialized graphs may reference targets by name only; the
/// reference resolver rewrites those placeholders to canonical `Id` form
/// once the target is known to the catalog. A `Name` placeholder whose
/// target never shows up stays as-is and dereferences to nothing, it is
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjRef {
    Id(Id),
    Name(String),
}

impl ObjRef {
    pub fn id(id: impl Into<Id>) -> Self {
        ObjRef::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        ObjRef::Name(name.into())
    }

    /// The target id, if this reference has been resolved.
    pub fn target_id(&self) -> Option<&Id> {
        match self {
            ObjRef::Id(id) => Some(id),
            ObjRef::Name(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ObjRef::Id(_))
    }

    pub fn points_to(&self, id: &Id) -> bool {
        self.target_id() == Some(id)
    }
}

/// Entry of a layer group: either a layer or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishedRef {
    Layer(ObjRef),
    Group(ObjRef),
}

impl PublishedRef {
    pub fn obj_ref(&self) -> &ObjRef {
        match self {
            PublishedRef::Layer(r) | PublishedRef::Group(r) => r,
        }
    }

    pub fn obj_ref_mut(&mut self) -> &mut ObjRef {
        match self {
            PublishedRef::Layer(r) | PublishedRef::Group(r) => r,
        }
    }

    pub fn is_layer(&self) -> bool {
        matches!(self, PublishedRef::Layer(_))
    }

    pub fn points_to_layer(&self, id: &Id) -> bool {
        matches!(self, PublishedRef::Layer(r) if r.points_to(id))
    }

    pub fn points_to_group(&self, id: &Id) -> bool {
        matches!(self, PublishedRef::Group(r) if r.points_to(id))
    }
}

/// Reference to a style.
///
/// On top of the id/name forms shared with [`ObjRef`], a style reference can
/// hold a materialized `Virtual` style: a name that only exists as the label
/// of a group style nested inside some layer group, never as a standalone
/// catalog style. The resolver builds a minimal style carrying just that
/// name instead of looking one up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleRef {
    Id(Id),
    Name(String),
    Virtual(Box<Style>),
}

impl StyleRef {
    pub fn id(id: impl Into<Id>) -> Self {
        StyleRef::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        StyleRef::Name(name.into())
    }

    pub fn target_id(&self) -> Option<&Id> {
        match self {
            StyleRef::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn points_to(&self, id: &Id) -> bool {
        self.target_id() == Some(id)
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, StyleRef::Virtual(_))
    }
}
