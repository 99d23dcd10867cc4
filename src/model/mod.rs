pub mod common;
pub mod data_store;
pub mod layer;
pub mod layer_group;
pub mod namespace;
pub mod reference;
pub mod resource;
pub mod style;
pub mod workspace;

pub use common::*;
pub use data_store::*;
pub use layer::*;
pub use layer_group::*;
pub use namespace::*;
pub use reference::*;
pub use resource::*;
pub use style::*;
pub use workspace::*;
