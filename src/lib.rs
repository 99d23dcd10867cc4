pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export error type
pub use error::CatalogError;

// Export logic types
pub use logic::{
    CascadeAction, CascadeChange, CascadeOp, CascadePlan, CascadePlanner, Cloner,
    ModificationProxy, Resolver, Validator,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    Catalog, CatalogChange, CatalogData, CatalogEvent, CatalogListener, EntityIndex, ModifiedDiff,
};
