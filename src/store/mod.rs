pub mod catalog;
pub mod events;
pub mod facade;
pub mod index;

pub use catalog::*;
pub use events::*;
pub use facade::*;
pub use index::*;
