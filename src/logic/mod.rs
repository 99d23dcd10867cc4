pub mod cascade;
pub mod clone;
pub mod proxy;
pub mod resolve;
pub mod validate;

pub use cascade::*;
pub use clone::*;
pub use proxy::*;
pub use resolve::*;
pub use validate::*;
