pub mod client;
pub mod endpoints;
pub mod keys;

pub use client::{ChildNode, CoordClient, CoordError, DirCreate, Node};
pub use endpoints::resolve_endpoints;
