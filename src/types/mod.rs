mod dependency;
mod models;
mod tree;

pub use dependency::DependencyType;
pub use models::*;
pub use tree::{PreOrder, TaskTree};
