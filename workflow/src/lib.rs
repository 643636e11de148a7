//! Types describing tasks once they have been loaded from a directory tree:
//! task bodies and their completion handles, the nested [`TaskTree`],
//! and the flat [`Graph`] of namespaced ids that gets registered with a host.

mod done;
pub use done::{Completion, Done};

mod body;
pub use body::{Outcome, TaskFn};

mod task;
pub use task::{Dep, Export, Inputs, Source, TaskDescriptor, TaskRecord, WatchSpec};

mod tree;
pub use tree::{TaskTree, TreeNode};

mod graph;
pub use graph::Graph;

/// Separates namespace segments in a task id, e.g. "build:assets:minify".
pub const NAMESPACE_SEP: char = ':';

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid dependency pattern \"{0}\" in task \"{1}\"")]
    InvalidPattern(String, String),
}
