/// Interface to the host task scheduler
mod scheduler;
pub use scheduler::{Composer, Host, Runnable, Scheduler, Step};

/// Bundled in-memory scheduler
mod registry;
pub use registry::{HostApi, Registry, Watch};

/// Turns task descriptors into runnables and registers them
mod wrapper;
pub use wrapper::Wrapper;

/// Registers a whole graph, retrying until nothing more can register
mod registrar;
pub use registrar::{Registrar, Registration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task \"{0}\" is not registered")]
    UnknownTask(String),
    #[error("Scheduler was dropped before task \"{0}\" ran")]
    HostGone(String),
}
