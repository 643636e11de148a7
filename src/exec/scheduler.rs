use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;

/// A registered task, ready to start. Each call starts a new run.
pub type Runnable = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<()>>>;

/// Shared handle to the scheduler, as handed to task bodies under `scheduler`.
pub type Host = Rc<dyn Scheduler>;

/// One step of a composed task.
#[derive(Clone)]
pub enum Step {
    /// Looked up by id when the composition is built.
    Id(String),
    Run(Runnable),
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "Id({id})"),
            Self::Run(_) => write!(f, "Run"),
        }
    }
}

/// Combines steps into a single runnable.
///
/// Both operations fail if a [`Step::Id`] names a task that isn't registered yet.
pub trait Composer {
    /// Run each step after the previous one finished; stop at the first failure.
    fn sequence(&self, steps: Vec<Step>) -> Result<Runnable>;
    /// Start all steps together; fail as soon as one of them fails.
    fn concurrent(&self, steps: Vec<Step>) -> Result<Runnable>;
}

/// The host tasks get registered with.
pub trait Scheduler {
    fn register(&self, id: &str, display_name: &str, task: Runnable);
    fn lookup(&self, id: &str) -> Option<Runnable>;
    /// `None` for hosts that can't compose tasks themselves.
    fn composer(&self) -> Option<&dyn Composer>;
    /// Ask the host to run `tasks` whenever files matching `source` change.
    fn watch(&self, source: &[String], tasks: &[String]) -> Result<()>;
}
