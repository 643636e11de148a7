use anyhow::Result;
use log::{trace, warn};

use workflow::{Graph, TaskDescriptor};

use crate::errors::Errors;

use super::Wrapper;

/// Outcome of registering a graph.
#[derive(Debug, Default)]
pub struct Registration {
    /// Ids in the order they were registered.
    pub registered: Vec<String>,
    /// Tasks that can never register, e.g. because an input has no provider.
    pub failed: Vec<(String, anyhow::Error)>,
    /// Tasks still waiting when a pass made no progress, with their last error.
    pub stalled: Vec<(String, anyhow::Error)>,
    /// Number of passes over the queue.
    pub passes: usize,
}

impl Registration {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.stalled.is_empty()
    }

    /// Collect failed and stalled tasks for a recap.
    pub fn errors(self) -> Errors {
        let mut errors = Errors::default();
        for (id, e) in self.failed {
            errors.add_context(e, format!("task \"{id}\" can't be registered"));
        }
        for (id, e) in self.stalled {
            errors.add_context(e, format!("task \"{id}\" was never registered"));
        }
        errors
    }
}

/// Registers every task in a graph, in dependency order.
///
/// Tasks whose dependencies aren't registered yet stay in the queue for the
/// next pass. Passes continue until the queue is empty or a whole pass
/// registers nothing, so at most one pass per task.
pub struct Registrar<'a> {
    wrapper: &'a Wrapper,
    debug: bool,
}

impl<'a> Registrar<'a> {
    pub fn new(wrapper: &'a Wrapper) -> Self {
        Self {
            debug: wrapper.resolver().config().debug,
            wrapper,
        }
    }

    pub fn register(&self, graph: &Graph) -> Registration {
        let mut registration = Registration::default();
        let mut queue: Vec<(&TaskDescriptor, Option<anyhow::Error>)> =
            graph.iter().map(|task| (task, None)).collect();

        while !queue.is_empty() {
            registration.passes += 1;
            let before = queue.len();
            let mut waiting = Vec::with_capacity(queue.len());

            for (task, _) in queue {
                match self.try_register(task) {
                    Ok(()) => registration.registered.push(task.id.clone()),
                    Err(e) if e.downcast_ref::<inject::Error>().is_some() => {
                        warn!("Task \"{}\" can't be registered: {e:#}", task.id);
                        registration.failed.push((task.id.clone(), e));
                    }
                    Err(e) => {
                        trace!("Deferring \"{}\": {e:#}", task.id);
                        waiting.push((task, Some(e)));
                    }
                }
            }

            queue = waiting;
            if queue.len() == before {
                break;
            }
        }

        for (task, e) in queue {
            warn!("Task \"{}\" was never registered", task.id);
            let e = e.unwrap_or_else(|| anyhow::anyhow!("not attempted"));
            registration.stalled.push((task.id.clone(), e));
        }
        registration
    }

    fn try_register(&self, task: &TaskDescriptor) -> Result<()> {
        diag!(self.debug, "Adding task {}", task.id);
        self.wrapper.register(task)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exec::{Host, HostApi, Registry, Scheduler};
    use inject::{Config, Modules, Params, Resolver, Value};
    use std::rc::Rc;
    use workflow::{Dep, Outcome, TaskFn, TaskTree, TreeNode};

    fn task(deps: &[&str]) -> TreeNode {
        let body = TaskFn::new(Params::none(), |_| Ok(Outcome::Value(Value::Undefined)));
        let deps = deps.iter().map(|&d| Dep::from(d)).collect();
        TreeNode::Task(TaskDescriptor::new("/t", "/", body).with_deps(deps))
    }

    fn register(tree: TaskTree) -> Result<(Rc<Registry>, Registration)> {
        let registry = Rc::new(Registry::new(HostApi::Composing));
        let host: Host = registry.clone();
        let resolver = Resolver::new(Rc::new(Config::default()), Rc::new(Modules::new("modules")));
        let wrapper = Wrapper::new(resolver, &host);
        let graph = Graph::build(tree, &[])?;
        let registration = Registrar::new(&wrapper).register(&graph);
        Ok((registry, registration))
    }

    #[test]
    fn test_retries_until_deps_exist() -> Result<()> {
        let mut tree = TaskTree::new();
        tree.insert("x", task(&["y"]));
        tree.insert("y", task(&[]));

        let (registry, registration) = register(tree)?;
        assert_eq!(vec!["y", "x"], registration.registered);
        assert_eq!(2, registration.passes);
        assert!(registration.is_complete());
        assert!(registry.lookup("x").is_some());
        Ok(())
    }

    #[test]
    fn test_chain_registers_one_per_pass() -> Result<()> {
        let mut tree = TaskTree::new();
        tree.insert("a", task(&["b"]));
        tree.insert("b", task(&["c"]));
        tree.insert("c", task(&[]));

        let (_, registration) = register(tree)?;
        assert_eq!(vec!["c", "b", "a"], registration.registered);
        assert_eq!(3, registration.passes);
        Ok(())
    }

    #[test]
    fn test_stops_without_progress() -> Result<()> {
        let mut tree = TaskTree::new();
        tree.insert("ok", task(&[]));
        tree.insert("p", task(&["q"]));
        tree.insert("q", task(&["p"]));
        tree.insert("orphan", task(&["missing"]));

        let (_, registration) = register(tree)?;
        assert_eq!(vec!["ok"], registration.registered);
        assert_eq!(2, registration.passes);
        let stalled: Vec<_> = registration.stalled.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(vec!["p", "q", "orphan"], stalled);
        assert_eq!(3, registration.errors().len());
        Ok(())
    }

    #[test]
    fn test_injection_failure_is_not_retried() -> Result<()> {
        let mut tree = TaskTree::new();
        let body = TaskFn::new(Params::from_names(["unprovided"]), |_| Ok(Outcome::Pending));
        tree.insert("bad", TreeNode::Task(TaskDescriptor::new("/t", "/", body)));
        tree.insert("good", task(&[]));

        let (_, registration) = register(tree)?;
        assert_eq!(vec!["good"], registration.registered);
        assert_eq!(1, registration.passes);
        assert_eq!("bad", registration.failed[0].0);
        assert!(registration.stalled.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_graph() -> Result<()> {
        let (_, registration) = register(TaskTree::new())?;
        assert_eq!(0, registration.passes);
        assert!(registration.is_complete());
        Ok(())
    }
}
