use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use futures::future::{try_join_all, FutureExt};
use log::{debug, info};

use util::{HashMap, Timer};

use super::{Composer, Error, Runnable, Scheduler, Step};

/// Which scheduling API the host offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostApi {
    /// The host composes tasks with `sequence`/`concurrent`.
    #[default]
    Composing,
    /// No composer; dependencies are run one by one before the task.
    Legacy,
}

/// A watch trigger recorded by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub source: Vec<String>,
    pub tasks: Vec<String>,
}

struct Entry {
    id: String,
    display_name: String,
    task: Runnable,
}

type CompleteHook = Box<dyn Fn(&str, &Result<()>)>;

/// In-memory [`Scheduler`]. Tasks run on the calling thread.
#[derive(Default)]
pub struct Registry {
    api: HostApi,
    entries: RefCell<Vec<Entry>>,
    index: RefCell<HashMap<String, usize>>,
    watches: RefCell<Vec<Watch>>,
    on_complete: RefCell<Option<CompleteHook>>,
}

impl Registry {
    pub fn new(api: HostApi) -> Self {
        Self {
            api,
            ..Default::default()
        }
    }

    pub fn api(&self) -> HostApi {
        self.api
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|e| e.id.clone()).collect()
    }

    pub fn display_name(&self, id: &str) -> Option<String> {
        let i = *self.index.borrow().get(id)?;
        Some(self.entries.borrow()[i].display_name.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn watches(&self) -> Vec<Watch> {
        self.watches.borrow().clone()
    }

    /// Call `hook` once after each top-level task started by [`Registry::run`] settles.
    pub fn on_complete(&self, hook: impl Fn(&str, &Result<()>) + 'static) {
        *self.on_complete.borrow_mut() = Some(Box::new(hook));
    }

    /// Run the given tasks one after another, blocking until all are done.
    /// Stops at the first failure.
    pub fn run(&self, ids: &[String]) -> Result<()> {
        let tasks = ids
            .iter()
            .map(|id| {
                self.lookup(id)
                    .map(|task| (id, task))
                    .ok_or_else(|| Error::UnknownTask(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        futures::executor::block_on(async {
            for (id, task) in tasks {
                let timer = Timer::now();
                info!("Running '{id}'");
                let result = task().await;
                debug!("'{id}' settled after {:?}", timer.elapsed());
                if let Some(hook) = self.on_complete.borrow().as_ref() {
                    hook(id.as_str(), &result);
                }
                result?;
            }
            Ok::<(), anyhow::Error>(())
        })
    }

    fn resolve_steps(&self, steps: Vec<Step>) -> Result<Vec<Runnable>> {
        steps
            .into_iter()
            .map(|step| -> Result<Runnable> {
                match step {
                    Step::Id(id) => Ok(self.lookup(&id).ok_or(Error::UnknownTask(id))?),
                    Step::Run(task) => Ok(task),
                }
            })
            .collect()
    }
}

impl Scheduler for Registry {
    fn register(&self, id: &str, display_name: &str, task: Runnable) {
        let entry = Entry {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            task,
        };
        let existing = self.index.borrow().get(id).copied();
        match existing {
            Some(i) => self.entries.borrow_mut()[i] = entry,
            None => {
                let mut entries = self.entries.borrow_mut();
                self.index.borrow_mut().insert(id.to_owned(), entries.len());
                entries.push(entry);
            }
        }
    }

    fn lookup(&self, id: &str) -> Option<Runnable> {
        let i = *self.index.borrow().get(id)?;
        Some(self.entries.borrow()[i].task.clone())
    }

    fn composer(&self) -> Option<&dyn Composer> {
        match self.api {
            HostApi::Composing => Some(self),
            HostApi::Legacy => None,
        }
    }

    fn watch(&self, source: &[String], tasks: &[String]) -> Result<()> {
        debug!("Watching {source:?} for {tasks:?}");
        self.watches.borrow_mut().push(Watch {
            source: source.to_vec(),
            tasks: tasks.to_vec(),
        });
        Ok(())
    }
}

impl Composer for Registry {
    fn sequence(&self, steps: Vec<Step>) -> Result<Runnable> {
        let tasks = Rc::new(self.resolve_steps(steps)?);
        Ok(Rc::new(move || {
            let tasks = tasks.clone();
            async move {
                for task in tasks.iter() {
                    task().await?;
                }
                Ok::<(), anyhow::Error>(())
            }
            .boxed_local()
        }))
    }

    fn concurrent(&self, steps: Vec<Step>) -> Result<Runnable> {
        let tasks = self.resolve_steps(steps)?;
        Ok(Rc::new(move || {
            try_join_all(tasks.iter().map(|task| task()))
                .map(|result| result.map(|_| ()))
                .boxed_local()
        }))
    }
}
