use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use log::warn;

use inject::{Config, Params};
use util::HashMap;
use workflow::{Export, Inputs, TaskDescriptor, TaskFn, TaskRecord, TaskTree, TreeNode};

/// Loaders for the task file formats we understand
mod loaders;
pub use loaders::{JsonLoader, ScriptLoader, TaskLoader, TomlLoader};

/// Task bodies that run shell commands or register watches
mod bodies;
pub use bodies::{command_body, watch_body, Invocation};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task root \"{0}\" is not a directory")]
    NotDirectory(String),
    #[error("Task \"{0}\" declares both a command and a watch")]
    AmbiguousBody(String),
    #[error("Command \"{0}\" failed with {1}")]
    CommandFailed(String, std::process::ExitStatus),
}

/// Walks task roots and loads every task file it finds into a [`TaskTree`].
pub struct Scanner {
    config: Rc<Config>,
    loaders: HashMap<String, Box<dyn TaskLoader>>,
}

impl Scanner {
    /// A scanner with the built-in loaders for `json`, `toml` and `sh` files.
    pub fn new(config: Rc<Config>) -> Self {
        Self {
            config,
            loaders: HashMap::default(),
        }
        .with_loader("json", JsonLoader)
        .with_loader("toml", TomlLoader)
        .with_loader("sh", ScriptLoader)
    }

    /// Load files with extension `ext` using `loader`.
    /// `ext` must also be listed in the config's extensions to be picked up.
    pub fn with_loader(mut self, ext: &str, loader: impl TaskLoader + 'static) -> Self {
        self.loaders.insert(ext.to_ascii_lowercase(), Box::new(loader));
        self
    }

    /// Scan each root (or its configured task sub-directory) and merge the results.
    /// Later roots win where top-level names collide.
    pub fn tree(&self, roots: &[PathBuf]) -> Result<TaskTree> {
        let mut tree = TaskTree::new();
        for root in roots {
            let dir = match &self.config.task_dir {
                Some(task_dir) => root.join(task_dir),
                None => root.clone(),
            };
            diag!(self.config.debug, "Loading tasks from {dir:?}");
            if !dir.is_dir() {
                return Err(Error::NotDirectory(dir.display().to_string()).into());
            }
            tree.merge(self.scan_dir(&dir, root)?);
        }
        Ok(tree)
    }

    fn scan_dir(&self, dir: &Path, cwd: &Path) -> Result<TaskTree> {
        let mut entries = fs::read_dir(dir)
            .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
            .with_context(|| format!("while reading task directory {dir:?}"))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut tree = TaskTree::new();
        for entry in entries {
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!("Skipping {path:?}: name is not valid unicode");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            if path.is_dir() {
                match self.scan_dir(&path, cwd) {
                    Ok(subtree) if subtree.is_empty() => (),
                    Ok(subtree) => tree.insert(name, TreeNode::Dir(subtree)),
                    // only an unreadable root is fatal:
                    Err(e) => warn!("Skipping task directory {path:?}: {e:#}"),
                }
            } else if let Some(task) = self.load(&path, cwd) {
                diag!(self.config.debug, "Found task {path:?}");
                tree.insert(name, TreeNode::Task(task));
            }
        }
        Ok(tree)
    }

    fn load(&self, path: &Path, cwd: &Path) -> Option<TaskDescriptor> {
        let ext = path.extension().and_then(OsStr::to_str)?;
        if !self.config.is_task_ext(ext) {
            diag!(self.config.debug, "Skipping {path:?}");
            return None;
        }
        let Some(loader) = self.loaders.get(&ext.to_ascii_lowercase()) else {
            diag!(self.config.debug, "No loader for {path:?}");
            return None;
        };

        match loader.load(path, cwd).and_then(|export| {
            export
                .map(|export| describe(export, path, cwd))
                .transpose()
        }) {
            Ok(Some(task)) => Some(task),
            Ok(None) => {
                diag!(self.config.debug, "Not a task: {path:?}");
                None
            }
            Err(e) => {
                warn!("Could not load task {path:?}: {e:#}");
                None
            }
        }
    }
}

/// Turn an export into a task descriptor.
pub fn describe(export: Export, path: &Path, cwd: &Path) -> Result<TaskDescriptor> {
    match export {
        Export::Callable(body) => Ok(TaskDescriptor::new(path, cwd, body)),
        Export::Deps(deps) => Ok(TaskDescriptor::new(path, cwd, TaskFn::noop()).with_deps(deps)),
        Export::Record(record) => describe_record(record, path, cwd),
    }
}

fn describe_record(record: TaskRecord, path: &Path, cwd: &Path) -> Result<TaskDescriptor> {
    let params = match &record.inputs {
        None => Params::none(),
        Some(Inputs::Signature(text)) => Params::from_signature(text)?,
        Some(Inputs::Entries(entries)) => Params::from_entries(entries)?,
    };
    let body = match (record.run, record.watch) {
        (Some(_), Some(_)) => {
            return Err(Error::AmbiguousBody(path.display().to_string()).into());
        }
        (Some(run), None) => command_body(Invocation::Shell(run), params, cwd),
        (None, Some(watch)) => watch_body(watch),
        (None, None) => TaskFn::noop(),
    };

    let mut task = TaskDescriptor::new(path, cwd, body).with_deps(record.deps);
    task.name = record.name;
    task.description = record.description;
    task.extra = record.extra;
    Ok(task)
}
