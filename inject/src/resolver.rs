use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;

use util::{kebab_case, HashMap};

use crate::{Config, Error, ModuleLoader, Params, Value};

/// An explicitly supplied input.
///
/// Whether a string is data or a module to load is decided by the variant,
/// not by the type of the value: `Value(Value::Str(..))` is handed to the
/// task as that string, and only `Specifier` is ever loaded.
#[derive(Debug, Clone)]
pub enum Injection {
    /// used as-is, strings included
    Value(Value),
    /// a module specifier, loaded when the input is resolved
    Specifier(String),
}

impl From<Value> for Injection {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Explicit injections by input name.
#[derive(Debug, Clone, Default)]
pub struct Injections {
    entries: HashMap<String, Injection>,
}

impl Injections {
    pub fn insert(&mut self, name: &str, injection: Injection) -> &mut Self {
        self.entries.insert(name.to_owned(), injection);
        self
    }

    /// Builder-style [`Injections::insert`].
    pub fn with(mut self, name: &str, injection: impl Into<Injection>) -> Self {
        self.insert(name, injection.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Injection> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `self` with `overrides` layered on top.
    pub fn merged(&self, overrides: &Injections) -> Injections {
        let mut entries = self.entries.clone();
        for (name, injection) in &overrides.entries {
            entries.insert(name.clone(), injection.clone());
        }
        Injections { entries }
    }
}

/// Where a resolution happens: which task is asking, and what it was handed.
#[derive(Debug, Clone)]
pub struct Scope {
    /// id of the task, used by the `log` helper
    pub task: String,
    /// working directory of the task
    pub cwd: PathBuf,
    /// task file; module lookups are relative to its directory
    pub path: PathBuf,
    pub inject: Injections,
}

impl Scope {
    pub fn new(task: &str, cwd: &Path, path: &Path) -> Self {
        Self {
            task: task.to_owned(),
            cwd: cwd.to_path_buf(),
            path: path.to_path_buf(),
            inject: Injections::default(),
        }
    }

    pub fn with_inject(mut self, inject: Injections) -> Self {
        self.inject = inject;
        self
    }

    /// Directory module lookups start from.
    pub fn base_dir(&self) -> &Path {
        if self.path.is_dir() {
            &self.path
        } else {
            self.path.parent().unwrap_or(&self.cwd)
        }
    }
}

/// One way of producing a value for an input name. Tried in [`Strategy::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// injected value for the exact name
    Injected,
    /// injected string for the name, loaded as a module specifier
    InjectedSpecifier,
    /// `settings`, `get_module`, `log`, `paths`
    Builtin,
    /// `<module_prefix><kebab-name>` near the task
    Convention,
    /// `<kebab-name>`
    Hyphenated,
    /// the name as written
    Raw,
}

impl Strategy {
    pub const ORDER: [Strategy; 6] = [
        Strategy::Injected,
        Strategy::InjectedSpecifier,
        Strategy::Builtin,
        Strategy::Convention,
        Strategy::Hyphenated,
        Strategy::Raw,
    ];
}

/// Maps declared input names to values.
#[derive(Clone)]
pub struct Resolver {
    config: Rc<Config>,
    loader: Rc<dyn ModuleLoader>,
}

impl Resolver {
    pub fn new(config: Rc<Config>, loader: Rc<dyn ModuleLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &Rc<Config> {
        &self.config
    }

    /// Resolve every input `params` declares, in order.
    /// Fails on the first input nothing can provide.
    pub fn injection(&self, params: &Params, scope: &Scope) -> Result<Vec<Value>, Error> {
        let inject = self.config.inject.merged(&scope.inject);
        params
            .names()
            .iter()
            .map(|name| {
                self.resolve_in(name, scope, &inject).or_else(|e| {
                    match params.default_for(name) {
                        Some(default) => {
                            log::debug!("using declared default for input '{name}' of {}", scope.task);
                            Ok(default.to_value())
                        }
                        None => Err(e),
                    }
                })
            })
            .collect()
    }

    /// Resolve a single input name. Declared defaults are not considered here.
    pub fn resolve(&self, name: &str, scope: &Scope) -> Result<Value, Error> {
        let inject = self.config.inject.merged(&scope.inject);
        self.resolve_in(name, scope, &inject)
    }

    fn resolve_in(&self, name: &str, scope: &Scope, inject: &Injections) -> Result<Value, Error> {
        for strategy in Strategy::ORDER {
            match self.try_strategy(strategy, name, scope, inject) {
                Ok(Some(value)) if !value.is_nothing() => {
                    log::trace!("input '{name}' of {} provided by {strategy:?}", scope.task);
                    return Ok(value);
                }
                Ok(_) => (),
                Err(e) => log::trace!("{strategy:?} can't provide '{name}': {e:#}"),
            }
        }
        Err(Error::NoProvider(name.to_owned()))
    }

    fn try_strategy(
        &self,
        strategy: Strategy,
        name: &str,
        scope: &Scope,
        inject: &Injections,
    ) -> Result<Option<Value>> {
        let base = scope.base_dir();
        match strategy {
            Strategy::Injected => match inject.get(name) {
                Some(Injection::Value(value)) => Ok(Some(value.clone())),
                _ => Ok(None),
            },
            Strategy::InjectedSpecifier => match inject.get(name) {
                Some(Injection::Specifier(specifier)) => self.loader.load(specifier, base).map(Some),
                _ => Ok(None),
            },
            Strategy::Builtin => Ok(self.builtin(name, scope)),
            Strategy::Convention => {
                let specifier = format!("{}{}", self.config.module_prefix, kebab_case(name));
                self.loader.load(&specifier, base).map(Some)
            }
            Strategy::Hyphenated => self.loader.load(&kebab_case(name), base).map(Some),
            Strategy::Raw => self.loader.load(name, base).map(Some),
        }
    }

    fn builtin(&self, name: &str, scope: &Scope) -> Option<Value> {
        match name {
            "settings" => Some(Value::Live(self.config.clone())),
            "get_module" | "getModule" => Some(Value::live(ModuleGetter {
                resolver: self.clone(),
                scope: scope.clone(),
            })),
            "log" => Some(Value::live(TaskLog {
                task: scope.task.clone(),
            })),
            "paths" => Some(Value::live(TaskPaths {
                cwd: scope.cwd.clone(),
                path: scope.path.clone(),
            })),
            _ => None,
        }
    }
}

/// The `get_module` input: resolves further inputs on demand,
/// in the scope of the task that asked for it.
#[derive(Clone)]
pub struct ModuleGetter {
    resolver: Resolver,
    scope: Scope,
}

impl ModuleGetter {
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        self.resolver.resolve(name, &self.scope)
    }

    /// Resolve several names at once.
    pub fn get_all(&self, names: &[&str]) -> Result<Vec<Value>, Error> {
        names.iter().map(|name| self.get(name)).collect()
    }
}

/// The `log` input: logs on behalf of a task.
#[derive(Debug, Clone)]
pub struct TaskLog {
    task: String,
}

impl TaskLog {
    pub fn info(&self, msg: &str) {
        log::info!("[{}] {msg}", self.task);
    }

    pub fn warn(&self, msg: &str) {
        log::warn!("[{}] {msg}", self.task);
    }

    pub fn debug(&self, msg: &str) {
        log::debug!("[{}] {msg}", self.task);
    }
}

/// The `paths` input: where the task lives.
#[derive(Debug, Clone)]
pub struct TaskPaths {
    pub cwd: PathBuf,
    pub path: PathBuf,
}
