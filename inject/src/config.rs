use std::path::PathBuf;

use serde_json::{Map, Value as Json};

use crate::{Injection, Injections};

pub const DEFAULT_MODULE_PREFIX: &str = "ht-";
pub const DEFAULT_MODULES_DIR: &str = "modules";
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["json", "toml", "sh"];

/// Configuration for one graph build.
///
/// Constructed once before scanning starts and shared read-only afterwards
/// (tasks can ask for it with the `settings` input). Typed fields cover what the
/// scanner and resolver need; anything else lives in a free-form json map
/// that tasks can read with [`Config::get`].
#[derive(Debug, Clone)]
pub struct Config {
    /// log scanning and registration diagnostics at info instead of trace
    pub debug: bool,
    /// sub-directory of each root that holds the task files
    pub task_dir: Option<PathBuf>,
    /// prefix for convention-based module lookup: input `sassLint` -> `ht-sass-lint`
    pub module_prefix: String,
    /// name of the directory searched for file modules
    pub modules_dir: String,
    /// file extensions (without '.') that are loaded as tasks
    pub extensions: Vec<String>,
    /// injections available to every task, overridden by per-call injections
    pub inject: Injections,
    values: Map<String, Json>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            task_dir: None,
            module_prefix: DEFAULT_MODULE_PREFIX.to_owned(),
            modules_dir: DEFAULT_MODULES_DIR.to_owned(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|&e| e.to_owned()).collect(),
            inject: Injections::default(),
            values: Map::new(),
        }
    }
}

impl Config {
    /// Look up a free-form value. Dots descend into nested objects: `augment.output`.
    pub fn get(&self, key: &str) -> Option<&Json> {
        let mut parts = key.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Set a free-form value, creating intermediate objects for dotted keys.
    /// Returns the previous value, if any.
    pub fn set(&mut self, key: &str, value: Json) -> Option<Json> {
        let mut parts: Vec<&str> = key.split('.').collect();
        let last = parts.pop()?;
        let mut map = &mut self.values;
        for part in parts {
            let entry = map
                .entry(part.to_owned())
                .or_insert_with(|| Json::Object(Map::new()));
            if !entry.is_object() {
                *entry = Json::Object(Map::new());
            }
            map = entry.as_object_mut()?;
        }
        map.insert(last.to_owned(), value)
    }

    /// Add an injection available to every task.
    pub fn inject(&mut self, name: &str, injection: Injection) {
        self.inject.insert(name, injection);
    }

    /// True if files with this extension are loaded as tasks.
    pub fn is_task_ext(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}
