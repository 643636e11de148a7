use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use inject::Params;
use workflow::{Dep, Export, TaskRecord};

use super::{command_body, Invocation};

/// Reads one task file.
pub trait TaskLoader {
    /// `Ok(None)` if the file holds something that isn't a task.
    /// `cwd` is the root the file was found under.
    fn load(&self, path: &Path, cwd: &Path) -> Result<Option<Export>>;
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("while reading task file {path:?}"))
}

/// `.json`: an array of dependencies, or a task record.
pub struct JsonLoader;

impl TaskLoader for JsonLoader {
    fn load(&self, path: &Path, _cwd: &Path) -> Result<Option<Export>> {
        let json: serde_json::Value = serde_json::from_str(&read(path)?)
            .with_context(|| format!("while parsing {path:?}"))?;
        Ok(match json {
            serde_json::Value::Array(_) => {
                Some(Export::Deps(serde_json::from_value::<Vec<Dep>>(json)?))
            }
            serde_json::Value::Object(_) => {
                Some(Export::Record(serde_json::from_value::<TaskRecord>(json)?))
            }
            _ => None,
        })
    }
}

/// `.toml`: a task record.
pub struct TomlLoader;

impl TaskLoader for TomlLoader {
    fn load(&self, path: &Path, _cwd: &Path) -> Result<Option<Export>> {
        let record: TaskRecord =
            toml::from_str(&read(path)?).with_context(|| format!("while parsing {path:?}"))?;
        Ok(Some(Export::Record(record)))
    }
}

const INPUTS_HEADER: &str = "inputs:";

/// `.sh`: a script run with `sh`.
///
/// Inputs are declared in the leading comment block:
/// ```sh
/// #!/bin/sh
/// # inputs: (target, level = 2)
/// ```
pub struct ScriptLoader;

impl TaskLoader for ScriptLoader {
    fn load(&self, path: &Path, cwd: &Path) -> Result<Option<Export>> {
        let text = read(path)?;
        let params = match declared_inputs(&text) {
            Some(decl) if decl.starts_with('(') => Params::from_signature(decl)?,
            Some(decl) => Params::from_list(decl)?,
            None => Params::none(),
        };
        let body = command_body(Invocation::Script(path.to_path_buf()), params, cwd);
        Ok(Some(Export::Callable(body)))
    }
}

fn declared_inputs(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .take_while(|line| line.starts_with('#'))
        .filter_map(|line| line.trim_start_matches('#').trim().strip_prefix(INPUTS_HEADER))
        .map(str::trim)
        .next()
}
