use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};

use util::HashMap;

use crate::{Error, Value};

/// Something that can turn a module specifier into a value.
///
/// `base` is the directory the lookup is relative to (normally the directory
/// of the task file that asked for the module).
pub trait ModuleLoader {
    fn load(&self, specifier: &str, base: &Path) -> Result<Value>;
}

/// Natively provided module; gets the lookup's base directory.
pub type Provider = Rc<dyn Fn(&Path) -> Result<Value>>;

const MODULE_EXTS: [&str; 2] = ["json", "toml"];

/// Default [`ModuleLoader`].
///
/// A specifier is looked up, in order:
/// 1. among modules registered with [`Modules::provide`];
/// 2. if it starts with `./` or `../`, as a file relative to `base`;
/// 3. as `<dir>/<modules_dir>/<specifier>.{json,toml}`, for `base` and each of its
///    ancestors, nearest first.
#[derive(Clone)]
pub struct Modules {
    providers: HashMap<String, Provider>,
    modules_dir: String,
}

impl Modules {
    pub fn new(modules_dir: &str) -> Self {
        Self {
            providers: HashMap::default(),
            modules_dir: modules_dir.to_owned(),
        }
    }

    /// Register a native module under `specifier`.
    pub fn provide<F>(&mut self, specifier: &str, provider: F) -> &mut Self
    where
        F: Fn(&Path) -> Result<Value> + 'static,
    {
        self.providers.insert(specifier.to_owned(), Rc::new(provider));
        self
    }

    fn find_file(&self, specifier: &str, base: &Path) -> Option<PathBuf> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let candidate = base.join(specifier);
            if candidate.is_file() {
                return Some(candidate);
            }
            return MODULE_EXTS
                .iter()
                .map(|ext| base.join(format!("{specifier}.{ext}")))
                .find(|path| path.is_file());
        }
        base.ancestors().find_map(|dir| {
            let modules = dir.join(&self.modules_dir);
            MODULE_EXTS
                .iter()
                .map(|ext| modules.join(format!("{specifier}.{ext}")))
                .find(|path| path.is_file())
        })
    }
}

impl ModuleLoader for Modules {
    fn load(&self, specifier: &str, base: &Path) -> Result<Value> {
        if let Some(provider) = self.providers.get(specifier) {
            log::trace!("using native module {specifier}");
            return provider(base);
        }

        let path = self
            .find_file(specifier, base)
            .ok_or_else(|| Error::ModuleNotFound(specifier.to_owned(), format!("{base:?}")))?;
        log::trace!("loading module {specifier} from {path:?}");
        read_module(&path)
    }
}

fn read_module(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading module {path:?}"))?;
    let json = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&text).with_context(|| format!("parsing module {path:?}"))?,
        _ => serde_json::from_str(&text).with_context(|| format!("parsing module {path:?}"))?,
    };
    Ok(Value::Json(json))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    #[test]
    fn test_native() -> Result<()> {
        let mut modules = Modules::new("modules");
        modules.provide("answer", |_| Ok(Value::Int(42)));
        let v = modules.load("answer", Path::new("/nonexistent"))?;
        assert!(matches!(v, Value::Int(42)));
        assert!(modules.load("question", Path::new("/nonexistent")).is_err());
        Ok(())
    }
    #[test]
    fn test_file_modules() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("tasks/build");
        fs::create_dir_all(&nested)?;
        fs::create_dir_all(dir.path().join("modules"))?;
        fs::create_dir_all(dir.path().join("tasks/modules"))?;
        fs::write(dir.path().join("modules/ht-sass.json"), "{\"style\": \"compressed\"}")?;
        fs::write(dir.path().join("modules/paths.toml"), "out = \"dist\"")?;
        // nearer modules dir shadows the outer one:
        fs::write(dir.path().join("tasks/modules/paths.toml"), "out = \"build\"")?;
        fs::write(nested.join("local.json"), "[1, 2]")?;

        let modules = Modules::new("modules");
        let v = modules.load("ht-sass", &nested)?;
        assert_eq!(Some(&json!({"style": "compressed"})), v.as_json());
        let v = modules.load("paths", &nested)?;
        assert_eq!(Some(&json!({"out": "build"})), v.as_json());
        let v = modules.load("./local", &nested)?;
        assert_eq!(Some(&json!([1, 2])), v.as_json());
        assert!(modules.load("missing", &nested).is_err());
        Ok(())
    }
}
