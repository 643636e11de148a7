use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::TaskFn;

/// One dependency of a task: either a single task id (possibly a wildcard
/// pattern), or a group of ids that run concurrently with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dep {
    Task(String),
    Group(Vec<String>),
}

impl Dep {
    /// All ids this dependency refers to.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Task(id) => vec![id.as_str()],
            Self::Group(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Dep {
    fn from(id: &str) -> Self {
        Self::Task(id.to_owned())
    }
}

/// The ways a record can declare its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Inputs {
    /// `"(src, level = 2)"`
    Signature(String),
    /// `["src", "level = 2"]`
    Entries(Vec<String>),
}

/// Glob(s) a watch task observes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Source {
    One(String),
    Many(Vec<String>),
}

impl Source {
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchSpec {
    pub source: Source,
    #[serde(default)]
    pub tasks: Vec<Dep>,
}

/// A task written as a record in a task file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub deps: Vec<Dep>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Shell command to run as the task body.
    pub run: Option<String>,
    pub inputs: Option<Inputs>,
    pub watch: Option<WatchSpec>,
    /// Anything else in the record; carried over to [`TaskDescriptor::extra`].
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What a task file (or a programmatic registration) exported.
#[derive(Debug, Clone)]
pub enum Export {
    /// A body; the task has no dependencies.
    Callable(TaskFn),
    /// Only dependencies; the body is a no-op.
    Deps(Vec<Dep>),
    Record(TaskRecord),
}

/// A task as it appears in the [`crate::Graph`].
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// Namespaced id, e.g. "build:assets:minify". Assigned when the graph is built.
    pub id: String,
    /// Display name, if the task declared one.
    pub name: Option<String>,
    pub description: Option<String>,
    /// File (or directory) the task was found at.
    pub path: PathBuf,
    /// Root directory the task was found under.
    pub cwd: PathBuf,
    pub body: TaskFn,
    pub deps: Vec<Dep>,
    /// Fields of a task record that have no meaning here, kept as written.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskDescriptor {
    pub fn new(path: impl Into<PathBuf>, cwd: impl Into<PathBuf>, body: TaskFn) -> Self {
        Self {
            id: String::new(),
            name: None,
            description: None,
            path: path.into(),
            cwd: cwd.into(),
            body,
            deps: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_deps(mut self, deps: Vec<Dep>) -> Self {
        self.deps = deps;
        self
    }

    /// Name shown to the user: the declared name, else the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_record_json() -> Result<()> {
        let record: TaskRecord = serde_json::from_str(
            r#"{
                "deps": ["clean", ["lint:*", "test"]],
                "run": "make all",
                "inputs": "(level = 2)",
                "owner": "ci"
            }"#,
        )?;
        assert_eq!(
            vec![
                Dep::from("clean"),
                Dep::Group(vec!["lint:*".to_owned(), "test".to_owned()])
            ],
            record.deps
        );
        assert_eq!(Some("make all"), record.run.as_deref());
        assert_eq!(Some(Inputs::Signature("(level = 2)".to_owned())), record.inputs);
        assert_eq!(Some(&serde_json::json!("ci")), record.extra.get("owner"));
        Ok(())
    }

    #[test]
    fn test_record_toml() -> Result<()> {
        let record: TaskRecord = toml::from_str(
            r#"
            deps = ["build"]
            inputs = ["src", "dest = 'out'"]

            [watch]
            source = "src/**/*.rs"
            tasks = ["build"]
            "#,
        )?;
        assert_eq!(vec![Dep::from("build")], record.deps);
        assert_eq!(
            Some(Inputs::Entries(vec!["src".to_owned(), "dest = 'out'".to_owned()])),
            record.inputs
        );
        let watch = record.watch.unwrap();
        assert_eq!(vec!["src/**/*.rs"], watch.source.patterns());
        assert_eq!(vec![Dep::from("build")], watch.tasks);
        Ok(())
    }

    #[test]
    fn test_dep_ids() {
        assert_eq!(vec!["a"], Dep::from("a").ids());
        assert_eq!(vec!["a", "b"], Dep::Group(vec!["a".into(), "b".into()]).ids());
    }
}
