use anyhow::Result;
use log::debug;

use util::{HashMap, Wildcard};

use crate::{Dep, Error, TaskDescriptor, TaskTree, TreeNode, NAMESPACE_SEP};

/// Flat, ordered set of tasks keyed by namespaced id.
///
/// Ids are built by joining the names of the enclosing directories
/// and the task file's stem with [`NAMESPACE_SEP`].
#[derive(Debug, Default)]
pub struct Graph {
    tasks: Vec<TaskDescriptor>,
    index: HashMap<String, usize>,
}

impl Graph {
    /// Flatten `tree` and expand wildcard dependencies.
    /// Extensions in `extensions` are stripped from task names.
    pub fn build(tree: TaskTree, extensions: &[String]) -> Result<Self> {
        let mut graph = Self::default();
        graph.flatten(tree, None, extensions);
        graph.expand_wildcards()?;
        Ok(graph)
    }

    fn flatten(&mut self, tree: TaskTree, parent: Option<&str>, extensions: &[String]) {
        for (name, node) in tree {
            match node {
                TreeNode::Dir(subtree) => {
                    let id = namespaced(parent, &name);
                    self.flatten(subtree, Some(&id), extensions);
                }
                TreeNode::Task(mut task) => {
                    task.id = namespaced(parent, strip_extension(&name, extensions));
                    self.insert(task);
                }
            }
        }
    }

    /// Add a task under its id. An existing task with the same id is replaced in place.
    pub fn insert(&mut self, task: TaskDescriptor) {
        match self.index.get(&task.id) {
            Some(&i) => self.tasks[i] = task,
            None => {
                self.index.insert(task.id.clone(), self.tasks.len());
                self.tasks.push(task);
            }
        }
    }

    /// Replace each wildcard dependency with the ids it matches, in graph order.
    ///
    /// A task never matches itself, and patterns that match nothing are dropped.
    /// Patterns inside concurrent groups are expanded within the group;
    /// a group left empty is dropped. Running this twice changes nothing.
    pub fn expand_wildcards(&mut self) -> Result<()> {
        let ids: Vec<String> = self.tasks.iter().map(|t| t.id.clone()).collect();

        for task in &mut self.tasks {
            if !task.deps.iter().any(has_pattern) {
                continue;
            }
            let mut expanded = Vec::with_capacity(task.deps.len());
            for dep in task.deps.drain(..) {
                match dep {
                    Dep::Task(pattern) if Wildcard::is_pattern(&pattern) => {
                        let found = matching(&ids, &pattern, &task.id)?;
                        debug!("{}: '{pattern}' matched {found:?}", task.id);
                        expanded.extend(found.into_iter().map(Dep::Task));
                    }
                    Dep::Group(members) if members.iter().any(|m| Wildcard::is_pattern(m)) => {
                        let mut group = Vec::with_capacity(members.len());
                        for member in members {
                            if Wildcard::is_pattern(&member) {
                                group.extend(matching(&ids, &member, &task.id)?);
                            } else {
                                group.push(member);
                            }
                        }
                        if !group.is_empty() {
                            expanded.push(Dep::Group(group));
                        }
                    }
                    dep => expanded.push(dep),
                }
            }
            task.deps = expanded;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TaskDescriptor> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoIterator for Graph {
    type Item = TaskDescriptor;
    type IntoIter = std::vec::IntoIter<TaskDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

fn has_pattern(dep: &Dep) -> bool {
    dep.ids().into_iter().any(Wildcard::is_pattern)
}

fn matching(ids: &[String], pattern: &str, own: &str) -> Result<Vec<String>> {
    let wildcard = Wildcard::new(pattern)
        .map_err(|_| Error::InvalidPattern(pattern.to_owned(), own.to_owned()))?;
    Ok(ids
        .iter()
        .filter(|id| id.as_str() != own && wildcard.matches(id))
        .cloned()
        .collect())
}

fn namespaced(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}{NAMESPACE_SEP}{name}"),
        None => name.to_owned(),
    }
}

fn strip_extension<'a>(name: &'a str, extensions: &[String]) -> &'a str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => name,
    }
}
