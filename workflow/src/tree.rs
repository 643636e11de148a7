use crate::TaskDescriptor;

#[derive(Debug, Clone)]
pub enum TreeNode {
    Dir(TaskTree),
    Task(TaskDescriptor),
}

/// Tasks as they were found on disk: an ordered mapping from entry name
/// (file or directory name) to either a task or a nested tree.
///
/// Inserting a name that already exists replaces the old entry in place,
/// so the position of the first insertion is kept.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    entries: Vec<(String, TreeNode)>,
}

impl TaskTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, node: TreeNode) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((name, node)),
        }
    }

    /// Insert a task under a path of names, creating intermediate trees.
    /// Any non-tree entry in the way is replaced by a tree.
    pub fn insert_at(&mut self, path: &[&str], task: TaskDescriptor) {
        match path {
            [] => (),
            [name] => self.insert(*name, TreeNode::Task(task)),
            [name, rest @ ..] => {
                if !matches!(self.get(name), Some(TreeNode::Dir(_))) {
                    self.insert(*name, TreeNode::Dir(TaskTree::new()));
                }
                if let Some(TreeNode::Dir(subtree)) = self.get_mut(name) {
                    subtree.insert_at(rest, task);
                }
            }
        }
    }

    /// Merge another tree's top-level entries into this one; later entries win.
    pub fn merge(&mut self, other: TaskTree) {
        for (name, node) in other.entries {
            self.insert(name, node);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.entries.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for TaskTree {
    type Item = (String, TreeNode);
    type IntoIter = std::vec::IntoIter<(String, TreeNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
