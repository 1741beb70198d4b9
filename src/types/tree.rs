use std::collections::{HashMap, HashSet};

use super::Task;

/// Per-project task hierarchy.
///
/// Tasks live in an arena; the parent relation is kept as an index from parent
/// id to child positions, so walking the tree never follows owning pointers.
/// Tasks whose parent is missing from the input are treated as roots.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tasks: Vec<Task>,
    roots: Vec<usize>,
    children: HashMap<i64, Vec<usize>>,
}

impl TaskTree {
    pub fn build(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| (t.sort_order, t.id));

        let ids: HashSet<i64> = tasks.iter().map(|t| t.id).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<i64, Vec<usize>> = HashMap::new();

        for (idx, task) in tasks.iter().enumerate() {
            match task.parent_id {
                Some(parent) if parent != task.id && ids.contains(&parent) => {
                    children.entry(parent).or_default().push(idx);
                }
                _ => roots.push(idx),
            }
        }

        Self {
            tasks,
            roots,
            children,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Task> {
        self.roots.iter().map(|&idx| &self.tasks[idx])
    }

    pub fn children(&self, task_id: i64) -> impl Iterator<Item = &Task> {
        self.children
            .get(&task_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.tasks[idx])
    }

    /// Depth-first pre-order walk yielding `(depth, task)`. Each call starts a
    /// fresh walk.
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        let stack = self.roots.iter().rev().map(|&idx| (0, idx)).collect();
        PreOrder {
            tree: self,
            stack,
            visited: HashSet::new(),
        }
    }

    /// Tasks in display order, consuming the tree. Tasks unreachable from any
    /// root (only possible with a parent loop in stored data) come last.
    #[must_use]
    pub fn into_display_order(self) -> Vec<Task> {
        let order: Vec<usize> = {
            let mut walk = self.iter();
            std::iter::from_fn(move || walk.next_index())
                .map(|(_, idx)| idx)
                .collect()
        };
        let mut slots: Vec<Option<Task>> = self.tasks.into_iter().map(Some).collect();
        let mut ordered: Vec<Task> = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        ordered.extend(slots.into_iter().flatten());
        ordered
    }
}

impl<'a> IntoIterator for &'a TaskTree {
    type Item = (usize, &'a Task);
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PreOrder<'a> {
    tree: &'a TaskTree,
    stack: Vec<(usize, usize)>,
    visited: HashSet<usize>,
}

impl PreOrder<'_> {
    fn next_index(&mut self) -> Option<(usize, usize)> {
        while let Some((depth, idx)) = self.stack.pop() {
            // A parent loop in stored data would otherwise never terminate.
            if !self.visited.insert(idx) {
                continue;
            }
            let task_id = self.tree.tasks[idx].id;
            if let Some(kids) = self.tree.children.get(&task_id) {
                self.stack
                    .extend(kids.iter().rev().map(|&child| (depth + 1, child)));
            }
            return Some((depth, idx));
        }
        None
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a Task);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.next_index().map(|(depth, idx)| (depth, &tree.tasks[idx]))
    }
}
