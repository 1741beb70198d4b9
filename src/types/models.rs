use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::DependencyType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial project update. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: i32,
    pub is_milestone: bool,
    pub is_expanded: bool,
    pub sort_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Length of the task in calendar days, both ends inclusive.
    #[must_use]
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    #[must_use]
    pub fn has_baseline(&self) -> bool {
        self.baseline_start_date.is_some() && self.baseline_end_date.is_some()
    }

    /// Days the start has slipped against the baseline. Negative means ahead.
    #[must_use]
    pub fn start_variance_days(&self) -> i64 {
        match (self.has_baseline(), self.baseline_start_date) {
            (true, Some(baseline)) => (self.start_date - baseline).num_days(),
            _ => 0,
        }
    }

    /// Days the end has slipped against the baseline. Negative means ahead.
    #[must_use]
    pub fn end_variance_days(&self) -> i64 {
        match (self.has_baseline(), self.baseline_end_date) {
            (true, Some(baseline)) => (self.end_date - baseline).num_days(),
            _ => 0,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Input for task creation. Timestamps and the id are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default = "default_true")]
    pub is_expanded: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl NewTask {
    pub fn new(
        project_id: i64,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            project_id,
            parent_id: None,
            name: name.into(),
            description: None,
            start_date,
            end_date,
            progress: 0,
            is_milestone: false,
            is_expanded: true,
            sort_order: 0,
            color: None,
            assignee: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial task update. Outer `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub parent_id: Option<Option<i64>>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: Option<i32>,
    pub is_milestone: Option<bool>,
    pub is_expanded: Option<bool>,
    pub sort_order: Option<i32>,
    pub color: Option<Option<String>>,
    pub assignee: Option<Option<String>>,
}

impl TaskUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }

    /// Applies the changed fields to a copy of `task`.
    #[must_use]
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(parent_id) = self.parent_id {
            next.parent_id = parent_id;
        }
        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(start_date) = self.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            next.end_date = end_date;
        }
        if let Some(progress) = self.progress {
            next.progress = progress;
        }
        if let Some(is_milestone) = self.is_milestone {
            next.is_milestone = is_milestone;
        }
        if let Some(is_expanded) = self.is_expanded {
            next.is_expanded = is_expanded;
        }
        if let Some(sort_order) = self.sort_order {
            next.sort_order = sort_order;
        }
        if let Some(color) = &self.color {
            next.color.clone_from(color);
        }
        if let Some(assignee) = &self.assignee {
            next.assignee.clone_from(assignee);
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: i64,
    pub predecessor_id: i64,
    pub successor_id: i64,
    pub dependency_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

impl TaskDependency {
    /// Returns the task on the other end of this edge, if `task_id` is one end.
    #[must_use]
    pub fn other_end(&self, task_id: i64) -> Option<i64> {
        if self.predecessor_id == task_id {
            Some(self.successor_id)
        } else if self.successor_id == task_id {
            Some(self.predecessor_id)
        } else {
            None
        }
    }
}
