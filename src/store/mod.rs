mod graph;
mod schema;
mod sqlite;
pub mod validation;

pub use schema::SCHEMA;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the schedule persistence interface.
///
/// Every mutation validates its input and references before writing and is
/// committed atomically together with any cascade it triggers.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Project operations
    fn create_project(&self, project: &NewProject) -> Result<Project>;
    fn get_project(&self, id: i64) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<Project>;
    fn delete_project(&self, id: i64) -> Result<()>;

    // Task operations
    fn create_task(&self, task: &NewTask) -> Result<Task>;
    fn get_task(&self, id: i64) -> Result<Option<Task>>;
    /// Tasks of a project in display order: depth-first, siblings by
    /// `(sort_order, id)`.
    fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>>;
    fn list_child_tasks(&self, parent_id: i64) -> Result<Vec<Task>>;
    fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task>;
    fn delete_task(&self, id: i64) -> Result<()>;
    /// Rewrites `sort_order` of the given siblings to match their position.
    fn reorder_tasks(
        &self,
        project_id: i64,
        parent_id: Option<i64>,
        ordered_ids: &[i64],
    ) -> Result<()>;

    // Baseline operations
    fn set_baseline(&self, task_id: i64) -> Result<Task>;
    fn clear_baseline(&self, task_id: i64) -> Result<Task>;

    // Dependency operations
    fn add_dependency(
        &self,
        predecessor_id: i64,
        successor_id: i64,
        dependency_type: DependencyType,
    ) -> Result<TaskDependency>;
    fn remove_dependency(&self, predecessor_id: i64, successor_id: i64) -> Result<()>;
    /// Edges where the task is either predecessor or successor.
    fn list_dependencies(&self, task_id: i64) -> Result<Vec<TaskDependency>>;
    fn list_project_dependencies(&self, project_id: i64) -> Result<Vec<TaskDependency>>;

    fn close(&self) -> Result<()>;
}
