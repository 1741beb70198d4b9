use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};

use super::Store;
use super::graph;
use super::schema::{self, SCHEMA};
use super::validation::{
    TaskFields, validate_color, validate_date_range, validate_name, validate_progress,
    validate_task_fields,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::types::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

const PROJECT_COLUMNS: &str = "id, name, description, created_at, updated_at";

const TASK_COLUMNS: &str = "id, project_id, parent_id, name, description, start_date, end_date,
     progress, is_milestone, is_expanded, sort_order, color, assignee,
     baseline_start_date, baseline_end_date, created_at, updated_at";

const DEPENDENCY_COLUMNS: &str = "id, predecessor_id, successor_id, dependency_type, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the database at `db_path` with default settings.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::open(&StoreConfig::default().with_db_path(db_path.as_ref()))
    }

    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", config.journal_mode.as_pragma())?;
        conn.busy_timeout(config.busy_timeout())?;

        tracing::debug!("Opened schedule store at {}", config.db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }

    /// Runs `f` inside a write transaction taken up front, so validation and
    /// the writes it guards cannot interleave with another writer. Nothing is
    /// committed if `f` fails.
    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            DateTime::UNIX_EPOCH
        })
}

// Same shape as the schema's strftime default so ORDER BY on the text column
// is chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_optional_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => get_date(row, idx).map(Some),
        None => Ok(None),
    }
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .map_or(DateTime::UNIX_EPOCH, |s| parse_datetime(&s)))
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: get_timestamp(row, 3)?,
        updated_at: get_timestamp(row, 4)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        start_date: get_date(row, 5)?,
        end_date: get_date(row, 6)?,
        progress: row.get::<_, Option<i32>>(7)?.unwrap_or_default(),
        is_milestone: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
        is_expanded: row.get::<_, Option<bool>>(9)?.unwrap_or(true),
        sort_order: row.get::<_, Option<i32>>(10)?.unwrap_or_default(),
        color: row.get(11)?,
        assignee: row.get(12)?,
        baseline_start_date: get_optional_date(row, 13)?,
        baseline_end_date: get_optional_date(row, 14)?,
        created_at: get_timestamp(row, 15)?,
        updated_at: get_timestamp(row, 16)?,
    })
}

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<TaskDependency> {
    Ok(TaskDependency {
        id: row.get(0)?,
        predecessor_id: row.get(1)?,
        successor_id: row.get(2)?,
        dependency_type: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
    })
}

fn fetch_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
        params![id],
        project_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn fetch_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        params![id],
        task_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn fetch_dependency(conn: &Connection, id: i64) -> Result<Option<TaskDependency>> {
    conn.query_row(
        &format!("SELECT {DEPENDENCY_COLUMNS} FROM task_dependencies WHERE id = ?1"),
        params![id],
        dependency_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn project_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM projects WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn task_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM tasks WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn edge_exists(conn: &Connection, predecessor_id: i64, successor_id: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM task_dependencies WHERE predecessor_id = ?1 AND successor_id = ?2",
            params![predecessor_id, successor_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Checks that `parent_id` may hold `task_id` (`None` for a task not yet
/// inserted) within `project_id`.
fn check_parent(
    conn: &Connection,
    project_id: i64,
    task_id: Option<i64>,
    parent_id: i64,
) -> Result<()> {
    let parent = fetch_task(conn, parent_id)?.ok_or(Error::NotFound("parent task"))?;

    if parent.project_id != project_id {
        return Err(Error::CrossProjectParent {
            task_project: project_id,
            parent_project: parent.project_id,
        });
    }

    if let Some(task_id) = task_id {
        if graph::is_in_subtree(conn, task_id, parent_id)? {
            return Err(Error::ParentCycle {
                task: task_id,
                parent: parent_id,
            });
        }
    }

    Ok(())
}

fn query_tasks(conn: &Connection, filter: &str, id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE {filter} = ?1 ORDER BY sort_order, id"
    ))?;
    let rows = stmt.query_map(params![id], task_from_row)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        schema::migrate(&conn)?;
        Ok(())
    }

    // Project operations

    fn create_project(&self, project: &NewProject) -> Result<Project> {
        validate_name("Project", &project.name)?;

        self.write(|tx| {
            let now = format_datetime(&Utc::now());
            tx.execute(
                "INSERT INTO projects (name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![project.name, project.description, now],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(project_id = id, "Created project");
            fetch_project(tx, id)?.ok_or(Error::NotFound("project"))
        })
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        fetch_project(&self.conn(), id)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<Project> {
        self.write(|tx| {
            let mut project = fetch_project(tx, id)?.ok_or(Error::NotFound("project"))?;

            if let Some(name) = &update.name {
                validate_name("Project", name)?;
                project.name.clone_from(name);
            }
            if let Some(description) = &update.description {
                project.description.clone_from(description);
            }

            tx.execute(
                "UPDATE projects SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    project.name,
                    project.description,
                    format_datetime(&Utc::now()),
                    id
                ],
            )?;
            tracing::debug!(project_id = id, "Updated project");
            fetch_project(tx, id)?.ok_or(Error::NotFound("project"))
        })
    }

    fn delete_project(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
            if rows == 0 {
                return Err(Error::NotFound("project"));
            }
            tracing::debug!(project_id = id, "Deleted project and its tasks");
            Ok(())
        })
    }

    // Task operations

    fn create_task(&self, task: &NewTask) -> Result<Task> {
        validate_task_fields(&TaskFields {
            name: &task.name,
            start_date: task.start_date,
            end_date: task.end_date,
            progress: task.progress,
            color: task.color.as_deref(),
        })?;

        self.write(|tx| {
            if !project_exists(tx, task.project_id)? {
                return Err(Error::NotFound("project"));
            }
            if let Some(parent_id) = task.parent_id {
                check_parent(tx, task.project_id, None, parent_id)?;
            }

            let now = format_datetime(&Utc::now());
            tx.execute(
                "INSERT INTO tasks (project_id, parent_id, name, description, start_date, end_date,
                                    progress, is_milestone, is_expanded, sort_order, color, assignee,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                params![
                    task.project_id,
                    task.parent_id,
                    task.name,
                    task.description,
                    format_date(&task.start_date),
                    format_date(&task.end_date),
                    task.progress,
                    task.is_milestone,
                    task.is_expanded,
                    task.sort_order,
                    task.color,
                    task.assignee,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(task_id = id, project_id = task.project_id, "Created task");
            fetch_task(tx, id)?.ok_or(Error::NotFound("task"))
        })
    }

    fn get_task(&self, id: i64) -> Result<Option<Task>> {
        fetch_task(&self.conn(), id)
    }

    fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        let conn = self.conn();
        if !project_exists(&conn, project_id)? {
            return Err(Error::NotFound("project"));
        }
        let tasks = query_tasks(&conn, "project_id", project_id)?;
        Ok(TaskTree::build(tasks).into_display_order())
    }

    fn list_child_tasks(&self, parent_id: i64) -> Result<Vec<Task>> {
        let conn = self.conn();
        if !task_exists(&conn, parent_id)? {
            return Err(Error::NotFound("task"));
        }
        query_tasks(&conn, "parent_id", parent_id)
    }

    fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task> {
        self.write(|tx| {
            let current = fetch_task(tx, id)?.ok_or(Error::NotFound("task"))?;
            if update.is_empty() {
                return Ok(current);
            }

            let next = update.apply_to(&current);
            if let Some(name) = &update.name {
                validate_name("Task", name)?;
            }
            if update.start_date.is_some() || update.end_date.is_some() {
                validate_date_range(next.start_date, next.end_date)?;
            }
            if let Some(progress) = update.progress {
                validate_progress(progress)?;
            }
            if let Some(color) = &update.color {
                validate_color(color.as_deref())?;
            }

            if next.parent_id != current.parent_id {
                if let Some(parent_id) = next.parent_id {
                    check_parent(tx, current.project_id, Some(id), parent_id)?;
                }
            }

            tx.execute(
                "UPDATE tasks SET parent_id = ?1, name = ?2, description = ?3, start_date = ?4,
                                  end_date = ?5, progress = ?6, is_milestone = ?7, is_expanded = ?8,
                                  sort_order = ?9, color = ?10, assignee = ?11, updated_at = ?12
                 WHERE id = ?13",
                params![
                    next.parent_id,
                    next.name,
                    next.description,
                    format_date(&next.start_date),
                    format_date(&next.end_date),
                    next.progress,
                    next.is_milestone,
                    next.is_expanded,
                    next.sort_order,
                    next.color,
                    next.assignee,
                    format_datetime(&Utc::now()),
                    id,
                ],
            )?;
            tracing::debug!(task_id = id, "Updated task");
            fetch_task(tx, id)?.ok_or(Error::NotFound("task"))
        })
    }

    fn delete_task(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            if !task_exists(tx, id)? {
                return Err(Error::NotFound("task"));
            }

            let removed_tasks = graph::subtree_ids(tx, id)?.len();
            let removed_edges = graph::subtree_edge_count(tx, id)?;

            tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            tracing::debug!(
                task_id = id,
                removed_tasks,
                removed_edges,
                "Deleted task subtree"
            );
            Ok(())
        })
    }

    fn reorder_tasks(
        &self,
        project_id: i64,
        parent_id: Option<i64>,
        ordered_ids: &[i64],
    ) -> Result<()> {
        self.write(|tx| {
            if !project_exists(tx, project_id)? {
                return Err(Error::NotFound("project"));
            }

            let now = format_datetime(&Utc::now());
            let mut seen = std::collections::HashSet::new();

            for (position, &task_id) in ordered_ids.iter().enumerate() {
                if !seen.insert(task_id) {
                    return Err(Error::InvalidInput(format!(
                        "task {task_id} listed more than once"
                    )));
                }

                let task = fetch_task(tx, task_id)?.ok_or(Error::NotFound("task"))?;
                if task.project_id != project_id || task.parent_id != parent_id {
                    return Err(Error::InvalidInput(format!(
                        "task {task_id} is not a child of the given parent"
                    )));
                }

                let sort_order = i32::try_from(position)
                    .map_err(|_| Error::InvalidInput("too many tasks to reorder".to_string()))?;
                tx.execute(
                    "UPDATE tasks SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                    params![sort_order, now, task_id],
                )?;
            }

            tracing::debug!(project_id, ?parent_id, count = ordered_ids.len(), "Reordered tasks");
            Ok(())
        })
    }

    // Baseline operations

    fn set_baseline(&self, task_id: i64) -> Result<Task> {
        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE tasks SET baseline_start_date = start_date, baseline_end_date = end_date,
                                  updated_at = ?1
                 WHERE id = ?2",
                params![format_datetime(&Utc::now()), task_id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound("task"));
            }
            fetch_task(tx, task_id)?.ok_or(Error::NotFound("task"))
        })
    }

    fn clear_baseline(&self, task_id: i64) -> Result<Task> {
        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE tasks SET baseline_start_date = NULL, baseline_end_date = NULL,
                                  updated_at = ?1
                 WHERE id = ?2",
                params![format_datetime(&Utc::now()), task_id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound("task"));
            }
            fetch_task(tx, task_id)?.ok_or(Error::NotFound("task"))
        })
    }

    // Dependency operations

    fn add_dependency(
        &self,
        predecessor_id: i64,
        successor_id: i64,
        dependency_type: DependencyType,
    ) -> Result<TaskDependency> {
        if predecessor_id == successor_id {
            return Err(Error::SelfDependency(predecessor_id));
        }

        self.write(|tx| {
            if !task_exists(tx, predecessor_id)? {
                return Err(Error::NotFound("predecessor task"));
            }
            if !task_exists(tx, successor_id)? {
                return Err(Error::NotFound("successor task"));
            }
            if edge_exists(tx, predecessor_id, successor_id)? {
                return Err(Error::DuplicateEdge {
                    predecessor: predecessor_id,
                    successor: successor_id,
                });
            }
            if graph::path_exists(tx, successor_id, predecessor_id)? {
                tracing::warn!(
                    predecessor_id,
                    successor_id,
                    "Rejected dependency that would close a cycle"
                );
                return Err(Error::CycleDetected {
                    predecessor: predecessor_id,
                    successor: successor_id,
                });
            }

            tx.execute(
                "INSERT INTO task_dependencies (predecessor_id, successor_id, dependency_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    predecessor_id,
                    successor_id,
                    dependency_type,
                    format_datetime(&Utc::now())
                ],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(
                dependency_id = id,
                predecessor_id,
                successor_id,
                %dependency_type,
                "Added dependency"
            );
            fetch_dependency(tx, id)?.ok_or(Error::NotFound("dependency"))
        })
    }

    fn remove_dependency(&self, predecessor_id: i64, successor_id: i64) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute(
                "DELETE FROM task_dependencies WHERE predecessor_id = ?1 AND successor_id = ?2",
                params![predecessor_id, successor_id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound("dependency"));
            }
            tracing::debug!(predecessor_id, successor_id, "Removed dependency");
            Ok(())
        })
    }

    fn list_dependencies(&self, task_id: i64) -> Result<Vec<TaskDependency>> {
        let conn = self.conn();
        if !task_exists(&conn, task_id)? {
            return Err(Error::NotFound("task"));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {DEPENDENCY_COLUMNS} FROM task_dependencies
             WHERE predecessor_id = ?1 OR successor_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![task_id], dependency_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_project_dependencies(&self, project_id: i64) -> Result<Vec<TaskDependency>> {
        let conn = self.conn();
        if !project_exists(&conn, project_id)? {
            return Err(Error::NotFound("project"));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {DEPENDENCY_COLUMNS} FROM task_dependencies
             WHERE predecessor_id IN (SELECT id FROM tasks WHERE project_id = ?1)
                OR successor_id IN (SELECT id FROM tasks WHERE project_id = ?1)
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![project_id], dependency_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        tracing::debug!("Checkpointed store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn create_task(store: &SqliteStore, project_id: i64, parent_id: Option<i64>) -> Task {
        let mut task = NewTask::new(project_id, "task", date(2025, 4, 1), date(2025, 4, 4));
        task.parent_id = parent_id;
        store.create_task(&task).unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = setup();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"tasks".to_string()));
        assert!(tables.contains(&"task_dependencies".to_string()));

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(indexes.len(), 4);
    }

    #[test]
    fn test_initialize_twice() {
        let (_temp, store) = setup();
        store.initialize().unwrap();
    }

    #[test]
    fn test_project_crud() {
        let (_temp, store) = setup();

        let project = store
            .create_project(&NewProject::new("Launch").with_description("Q3 launch"))
            .unwrap();
        assert_eq!(project.name, "Launch");
        assert_eq!(project.description.as_deref(), Some("Q3 launch"));
        assert_eq!(project.created_at, project.updated_at);

        let fetched = store.get_project(project.id).unwrap().unwrap();
        assert_eq!(fetched, project);

        let updated = store
            .update_project(
                project.id,
                &ProjectUpdate {
                    description: Some(None),
                    ..ProjectUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Launch");
        assert_eq!(updated.description, None);
        assert!(updated.updated_at >= project.updated_at);

        store.delete_project(project.id).unwrap();
        assert!(store.get_project(project.id).unwrap().is_none());
        assert!(matches!(
            store.delete_project(project.id),
            Err(Error::NotFound("project"))
        ));
    }

    #[test]
    fn test_list_projects_newest_first() {
        let (_temp, store) = setup();
        let first = store.create_project(&NewProject::new("first")).unwrap();
        let second = store.create_project(&NewProject::new("second")).unwrap();

        let ids: Vec<i64> = store.list_projects().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_create_project_rejects_blank_name() {
        let (_temp, store) = setup();
        let result = store.create_project(&NewProject::new("  "));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_create_task_defaults() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let task = create_task(&store, project.id, None);

        assert_eq!(task.progress, 0);
        assert!(!task.is_milestone);
        assert!(task.is_expanded);
        assert_eq!(task.sort_order, 0);
        assert!(task.is_root());
        assert_eq!(task.duration_days(), 4);
    }

    #[test]
    fn test_create_task_missing_references() {
        let (_temp, store) = setup();
        let missing_project = NewTask::new(99, "t", date(2025, 1, 1), date(2025, 1, 2));
        assert!(matches!(
            store.create_task(&missing_project),
            Err(Error::NotFound("project"))
        ));

        let project = store.create_project(&NewProject::new("p")).unwrap();
        let missing_parent =
            NewTask::new(project.id, "t", date(2025, 1, 1), date(2025, 1, 2)).with_parent(42);
        assert!(matches!(
            store.create_task(&missing_parent),
            Err(Error::NotFound("parent task"))
        ));
    }

    #[test]
    fn test_create_task_rejects_cross_project_parent() {
        let (_temp, store) = setup();
        let a = store.create_project(&NewProject::new("a")).unwrap();
        let b = store.create_project(&NewProject::new("b")).unwrap();
        let parent = create_task(&store, a.id, None);

        let child = NewTask::new(b.id, "child", date(2025, 1, 1), date(2025, 1, 2))
            .with_parent(parent.id);
        let result = store.create_task(&child);
        assert!(matches!(
            result,
            Err(Error::CrossProjectParent { task_project, parent_project })
                if task_project == b.id && parent_project == a.id
        ));
    }

    #[test]
    fn test_create_task_rejects_bad_color() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let mut task = NewTask::new(project.id, "t", date(2025, 1, 1), date(2025, 1, 2));
        task.color = Some("blue".to_string());
        assert!(matches!(
            store.create_task(&task),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_task_reparent_rejects_descendant() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let root = create_task(&store, project.id, None);
        let child = create_task(&store, project.id, Some(root.id));
        let grandchild = create_task(&store, project.id, Some(child.id));

        let to_grandchild = TaskUpdate {
            parent_id: Some(Some(grandchild.id)),
            ..TaskUpdate::default()
        };
        assert!(matches!(
            store.update_task(root.id, &to_grandchild),
            Err(Error::ParentCycle { .. })
        ));

        let to_self = TaskUpdate {
            parent_id: Some(Some(root.id)),
            ..TaskUpdate::default()
        };
        assert!(matches!(
            store.update_task(root.id, &to_self),
            Err(Error::ParentCycle { .. })
        ));

        let detach = TaskUpdate {
            parent_id: Some(None),
            ..TaskUpdate::default()
        };
        let moved = store.update_task(grandchild.id, &detach).unwrap();
        assert!(moved.is_root());
    }

    #[test]
    fn test_update_task_invalid_range_keeps_row() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let task = create_task(&store, project.id, None);

        let update = TaskUpdate {
            end_date: Some(date(2025, 3, 1)),
            ..TaskUpdate::default()
        };
        assert!(matches!(
            store.update_task(task.id, &update),
            Err(Error::InvalidRange { .. })
        ));
        assert_eq!(store.get_task(task.id).unwrap().unwrap(), task);
    }

    #[test]
    fn test_update_unknown_task() {
        let (_temp, store) = setup();
        let update = TaskUpdate {
            progress: Some(10),
            ..TaskUpdate::default()
        };
        assert!(matches!(
            store.update_task(7, &update),
            Err(Error::NotFound("task"))
        ));
    }

    #[test]
    fn test_baseline_round_trip() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let task = create_task(&store, project.id, None);

        let baselined = store.set_baseline(task.id).unwrap();
        assert!(baselined.has_baseline());
        assert_eq!(baselined.baseline_start_date, Some(task.start_date));

        let slipped = store
            .update_task(
                task.id,
                &TaskUpdate {
                    start_date: Some(date(2025, 4, 3)),
                    end_date: Some(date(2025, 4, 9)),
                    ..TaskUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(slipped.start_variance_days(), 2);
        assert_eq!(slipped.end_variance_days(), 5);

        let cleared = store.clear_baseline(task.id).unwrap();
        assert!(!cleared.has_baseline());
        assert!(matches!(
            store.set_baseline(999),
            Err(Error::NotFound("task"))
        ));
    }

    #[test]
    fn test_reorder_tasks() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let parent = create_task(&store, project.id, None);
        let a = create_task(&store, project.id, Some(parent.id));
        let b = create_task(&store, project.id, Some(parent.id));
        let c = create_task(&store, project.id, Some(parent.id));

        store
            .reorder_tasks(project.id, Some(parent.id), &[c.id, a.id, b.id])
            .unwrap();
        let ids: Vec<i64> = store
            .list_child_tasks(parent.id)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);

        let wrong_parent = store.reorder_tasks(project.id, None, &[a.id]);
        assert!(matches!(wrong_parent, Err(Error::InvalidInput(_))));

        let duplicate = store.reorder_tasks(project.id, Some(parent.id), &[a.id, a.id]);
        assert!(matches!(duplicate, Err(Error::InvalidInput(_))));

        let ids_after: Vec<i64> = store
            .list_child_tasks(parent.id)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids_after, vec![c.id, a.id, b.id]);
    }

    #[test]
    fn test_dependency_type_round_trip() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let a = create_task(&store, project.id, None);
        let b = create_task(&store, project.id, None);

        let dep = store
            .add_dependency(a.id, b.id, DependencyType::StartToFinish)
            .unwrap();
        assert_eq!(dep.dependency_type, DependencyType::StartToFinish);
        assert_eq!(dep.other_end(a.id), Some(b.id));

        let listed = store.list_dependencies(b.id).unwrap();
        assert_eq!(listed, vec![dep]);
    }

    #[test]
    fn test_self_dependency() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let a = create_task(&store, project.id, None);
        assert!(matches!(
            store.add_dependency(a.id, a.id, DependencyType::default()),
            Err(Error::SelfDependency(id)) if id == a.id
        ));
    }

    #[test]
    fn test_dependency_missing_endpoint() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let a = create_task(&store, project.id, None);
        assert!(matches!(
            store.add_dependency(a.id, 500, DependencyType::default()),
            Err(Error::NotFound("successor task"))
        ));
        assert!(matches!(
            store.add_dependency(500, a.id, DependencyType::default()),
            Err(Error::NotFound("predecessor task"))
        ));
    }

    #[test]
    fn test_remove_dependency() {
        let (_temp, store) = setup();
        let project = store.create_project(&NewProject::new("p")).unwrap();
        let a = create_task(&store, project.id, None);
        let b = create_task(&store, project.id, None);
        store
            .add_dependency(a.id, b.id, DependencyType::default())
            .unwrap();

        assert!(matches!(
            store.remove_dependency(b.id, a.id),
            Err(Error::NotFound("dependency"))
        ));
        store.remove_dependency(a.id, b.id).unwrap();
        assert!(store.list_dependencies(a.id).unwrap().is_empty());

        // Removing the edge frees the reverse direction.
        store
            .add_dependency(b.id, a.id, DependencyType::default())
            .unwrap();
    }

    #[test]
    fn test_datetime_parsing_accepts_sqlite_default() {
        let parsed = parse_datetime("2025-01-02 03:04:05");
        assert_eq!(parsed.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_null_timestamps_read_the_same_every_time() {
        let (_temp, store) = setup();
        store
            .connection()
            .execute(
                "INSERT INTO projects (name, created_at, updated_at) VALUES ('bare', NULL, NULL)",
                [],
            )
            .unwrap();

        let first = store.get_project(1).unwrap().unwrap();
        let second = store.get_project(1).unwrap().unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[test]
    fn test_rows_with_sqlite_default_timestamps() {
        let (_temp, store) = setup();
        store
            .connection()
            .execute_batch(
                "INSERT INTO projects (name) VALUES ('legacy');
                 INSERT INTO tasks (project_id, name, start_date, end_date)
                     VALUES (1, 'old', '2024-12-01', '2024-12-05');",
            )
            .unwrap();

        let tasks = store.list_tasks(1).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].start_date, date(2024, 12, 1));
        assert!(tasks[0].is_expanded);
    }
}
