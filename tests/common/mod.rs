#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use gunshart::store::{SqliteStore, Store};
use gunshart::types::{NewProject, NewTask, Project, Task};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// An initialized store in its own temp directory.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub store: SqliteStore,
}

impl TestContext {
    pub fn new() -> Self {
        init_tracing();
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("gunshart.db")).expect("open store");
        store.initialize().expect("initialize store");
        Self { temp_dir, store }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("gunshart.db")
    }

    pub fn project(&self, name: &str) -> Project {
        self.store
            .create_project(&NewProject::new(name))
            .expect("create project")
    }

    pub fn task(&self, project_id: i64, name: &str, parent_id: Option<i64>) -> Task {
        let mut task = NewTask::new(project_id, name, date(2025, 5, 5), date(2025, 5, 9));
        task.parent_id = parent_id;
        self.store.create_task(&task).expect("create task")
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.store
            .connection()
            .query_row(sql, [], |row| row.get(0))
            .expect("count query")
    }
}
