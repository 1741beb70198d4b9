//! # Gunshart
//!
//! Schedule storage for Gantt-chart projects: projects, per-project task
//! hierarchies, and dependency links between tasks, kept in SQLite.
//!
//! The store enforces what the schema alone cannot: date ranges, progress
//! bounds, same-project parents, and an acyclic dependency graph. Every
//! mutation is validated and committed in a single transaction.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use gunshart::store::{SqliteStore, Store};
//! use gunshart::types::{DependencyType, NewProject, NewTask};
//!
//! let store = SqliteStore::new("./data/gunshart.db")?;
//! store.initialize()?;
//!
//! let project = store.create_project(&NewProject::new("Website relaunch"))?;
//! let day = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
//! let design = store.create_task(&NewTask::new(project.id, "Design", day(2), day(6)))?;
//! let build = store.create_task(&NewTask::new(project.id, "Build", day(9), day(20)))?;
//! store.add_dependency(design.id, build.id, DependencyType::FinishToStart)?;
//!
//! for task in store.list_tasks(project.id)? {
//!     println!("{} {}..{}", task.name, task.start_date, task.end_date);
//! }
//! ```

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Error, Result};
