use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = r#"
-- Projects own their tasks
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- Tasks form a forest per project through parent_id
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    parent_id INTEGER REFERENCES tasks(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    start_date TEXT NOT NULL,   -- YYYY-MM-DD
    end_date TEXT NOT NULL,     -- YYYY-MM-DD, never before start_date
    progress INTEGER DEFAULT 0, -- 0-100
    is_milestone INTEGER DEFAULT 0,
    is_expanded INTEGER DEFAULT 1,
    sort_order INTEGER DEFAULT 0,
    color TEXT DEFAULT NULL,
    assignee TEXT DEFAULT NULL,
    created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    baseline_start_date TEXT DEFAULT NULL,
    baseline_end_date TEXT DEFAULT NULL
);

-- Directed links between tasks; at most one per ordered pair
CREATE TABLE IF NOT EXISTS task_dependencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    predecessor_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    successor_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    dependency_type TEXT DEFAULT 'FS' CHECK (dependency_type IN ('FS', 'SS', 'FF', 'SF')),
    created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),

    UNIQUE(predecessor_id, successor_id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_predecessor ON task_dependencies(predecessor_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_successor ON task_dependencies(successor_id);
"#;

/// Columns added to `tasks` after the first release. Databases created before
/// them get the column appended in place.
const TASK_COLUMN_MIGRATIONS: &[(&str, &str)] = &[
    ("color", "ALTER TABLE tasks ADD COLUMN color TEXT DEFAULT NULL"),
    ("assignee", "ALTER TABLE tasks ADD COLUMN assignee TEXT DEFAULT NULL"),
    (
        "baseline_start_date",
        "ALTER TABLE tasks ADD COLUMN baseline_start_date TEXT DEFAULT NULL",
    ),
    (
        "baseline_end_date",
        "ALTER TABLE tasks ADD COLUMN baseline_end_date TEXT DEFAULT NULL",
    ),
];

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("projects", "created_at"),
    ("projects", "updated_at"),
    ("tasks", "created_at"),
    ("tasks", "updated_at"),
    ("task_dependencies", "created_at"),
];

/// Rewrites `datetime('now')` text and missing values into the millisecond
/// RFC 3339 form the store writes, so timestamps compare as text.
fn normalize_timestamps(conn: &Connection) -> Result<usize> {
    let mut rewritten = 0;
    for (table, column) in TIMESTAMP_COLUMNS {
        rewritten += conn.execute(
            &format!(
                "UPDATE {table}
                 SET {column} = strftime('%Y-%m-%dT%H:%M:%fZ', COALESCE({column}, 'now'))
                 WHERE {column} IS NULL
                    OR {column} GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9] [0-9][0-9]:[0-9][0-9]:[0-9][0-9]'"
            ),
            [],
        )?;
    }
    Ok(rewritten)
}

/// Appends any missing task columns and normalizes legacy timestamps.
/// Returns the names of the columns added.
pub fn migrate(conn: &Connection) -> Result<Vec<&'static str>> {
    let existing = table_columns(conn, "tasks")?;
    let mut added = Vec::new();

    for (column, ddl) in TASK_COLUMN_MIGRATIONS {
        if existing.iter().any(|c| c == column) {
            continue;
        }
        conn.execute_batch(ddl)?;
        tracing::info!("Added column tasks.{column}");
        added.push(*column);
    }

    let rewritten = normalize_timestamps(conn)?;
    if rewritten > 0 {
        tracing::info!(rewritten, "Normalized legacy timestamps");
    }

    Ok(added)
}
