//! Reachability queries over the dependency graph and the task hierarchy.
//!
//! These run against whatever connection or transaction the caller holds, so a
//! check and the write it guards share one transaction.

use std::collections::{HashSet, VecDeque};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;

/// Returns true if `to` can be reached from `from` by following
/// predecessor -> successor edges.
pub fn path_exists(conn: &Connection, from: i64, to: i64) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT successor_id FROM task_dependencies WHERE predecessor_id = ?1")?;

    let mut visited: HashSet<i64> = HashSet::new();
    let mut queue: VecDeque<i64> = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        if current == to {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }

        let successors = stmt
            .query_map(params![current], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        queue.extend(successors.into_iter().filter(|id| !visited.contains(id)));
    }

    Ok(false)
}

/// Returns true if `candidate` is `root` or one of its descendants.
pub fn is_in_subtree(conn: &Connection, root: i64, candidate: i64) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT parent_id FROM tasks WHERE id = ?1")?;

    let mut seen: HashSet<i64> = HashSet::new();
    let mut current = Some(candidate);

    while let Some(id) = current {
        if id == root {
            return Ok(true);
        }
        if !seen.insert(id) {
            break;
        }
        current = stmt
            .query_row(params![id], |row| row.get::<_, Option<i64>>(0))
            .optional()?
            .flatten();
    }

    Ok(false)
}

const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
         SELECT ?1
         UNION
         SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
     )";

/// Ids of `root` and every descendant task.
pub fn subtree_ids(conn: &Connection, root: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!("{SUBTREE_CTE} SELECT id FROM subtree"))?;
    let rows = stmt.query_map(params![root], |row| row.get::<_, i64>(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Number of dependency edges touching `root` or any of its descendants.
pub fn subtree_edge_count(conn: &Connection, root: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "{SUBTREE_CTE}
             SELECT COUNT(*) FROM task_dependencies
             WHERE predecessor_id IN (SELECT id FROM subtree)
                OR successor_id IN (SELECT id FROM subtree)"
        ),
        params![root],
        |row| row.get(0),
    )?;
    Ok(count)
}
