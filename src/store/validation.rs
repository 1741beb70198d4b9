use chrono::NaiveDate;

use crate::error::{Error, Result};

pub const MIN_PROGRESS: i32 = 0;
pub const MAX_PROGRESS: i32 = 100;

pub fn validate_name(entity: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{entity} name cannot be empty")));
    }
    Ok(())
}

pub fn validate_progress(progress: i32) -> Result<()> {
    if !(MIN_PROGRESS..=MAX_PROGRESS).contains(&progress) {
        return Err(Error::OutOfRange(progress));
    }
    Ok(())
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::InvalidRange { start, end });
    }
    Ok(())
}

/// Accepts `#RGB` and `#RRGGBB`.
pub fn validate_color(color: Option<&str>) -> Result<()> {
    let Some(color) = color else {
        return Ok(());
    };
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return Err(Error::InvalidInput(format!(
            "color '{color}' must be #RGB or #RRGGBB"
        )));
    }
    Ok(())
}

pub struct TaskFields<'a> {
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: i32,
    pub color: Option<&'a str>,
}

pub fn validate_task_fields(fields: &TaskFields<'_>) -> Result<()> {
    validate_name("Task", fields.name)?;
    validate_date_range(fields.start_date, fields.end_date)?;
    validate_progress(fields.progress)?;
    validate_color(fields.color)
}
