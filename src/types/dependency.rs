use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Link semantics between a predecessor and a successor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DependencyType {
    /// Successor starts after predecessor finishes.
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    /// Successor starts after predecessor starts.
    #[serde(rename = "SS")]
    StartToStart,
    /// Successor finishes after predecessor finishes.
    #[serde(rename = "FF")]
    FinishToFinish,
    /// Successor finishes after predecessor starts.
    #[serde(rename = "SF")]
    StartToFinish,
}

impl DependencyType {
    pub const ALL: [DependencyType; 4] = [
        DependencyType::FinishToStart,
        DependencyType::StartToStart,
        DependencyType::FinishToFinish,
        DependencyType::StartToFinish,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }

    /// Parses the two-letter column code.
    pub fn parse(s: &str) -> Option<DependencyType> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| Error::InvalidInput(format!("unknown dependency type '{s}'")))
    }
}

impl ToSql for DependencyType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DependencyType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown dependency type '{s}'").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_finish_to_start() {
        assert_eq!(DependencyType::default(), DependencyType::FinishToStart);
        assert_eq!(DependencyType::default().as_str(), "FS");
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!(DependencyType::parse("SS"), Some(DependencyType::StartToStart));
        assert_eq!(DependencyType::parse("SF"), Some(DependencyType::StartToFinish));
        assert_eq!(DependencyType::parse("XX"), None);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        let t: DependencyType = "ff".parse().unwrap();
        assert_eq!(t, DependencyType::FinishToFinish);
        assert!(matches!(
            "finish".parse::<DependencyType>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&DependencyType::StartToStart).unwrap();
        assert_eq!(json, "\"SS\"");
        let back: DependencyType = serde_json::from_str("\"FF\"").unwrap();
        assert_eq!(back, DependencyType::FinishToFinish);
    }
}
