//! Table-sync configuration
//!
//! One explicit record per table endpoint. Unknown fields are rejected at
//! deserialization time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use idops_core::error::{SyncError, SyncResult};

/// Which side of the reconciliation a table client serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    /// The table rows are copied from.
    Source,
    /// The table rows are inserted into and deleted from.
    Dest,
}

impl std::fmt::Display for TableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableRole::Source => write!(f, "source"),
            TableRole::Dest => write!(f, "dest"),
        }
    }
}

/// Configuration for one table endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Table name.
    pub table: String,

    /// Optional alias used in the SELECT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Optional WHERE restriction for the projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    /// Columns excluded from the projection entirely (lower-case names).
    #[serde(default)]
    pub excl_cols: BTreeSet<String>,

    /// Columns replaced by a fixed literal on the source side.
    #[serde(default)]
    pub mask_cols: BTreeMap<String, String>,

    /// Unique key column sets; each gets its own prepared DELETE.
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,

    /// Insert cap; `0` means unlimited.
    #[serde(default)]
    pub max_inserts: u32,

    /// Delete cap; `0` means unlimited.
    #[serde(default)]
    pub max_deletes: u32,

    /// Ignore caps and commit periodically.
    #[serde(default)]
    pub force: bool,

    /// Count and log mutations without executing them.
    #[serde(default)]
    pub dry_run: bool,

    /// Deduplicate the projection and bound deletes to single rows.
    #[serde(default)]
    pub no_dups: bool,

    /// Verbose progress output.
    #[serde(default)]
    pub debug: bool,
}

impl TableConfig {
    /// Create a configuration for `table` with defaults.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            where_clause: None,
            excl_cols: BTreeSet::new(),
            mask_cols: BTreeMap::new(),
            unique_keys: Vec::new(),
            max_inserts: 0,
            max_deletes: 0,
            force: false,
            dry_run: false,
            no_dups: false,
            debug: false,
        }
    }

    /// Set the table alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Restrict the projection.
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Exclude a column.
    pub fn exclude(mut self, col: impl Into<String>) -> Self {
        self.excl_cols.insert(col.into().to_lowercase());
        self
    }

    /// Mask a column with a literal on the source side.
    pub fn mask(mut self, col: impl Into<String>, literal: impl Into<String>) -> Self {
        self.mask_cols
            .insert(col.into().to_lowercase(), literal.into());
        self
    }

    /// Register a unique key column set.
    pub fn unique_key<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_keys
            .push(cols.into_iter().map(|c| c.into().to_lowercase()).collect());
        self
    }

    /// Set the insert cap.
    #[must_use]
    pub fn with_max_inserts(mut self, max: u32) -> Self {
        self.max_inserts = max;
        self
    }

    /// Set the delete cap.
    #[must_use]
    pub fn with_max_deletes(mut self, max: u32) -> Self {
        self.max_deletes = max;
        self
    }

    /// Ignore caps and commit periodically.
    #[must_use]
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Count mutations without executing them.
    #[must_use]
    pub fn dry(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Deduplicate the projection.
    #[must_use]
    pub fn without_dups(mut self) -> Self {
        self.no_dups = true;
        self
    }

    /// Validate internal consistency (column-dependent checks happen after
    /// the metadata probe).
    pub fn validate(&self) -> SyncResult<()> {
        if self.table.is_empty() {
            return Err(SyncError::invalid_argument("table is required"));
        }
        for col in self.mask_cols.keys() {
            if self.excl_cols.contains(col) {
                return Err(SyncError::invalid_argument(format!(
                    "column {col} is both masked and excluded"
                )));
            }
        }
        for (i, key) in self.unique_keys.iter().enumerate() {
            if key.is_empty() {
                return Err(SyncError::invalid_argument(format!(
                    "unique_keys[{i}] is empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_lowercase() {
        let config = TableConfig::new("netgroups")
            .exclude("Modified_At")
            .mask("Password", "x")
            .unique_key(["Host", "User"]);
        assert!(config.excl_cols.contains("modified_at"));
        assert!(config.mask_cols.contains_key("password"));
        assert_eq!(config.unique_keys[0], vec!["host", "user"]);
    }

    #[test]
    fn test_validate_mask_vs_exclude() {
        let config = TableConfig::new("t").exclude("c").mask("c", "x");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_table() {
        assert!(TableConfig::new("").validate().is_err());
    }

    #[test]
    fn test_validate_empty_unique_key() {
        let config = TableConfig::new("t").unique_key(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"table":"t","maxdeletes":5}"#;
        assert!(serde_json::from_str::<TableConfig>(json).is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(TableRole::Source.to_string(), "source");
        assert_eq!(TableRole::Dest.to_string(), "dest");
    }
}
