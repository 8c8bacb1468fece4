//! Database session contract
//!
//! The engine is database-agnostic: a host program supplies a driver wrapper
//! implementing [`SqlSession`] and [`PreparedQuery`]. Row values cross the
//! boundary as nullable strings; the engine handles typed comparison itself.

use async_trait::async_trait;

use idops_core::error::SyncResult;

/// One row as fetched from or bound into a statement.
pub type Row = Vec<Option<String>>;

/// Metadata for one result column, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name as reported.
    pub name: String,
    /// Driver type code (looked up via [`SqlSession::type_name`]).
    pub type_code: i32,
    /// Column precision, when the driver reports one.
    pub precision: Option<u32>,
    /// Column scale, when the driver reports one.
    pub scale: Option<i32>,
}

impl ColumnInfo {
    /// Create column metadata with no precision/scale.
    pub fn new(name: impl Into<String>, type_code: i32) -> Self {
        Self {
            name: name.into(),
            type_code,
            precision: None,
            scale: None,
        }
    }
}

/// A prepared statement owned by a [`TableClient`](crate::TableClient).
///
/// Statements stream rows one at a time; at most one row of result state is
/// held per open statement.
#[async_trait]
pub trait PreparedQuery: Send {
    /// Result column metadata, available after prepare.
    fn columns(&self) -> &[ColumnInfo];

    /// Execute with positional parameters; returns rows affected.
    async fn execute(&mut self, params: &[Option<String>]) -> SyncResult<u64>;

    /// Fetch the next result row, or `None` when exhausted.
    async fn fetch_row(&mut self) -> SyncResult<Option<Row>>;

    /// Close the statement and release driver resources.
    async fn close(&mut self) -> SyncResult<()>;
}

/// A live database session.
#[async_trait]
pub trait SqlSession: Send + Sync {
    /// Prepare a statement.
    async fn prepare(&self, sql: &str) -> SyncResult<Box<dyn PreparedQuery>>;

    /// Execute a statement with no result set (session pragmas).
    async fn execute(&self, sql: &str) -> SyncResult<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> SyncResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> SyncResult<()>;

    /// Switch autocommit on or off.
    async fn set_autocommit(&self, enabled: bool) -> SyncResult<()>;

    /// Driver type name for a type code; first registered name wins.
    fn type_name(&self, type_code: i32) -> Option<String>;

    /// Quote a string as a SQL literal.
    fn quote_literal(&self, raw: &str) -> String {
        format!("'{}'", raw.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LiteralOnly;

    #[async_trait]
    impl SqlSession for LiteralOnly {
        async fn prepare(&self, _sql: &str) -> SyncResult<Box<dyn PreparedQuery>> {
            unimplemented!()
        }
        async fn execute(&self, _sql: &str) -> SyncResult<()> {
            Ok(())
        }
        async fn commit(&self) -> SyncResult<()> {
            Ok(())
        }
        async fn rollback(&self) -> SyncResult<()> {
            Ok(())
        }
        async fn set_autocommit(&self, _enabled: bool) -> SyncResult<()> {
            Ok(())
        }
        fn type_name(&self, _type_code: i32) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_default_literal_quoting() {
        let session = LiteralOnly;
        assert_eq!(session.quote_literal("plain"), "'plain'");
        assert_eq!(session.quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(session.quote_literal(""), "''");
    }

    #[test]
    fn test_column_info_new() {
        let col = ColumnInfo::new("user_id", 4);
        assert_eq!(col.name, "user_id");
        assert_eq!(col.type_code, 4);
        assert_eq!(col.precision, None);
    }
}
