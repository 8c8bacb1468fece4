//! # Table-synchronization core
//!
//! A database-agnostic, streaming row-by-row reconciliation engine: make a
//! destination table equal to a source table (or projection) by emitting
//! minimal inserts and deletes under configurable caps.
//!
//! The engine never talks to a database directly. A host program supplies a
//! driver wrapper implementing [`SqlSession`]; MySQL and Oracle behavior
//! differences are confined to the [`Dialect`] hooks. Memory use is bounded:
//! the merge holds exactly one row per side regardless of table size.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idops_tablesync::{
//!     Dialect, MySqlDialect, Reconciler, TableClient, TableConfig, TableRole,
//! };
//!
//! let dialect: Arc<dyn Dialect> = Arc::new(MySqlDialect);
//! let source = TableClient::init(
//!     TableRole::Source, campus_db, None, Arc::clone(&dialect),
//!     TableConfig::new("netgroups"),
//! ).await?;
//! let dest = TableClient::init(
//!     TableRole::Dest, mirror_db, None, dialect,
//!     TableConfig::new("netgroups").with_max_deletes(100),
//! ).await?;
//!
//! let report = Reconciler::new(source, dest)?.run().await?;
//! println!("+{} -{}", report.inserts, report.deletes);
//! ```

pub mod config;
pub mod dialect;
pub mod reconcile;
pub mod session;
pub mod table;

// Re-exports
pub use config::{TableConfig, TableRole};
pub use dialect::{Dialect, MySqlDialect, OracleDialect};
pub use reconcile::{Reconciler, SyncReport};
pub use session::{ColumnInfo, PreparedQuery, Row, SqlSession};
pub use table::{ColType, Counters, TableClient, MAX_PENDING};
