//! SQL dialect hooks
//!
//! MySQL and Oracle differ only in identifier quoting, NULLS-first sort
//! expression, LONG/CLOB equality, single-row limiting, mask alias syntax,
//! one classification quirk, and session pragmas. Everything else lives in
//! the shared [`TableClient`](crate::TableClient).

use crate::table::ColType;

/// Dialect-specific SQL generation hooks.
pub trait Dialect: Send + Sync {
    /// Dialect name for logs and diffs.
    fn name(&self) -> &'static str;

    /// Quote an identifier.
    fn quote_ident(&self, ident: &str) -> String;

    /// ORDER BY expression for one column that sorts NULLs first.
    ///
    /// `quoted` is the already-quoted identifier. Must agree with the
    /// engine's row comparator (NULL strictly less), otherwise the merge
    /// diverges.
    fn nulls_first_sort_expr(&self, quoted: &str) -> String;

    /// Equality predicate for LONG/CLOB columns, when plain `=` does not
    /// apply. The predicate must contain exactly one `?` placeholder.
    fn long_eq_predicate(&self, quoted: &str) -> Option<String>;

    /// Bound a DELETE to a single row.
    fn apply_row_limit(&self, sql: String) -> String;

    /// Alias a quoted literal to a column name in a projection.
    fn mask_alias(&self, literal: &str, quoted_col: &str) -> String;

    /// Dialect-specific column classification, consulted before the shared
    /// rules. Returns `None` to fall through.
    fn classify_override(&self, upper_type_name: &str) -> Option<ColType> {
        let _ = upper_type_name;
        None
    }

    /// Statements to run on every session before any query.
    fn session_setup(&self) -> Vec<String> {
        Vec::new()
    }
}

/// MySQL dialect.
#[derive(Debug, Default, Clone)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn nulls_first_sort_expr(&self, quoted: &str) -> String {
        // No NULLS FIRST keyword; the IS NULL flag pins NULL placement.
        format!("{quoted} IS NULL, {quoted}")
    }

    fn long_eq_predicate(&self, _quoted: &str) -> Option<String> {
        None
    }

    fn apply_row_limit(&self, sql: String) -> String {
        format!("{sql} LIMIT 1")
    }

    fn mask_alias(&self, literal: &str, quoted_col: &str) -> String {
        format!("{literal} as {quoted_col}")
    }

    fn classify_override(&self, upper_type_name: &str) -> Option<ColType> {
        if upper_type_name.contains("BLOB") {
            Some(ColType::String)
        } else {
            None
        }
    }
}

/// Oracle dialect.
#[derive(Debug, Default, Clone)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_ident(&self, ident: &str) -> String {
        ident.to_string()
    }

    fn nulls_first_sort_expr(&self, quoted: &str) -> String {
        // Relies on the server's NULL placement for the sort direction in
        // use; the comparator-agreement tests pin this down.
        quoted.to_string()
    }

    fn long_eq_predicate(&self, quoted: &str) -> Option<String> {
        Some(format!("dbms_lob.compare({quoted}, ?) = 0"))
    }

    fn apply_row_limit(&self, sql: String) -> String {
        format!("{sql} AND rownum=1")
    }

    fn mask_alias(&self, literal: &str, quoted_col: &str) -> String {
        format!("{literal} {quoted_col}")
    }

    fn session_setup(&self) -> Vec<String> {
        vec![
            "alter session set NLS_DATE_FORMAT='YYYY-MM-DD HH24:MI:SS'".to_string(),
            "alter session set NLS_TIMESTAMP_FORMAT='YYYY-MM-DD HH24:MI:SS.FF'".to_string(),
        ]
    }
}
