//! Per-endpoint table client.
//!
//! A [`TableClient`] introspects its table once (a `where 1=0` probe),
//! classifies every column as string or numeric, builds the SELECT the
//! reconciler streams from and — for the destination side — the INSERT and
//! DELETE statements it mutates through. Mutations are counted, capped, and
//! committed in bounded batches.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use idops_core::audit::{AuditEvent, AuditSink, TracingAuditSink};
use idops_core::error::{SyncError, SyncResult};

use crate::config::{TableConfig, TableRole};
use crate::dialect::Dialect;
use crate::session::{ColumnInfo, PreparedQuery, Row, SqlSession};

/// Commit is forced after this many uncommitted mutations (with `force`).
pub const MAX_PENDING: u64 = 500;

/// Driver type code for CLOB columns.
const TYPE_CODE_CLOB: i32 = 40;

/// Comparison class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColType {
    /// Compared bytewise.
    String,
    /// Compared as arbitrary-precision decimals.
    Numeric,
}

impl std::fmt::Display for ColType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColType::String => write!(f, "string"),
            ColType::Numeric => write!(f, "numeric"),
        }
    }
}

/// Outcome of classifying one probed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classified {
    /// Participates in the projection; the flag marks LONG/CLOB columns.
    Keep(ColType, bool),
    /// Dropped from the projection (RAW/BFILE).
    Skip,
    /// Cannot be synchronized at all.
    Unsupported,
}

/// Classify a column by its driver type name and code.
fn classify_column(upper_name: &str, type_code: i32, dialect: &dyn Dialect) -> Classified {
    if let Some(coltype) = dialect.classify_override(upper_name) {
        return Classified::Keep(coltype, false);
    }
    if ["CHAR", "TIME", "DATE", "BIN"]
        .iter()
        .any(|k| upper_name.contains(k))
    {
        return Classified::Keep(ColType::String, false);
    }
    if upper_name.contains("RAW") || upper_name.contains("BFILE") {
        return Classified::Skip;
    }
    if upper_name.contains("LONG") || type_code == TYPE_CODE_CLOB {
        return Classified::Keep(ColType::String, true);
    }
    if ["DEC", "INT", "NUM", "DOUBLE", "FLOAT"]
        .iter()
        .any(|k| upper_name.contains(k))
    {
        return Classified::Keep(ColType::Numeric, false);
    }
    Classified::Unsupported
}

/// Null-safe equality clause for one column: matches on value or on both
/// sides NULL. Every `?` is bound twice per column (value, null sentinel).
fn null_safe_clause(dialect: &dyn Dialect, col: &str, is_long: bool) -> String {
    let quoted = dialect.quote_ident(col);
    if is_long {
        if let Some(pred) = dialect.long_eq_predicate(&quoted) {
            return format!("({pred} OR (? IS NULL AND {quoted} IS NULL))");
        }
    }
    format!("({quoted} = ? OR (? IS NULL AND {quoted} IS NULL))")
}

fn build_select(config: &TableConfig, select_cols: &[String], sort_cols: &[String]) -> String {
    let mut sql = String::from("SELECT ");
    if config.no_dups {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&select_cols.join(", "));
    sql.push_str(" FROM ");
    sql.push_str(&config.table);
    if let Some(alias) = &config.alias {
        sql.push(' ');
        sql.push_str(alias);
    }
    if let Some(clause) = &config.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    if !sort_cols.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&sort_cols.join(", "));
    }
    sql
}

fn build_insert(dialect: &dyn Dialect, table: &str, colnames: &[String]) -> String {
    let cols: Vec<String> = colnames.iter().map(|c| dialect.quote_ident(c)).collect();
    let marks = vec!["?"; colnames.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols.join(", "),
        marks
    )
}

fn build_delete(
    dialect: &dyn Dialect,
    table: &str,
    cols: &[(String, bool)],
    no_dups: bool,
) -> String {
    let clauses: Vec<String> = cols
        .iter()
        .map(|(name, is_long)| null_safe_clause(dialect, name, *is_long))
        .collect();
    let sql = format!("DELETE FROM {} WHERE {}", table, clauses.join(" AND "));
    if no_dups {
        dialect.apply_row_limit(sql)
    } else {
        sql
    }
}

/// Mutation and commit counters for one client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    /// Uncommitted mutations.
    pub pending: u64,
    /// Commits issued (or accounted in dry-run).
    pub commits: u64,
    /// Rows inserted.
    pub inserts: u64,
    /// Rows deleted.
    pub deletes: u64,
    /// The insert cap was hit.
    pub hit_max_inserts: bool,
    /// The delete cap was hit.
    pub hit_max_deletes: bool,
}

/// One table endpoint: introspected columns, prepared statements, counters.
pub struct TableClient {
    role: TableRole,
    read: Arc<dyn SqlSession>,
    write: Arc<dyn SqlSession>,
    dialect: Arc<dyn Dialect>,
    config: TableConfig,
    colinfo: Vec<ColumnInfo>,
    type_names: Vec<String>,
    colnames: Vec<String>,
    coltypes: Vec<ColType>,
    long_flags: Vec<bool>,
    skipped: BTreeMap<String, &'static str>,
    select_sql: String,
    insert_sql: Option<String>,
    delete_sql: Option<String>,
    select_stmt: Option<Box<dyn PreparedQuery>>,
    insert_stmt: Option<Box<dyn PreparedQuery>>,
    delete_stmt: Option<Box<dyn PreparedQuery>>,
    delete_uniq: Vec<(Box<dyn PreparedQuery>, Vec<usize>)>,
    counters: Counters,
    autocommit_off: bool,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for TableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableClient")
            .field("role", &self.role)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TableClient {
    /// Probe the table, classify its columns, build and prepare the
    /// statements this role needs.
    ///
    /// `write` defaults to the read session; when distinct, both must point
    /// at the same logical database.
    #[instrument(skip(read, write, dialect, config), fields(table = %config.table, %role))]
    pub async fn init(
        role: TableRole,
        read: Arc<dyn SqlSession>,
        write: Option<Arc<dyn SqlSession>>,
        dialect: Arc<dyn Dialect>,
        config: TableConfig,
    ) -> SyncResult<Self> {
        config.validate()?;
        let write = write.unwrap_or_else(|| Arc::clone(&read));

        for sql in dialect.session_setup() {
            read.execute(&sql).await?;
            if !Arc::ptr_eq(&read, &write) {
                write.execute(&sql).await?;
            }
        }

        // Probe column metadata without fetching data.
        let probe_sql = match &config.alias {
            Some(alias) => format!("select * from {} {} where 1=0", config.table, alias),
            None => format!("select * from {} where 1=0", config.table),
        };
        let mut probe = read.prepare(&probe_sql).await?;
        let colinfo: Vec<ColumnInfo> = probe.columns().to_vec();
        probe.close().await?;

        let mut client = Self {
            role,
            read,
            write,
            dialect,
            config,
            colinfo,
            type_names: Vec::new(),
            colnames: Vec::new(),
            coltypes: Vec::new(),
            long_flags: Vec::new(),
            skipped: BTreeMap::new(),
            select_sql: String::new(),
            insert_sql: None,
            delete_sql: None,
            select_stmt: None,
            insert_stmt: None,
            delete_stmt: None,
            delete_uniq: Vec::new(),
            counters: Counters::default(),
            autocommit_off: false,
            audit: Arc::new(TracingAuditSink),
        };

        client.classify_columns()?;
        client.build_queries();
        client.prepare_statements().await?;

        if client.role == TableRole::Dest && !client.config.dry_run {
            client.write.set_autocommit(false).await?;
            client.autocommit_off = true;
        }

        info!(
            columns = client.colnames.len(),
            skipped = client.skipped.len(),
            "table client ready"
        );
        Ok(client)
    }

    /// Replace the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    fn classify_columns(&mut self) -> SyncResult<()> {
        for info in &self.colinfo {
            let lname = info.name.to_lowercase();
            let type_name = self
                .read
                .type_name(info.type_code)
                .unwrap_or_else(|| format!("code {}", info.type_code));
            self.type_names.push(type_name.clone());

            if self.config.excl_cols.contains(&lname) {
                self.skipped.insert(lname, "excluded");
                continue;
            }
            if self.config.mask_cols.contains_key(&lname) {
                self.colnames.push(lname);
                self.coltypes.push(ColType::String);
                self.long_flags.push(false);
                continue;
            }

            match classify_column(&type_name.to_uppercase(), info.type_code, &*self.dialect) {
                Classified::Keep(coltype, is_long) => {
                    self.colnames.push(lname);
                    self.coltypes.push(coltype);
                    self.long_flags.push(is_long);
                }
                Classified::Skip => {
                    self.skipped.insert(lname, "unsupported driver type");
                }
                Classified::Unsupported => {
                    return Err(SyncError::Unsupported {
                        column: lname,
                        type_name,
                    });
                }
            }
        }

        if self.colnames.is_empty() {
            return Err(SyncError::invalid_argument(format!(
                "{} has no synchronizable columns",
                self.config.table
            )));
        }

        for key in &self.config.unique_keys {
            for col in key {
                if !self.colnames.contains(col) {
                    return Err(SyncError::invalid_argument(format!(
                        "unique key column {col} is not in the projection"
                    )));
                }
            }
        }
        Ok(())
    }

    fn build_queries(&mut self) {
        let dialect = &*self.dialect;

        let select_cols: Vec<String> = self
            .colnames
            .iter()
            .map(|col| {
                let quoted = dialect.quote_ident(col);
                match (self.role, self.config.mask_cols.get(col)) {
                    (TableRole::Source, Some(mask)) => {
                        dialect.mask_alias(&self.read.quote_literal(mask), &quoted)
                    }
                    _ => quoted,
                }
            })
            .collect();

        let sort_cols: Vec<String> = self
            .colnames
            .iter()
            .zip(&self.long_flags)
            .filter(|(_, is_long)| !**is_long)
            .map(|(col, _)| dialect.nulls_first_sort_expr(&dialect.quote_ident(col)))
            .collect();

        self.select_sql = build_select(&self.config, &select_cols, &sort_cols);

        if self.role == TableRole::Dest {
            self.insert_sql = Some(build_insert(dialect, &self.config.table, &self.colnames));

            let all_cols: Vec<(String, bool)> = self
                .colnames
                .iter()
                .cloned()
                .zip(self.long_flags.iter().copied())
                .collect();
            self.delete_sql = Some(build_delete(
                dialect,
                &self.config.table,
                &all_cols,
                self.config.no_dups,
            ));
        }

        debug!(select = %self.select_sql, "queries built");
    }

    async fn prepare_statements(&mut self) -> SyncResult<()> {
        self.select_stmt = Some(self.read.prepare(&self.select_sql).await?);

        if self.role != TableRole::Dest {
            return Ok(());
        }

        if let Some(sql) = &self.insert_sql {
            self.insert_stmt = Some(self.write.prepare(sql).await?);
        }
        if let Some(sql) = &self.delete_sql {
            self.delete_stmt = Some(self.write.prepare(sql).await?);
        }

        let unique_keys = self.config.unique_keys.clone();
        for key in unique_keys {
            let indexes: Vec<usize> = key
                .iter()
                .filter_map(|col| self.colnames.iter().position(|c| c == col))
                .collect();
            let cols: Vec<(String, bool)> = indexes
                .iter()
                .map(|&i| (self.colnames[i].clone(), self.long_flags[i]))
                .collect();
            let sql = build_delete(&*self.dialect, &self.config.table, &cols, false);
            let stmt = self.write.prepare(&sql).await?;
            self.delete_uniq.push((stmt, indexes));
        }
        Ok(())
    }

    // ---- streaming ----

    /// Execute the SELECT; rows become available through [`Self::fetch`].
    pub async fn start(&mut self) -> SyncResult<()> {
        let stmt = self
            .select_stmt
            .as_mut()
            .ok_or_else(|| SyncError::invalid_argument("client already closed"))?;
        stmt.execute(&[]).await?;
        Ok(())
    }

    /// Fetch the next projected row in sort order.
    pub async fn fetch(&mut self) -> SyncResult<Option<Row>> {
        let stmt = self
            .select_stmt
            .as_mut()
            .ok_or_else(|| SyncError::invalid_argument("client already closed"))?;
        stmt.fetch_row().await
    }

    // ---- mutations ----

    /// Insert one row, parameters positioned by the projection.
    pub async fn insert_row(&mut self, row: &Row) -> SyncResult<()> {
        if row.len() != self.colnames.len() {
            return Err(SyncError::invalid_argument(format!(
                "row width {} does not match projection width {}",
                row.len(),
                self.colnames.len()
            )));
        }

        let limit = self.config.max_inserts;
        if limit > 0 && self.counters.inserts >= u64::from(limit) && !self.config.force {
            self.counters.hit_max_inserts = true;
            warn!(limit, "insert cap reached");
            if !self.config.dry_run {
                self.roll_back().await?;
            }
            return Err(SyncError::MaxInsertsReached { limit });
        }

        if self.config.dry_run {
            debug!(table = %self.config.table, "dry-run insert");
        } else {
            let stmt = self
                .insert_stmt
                .as_mut()
                .ok_or_else(|| SyncError::invalid_argument("insert on a source-side client"))?;
            stmt.execute(row).await?;
        }

        self.counters.inserts += 1;
        self.counters.pending += 1;
        self.audit.record(AuditEvent::success(
            "row_insert",
            self.config.table.as_str(),
            self.role.to_string(),
        ));
        Ok(())
    }

    /// Delete one row. Uses the per-unique-key statements when configured,
    /// the all-columns statement otherwise. Returns total rows affected.
    pub async fn delete_row(&mut self, row: &Row) -> SyncResult<u64> {
        if row.len() != self.colnames.len() {
            return Err(SyncError::invalid_argument(format!(
                "row width {} does not match projection width {}",
                row.len(),
                self.colnames.len()
            )));
        }

        let limit = self.config.max_deletes;
        if limit > 0 && self.counters.deletes >= u64::from(limit) && !self.config.force {
            self.counters.hit_max_deletes = true;
            warn!(limit, "delete cap reached");
            if !self.config.dry_run {
                self.roll_back().await?;
            }
            return Err(SyncError::MaxDeletesReached { limit });
        }

        let affected = if self.config.dry_run {
            debug!(table = %self.config.table, "dry-run delete");
            1
        } else if self.delete_uniq.is_empty() {
            let stmt = self
                .delete_stmt
                .as_mut()
                .ok_or_else(|| SyncError::invalid_argument("delete on a source-side client"))?;
            let params = doubled_params(row, None);
            stmt.execute(&params).await?
        } else {
            let mut total = 0;
            for (stmt, indexes) in &mut self.delete_uniq {
                let params = doubled_params(row, Some(indexes.as_slice()));
                total += stmt.execute(&params).await?;
            }
            total
        };

        self.counters.deletes += 1;
        self.counters.pending += 1;
        self.audit.record(AuditEvent::success(
            "row_delete",
            self.config.table.as_str(),
            self.role.to_string(),
        ));
        Ok(affected)
    }

    /// Commit accumulated mutations once they exceed [`MAX_PENDING`], when
    /// running forced. Counters advance identically in dry-run.
    pub async fn check_pending(&mut self) -> SyncResult<()> {
        if self.counters.pending > MAX_PENDING && self.config.force {
            if !self.config.dry_run {
                self.write.commit().await?;
            }
            debug!(
                committed = self.counters.pending,
                "pending mutations committed"
            );
            self.counters.pending = 0;
            self.counters.commits += 1;
        }
        Ok(())
    }

    /// Commit outstanding changes (unless dry-run), close every prepared
    /// statement, and restore autocommit.
    pub async fn close_queries(&mut self) -> SyncResult<()> {
        if self.role == TableRole::Dest && !self.config.dry_run {
            self.write.commit().await?;
        }
        if self.counters.pending > 0 {
            self.counters.commits += 1;
            self.counters.pending = 0;
        }

        if let Some(mut stmt) = self.select_stmt.take() {
            stmt.close().await?;
        }
        if let Some(mut stmt) = self.insert_stmt.take() {
            stmt.close().await?;
        }
        if let Some(mut stmt) = self.delete_stmt.take() {
            stmt.close().await?;
        }
        for (mut stmt, _) in self.delete_uniq.drain(..) {
            stmt.close().await?;
        }

        if self.autocommit_off {
            self.write.set_autocommit(true).await?;
            self.autocommit_off = false;
        }
        Ok(())
    }

    /// Roll back the write transaction (destination side only).
    pub async fn roll_back(&mut self) -> SyncResult<()> {
        if self.role == TableRole::Dest {
            self.write.rollback().await?;
            self.counters.pending = 0;
        }
        Ok(())
    }

    /// Best-effort cleanup after an error: roll back, close statements,
    /// restore autocommit. Secondary failures are logged, not returned.
    pub async fn abort(&mut self) {
        if self.role == TableRole::Dest && !self.config.dry_run {
            if let Err(e) = self.roll_back().await {
                warn!(error = %e, "rollback during abort failed");
            }
        }
        if let Some(mut stmt) = self.select_stmt.take() {
            if let Err(e) = stmt.close().await {
                warn!(error = %e, "statement close during abort failed");
            }
        }
        if let Some(mut stmt) = self.insert_stmt.take() {
            if let Err(e) = stmt.close().await {
                warn!(error = %e, "statement close during abort failed");
            }
        }
        if let Some(mut stmt) = self.delete_stmt.take() {
            if let Err(e) = stmt.close().await {
                warn!(error = %e, "statement close during abort failed");
            }
        }
        for (mut stmt, _) in self.delete_uniq.drain(..) {
            if let Err(e) = stmt.close().await {
                warn!(error = %e, "statement close during abort failed");
            }
        }
        if self.autocommit_off {
            if let Err(e) = self.write.set_autocommit(true).await {
                warn!(error = %e, "autocommit restore during abort failed");
            }
            self.autocommit_off = false;
        }
    }

    // ---- introspection ----

    /// The client's role.
    pub fn role(&self) -> TableRole {
        self.role
    }

    /// The configuration in force.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Projected column names, lower-cased, in order.
    pub fn colnames(&self) -> &[String] {
        &self.colnames
    }

    /// Comparison classes, aligned with [`Self::colnames`].
    pub fn coltypes(&self) -> &[ColType] {
        &self.coltypes
    }

    /// LONG/CLOB markers, aligned with [`Self::colnames`].
    pub fn long_flags(&self) -> &[bool] {
        &self.long_flags
    }

    /// Counter snapshot.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// The SELECT this client streams from.
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// The INSERT used on the destination side.
    pub fn insert_sql(&self) -> Option<&str> {
        self.insert_sql.as_deref()
    }

    /// The all-columns DELETE used on the destination side.
    pub fn delete_sql(&self) -> Option<&str> {
        self.delete_sql.as_deref()
    }

    /// Human-readable column report for schema diffs and debugging.
    pub fn dump_colinfo(&self) -> String {
        let mut out = String::new();
        for (info, type_name) in self.colinfo.iter().zip(&self.type_names) {
            let lname = info.name.to_lowercase();
            let disposition = if let Some(reason) = self.skipped.get(&lname) {
                format!("skipped: {reason}")
            } else if let Some(pos) = self.colnames.iter().position(|c| *c == lname) {
                let mut d = self.coltypes[pos].to_string();
                if self.long_flags[pos] {
                    d.push_str(" long");
                }
                if self.config.mask_cols.contains_key(&lname) {
                    d.push_str(" masked");
                }
                d
            } else {
                "unclassified".to_string()
            };
            out.push_str(&format!(
                "{:<24} {:<16} (code {:>3})  {}\n",
                lname, type_name, info.type_code, disposition
            ));
        }
        out
    }
}

/// Bind parameters for a null-safe predicate: each referenced column value
/// appears twice, in statement column order.
fn doubled_params(row: &Row, indexes: Option<&[usize]>) -> Vec<Option<String>> {
    let mut params = Vec::new();
    match indexes {
        Some(indexes) => {
            for &i in indexes {
                params.push(row[i].clone());
                params.push(row[i].clone());
            }
        }
        None => {
            for value in row {
                params.push(value.clone());
                params.push(value.clone());
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect};

    #[test]
    fn test_classify_string_family() {
        let d = MySqlDialect;
        assert_eq!(
            classify_column("VARCHAR", 12, &d),
            Classified::Keep(ColType::String, false)
        );
        assert_eq!(
            classify_column("DATETIME", 93, &d),
            Classified::Keep(ColType::String, false)
        );
        assert_eq!(
            classify_column("DATE", 91, &d),
            Classified::Keep(ColType::String, false)
        );
        assert_eq!(
            classify_column("VARBINARY", 7, &d),
            Classified::Keep(ColType::String, false)
        );
    }

    #[test]
    fn test_classify_numeric_family() {
        let d = MySqlDialect;
        for name in ["DECIMAL", "INTEGER", "NUMBER", "DOUBLE", "FLOAT", "BIGINT"] {
            assert_eq!(
                classify_column(name, 3, &d),
                Classified::Keep(ColType::Numeric, false),
                "{name}"
            );
        }
    }

    #[test]
    fn test_classify_long_and_clob() {
        let d = OracleDialect;
        assert_eq!(
            classify_column("LONG", 8, &d),
            Classified::Keep(ColType::String, true)
        );
        assert_eq!(
            classify_column("CLOB", TYPE_CODE_CLOB, &d),
            Classified::Keep(ColType::String, true)
        );
    }

    #[test]
    fn test_classify_raw_and_bfile_skip() {
        let d = OracleDialect;
        assert_eq!(classify_column("RAW", 23, &d), Classified::Skip);
        assert_eq!(classify_column("LONG RAW", 24, &d), Classified::Skip);
        assert_eq!(classify_column("BFILE", 114, &d), Classified::Skip);
    }

    #[test]
    fn test_classify_blob_mysql_override() {
        assert_eq!(
            classify_column("LONGBLOB", 252, &MySqlDialect),
            Classified::Keep(ColType::String, false)
        );
        // Without the override BLOB is not recognized at all.
        assert_eq!(
            classify_column("BLOB", 252, &OracleDialect),
            Classified::Unsupported
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            classify_column("SDO_GEOMETRY", 999, &OracleDialect),
            Classified::Unsupported
        );
    }

    #[test]
    fn test_null_safe_clause_plain() {
        assert_eq!(
            null_safe_clause(&MySqlDialect, "login", false),
            "(`login` = ? OR (? IS NULL AND `login` IS NULL))"
        );
    }

    #[test]
    fn test_null_safe_clause_long_oracle() {
        assert_eq!(
            null_safe_clause(&OracleDialect, "notes", true),
            "(dbms_lob.compare(notes, ?) = 0 OR (? IS NULL AND notes IS NULL))"
        );
        // MySQL has no LONG predicate; long columns use plain equality.
        assert_eq!(
            null_safe_clause(&MySqlDialect, "notes", true),
            "(`notes` = ? OR (? IS NULL AND `notes` IS NULL))"
        );
    }

    #[test]
    fn test_build_select_mysql() {
        let config = TableConfig::new("netgroups")
            .with_alias("n")
            .with_where("n.kind = 'host'");
        let sql = build_select(
            &config,
            &["`host`".to_string(), "`user`".to_string()],
            &[
                "`host` IS NULL, `host`".to_string(),
                "`user` IS NULL, `user`".to_string(),
            ],
        );
        assert_eq!(
            sql,
            "SELECT `host`, `user` FROM netgroups n WHERE n.kind = 'host' \
             ORDER BY `host` IS NULL, `host`, `user` IS NULL, `user`"
        );
    }

    #[test]
    fn test_build_select_distinct() {
        let config = TableConfig::new("t").without_dups();
        let sql = build_select(&config, &["a".to_string()], &["a".to_string()]);
        assert_eq!(sql, "SELECT DISTINCT a FROM t ORDER BY a");
    }

    #[test]
    fn test_build_insert() {
        let sql = build_insert(
            &MySqlDialect,
            "netgroups",
            &["host".to_string(), "user".to_string()],
        );
        assert_eq!(
            sql,
            "INSERT INTO netgroups (`host`, `user`) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_build_delete_with_limit() {
        let cols = vec![("host".to_string(), false)];
        assert_eq!(
            build_delete(&MySqlDialect, "t", &cols, true),
            "DELETE FROM t WHERE (`host` = ? OR (? IS NULL AND `host` IS NULL)) LIMIT 1"
        );
        assert_eq!(
            build_delete(&OracleDialect, "t", &cols, true),
            "DELETE FROM t WHERE (host = ? OR (? IS NULL AND host IS NULL)) AND rownum=1"
        );
    }

    #[test]
    fn test_doubled_params_full_row() {
        let row: Row = vec![Some("1".to_string()), None];
        let params = doubled_params(&row, None);
        assert_eq!(
            params,
            vec![
                Some("1".to_string()),
                Some("1".to_string()),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_doubled_params_indexed() {
        let row: Row = vec![Some("1".to_string()), Some("a".to_string())];
        let params = doubled_params(&row, Some(&[1]));
        assert_eq!(
            params,
            vec![Some("a".to_string()), Some("a".to_string())]
        );
    }
}
