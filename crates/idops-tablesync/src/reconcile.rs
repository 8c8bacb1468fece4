//! Streaming reconciliation driver.
//!
//! Pulls the sorted projections of a source and a destination client and
//! walks them in step, holding exactly one row per side. A row present only
//! in the source is inserted; a row present only in the destination is
//! deleted; matching rows advance both sides. The comparator must agree
//! with the ORDER BY both SELECTs carry, otherwise the merge diverges.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use idops_core::audit::{AuditEvent, AuditSink, TracingAuditSink};
use idops_core::error::{SyncError, SyncResult};

use crate::config::TableRole;
use crate::session::Row;
use crate::table::{ColType, TableClient};

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
    /// Rows inserted into the destination.
    pub inserts: u64,
    /// Rows deleted from the destination.
    pub deletes: u64,
    /// Commits issued.
    pub commits: u64,
    /// Row pairs found equal.
    pub matched: u64,
}

/// Compare one column value pair. NULL sorts strictly first, numeric
/// columns compare as decimals, string columns compare bytewise.
fn compare_values(
    left: Option<&str>,
    right: Option<&str>,
    coltype: ColType,
) -> SyncResult<Ordering> {
    match (left, right) {
        (None, None) => Ok(Ordering::Equal),
        (None, Some(_)) => Ok(Ordering::Less),
        (Some(_), None) => Ok(Ordering::Greater),
        (Some(l), Some(r)) => match coltype {
            ColType::Numeric => {
                let l = Decimal::from_str(l.trim()).map_err(|e| {
                    SyncError::driver_with_source(format!("numeric value {l:?} unparseable"), e)
                })?;
                let r = Decimal::from_str(r.trim()).map_err(|e| {
                    SyncError::driver_with_source(format!("numeric value {r:?} unparseable"), e)
                })?;
                Ok(l.cmp(&r))
            }
            ColType::String => Ok(l.as_bytes().cmp(r.as_bytes())),
        },
    }
}

/// Lexicographic row comparison over the projection, skipping LONG columns.
fn compare_rows(
    source: &Row,
    dest: &Row,
    coltypes: &[ColType],
    long_flags: &[bool],
) -> SyncResult<Ordering> {
    for (i, coltype) in coltypes.iter().enumerate() {
        if long_flags.get(i).copied().unwrap_or(false) {
            continue;
        }
        let ordering = compare_values(
            source.get(i).and_then(|v| v.as_deref()),
            dest.get(i).and_then(|v| v.as_deref()),
            *coltype,
        )?;
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

/// Owns a source and a destination client for the duration of one run.
pub struct Reconciler {
    source: TableClient,
    dest: TableClient,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("source", &self.source)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Pair two clients. Their projections must agree exactly: same column
    /// names, same comparison classes, same LONG markers, same order.
    pub fn new(source: TableClient, dest: TableClient) -> SyncResult<Self> {
        if source.role() != TableRole::Source {
            return Err(SyncError::invalid_argument(
                "first client must have the source role",
            ));
        }
        if dest.role() != TableRole::Dest {
            return Err(SyncError::invalid_argument(
                "second client must have the dest role",
            ));
        }

        if source.colnames() != dest.colnames()
            || source.coltypes() != dest.coltypes()
            || source.long_flags() != dest.long_flags()
        {
            return Err(SyncError::SchemaMismatch {
                diff: format!(
                    "--- source: {}\n{}--- dest: {}\n{}",
                    source.config().table,
                    source.dump_colinfo(),
                    dest.config().table,
                    dest.dump_colinfo()
                ),
            });
        }

        Ok(Self {
            source,
            dest,
            audit: Arc::new(TracingAuditSink),
        })
    }

    /// Replace the audit sink used for the run summary.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Run the merge to completion.
    ///
    /// On any failure the destination transaction is rolled back, both
    /// clients are released, and the first error is reported.
    #[instrument(skip(self), fields(
        source = %self.source.config().table,
        dest = %self.dest.config().table,
    ))]
    pub async fn run(mut self) -> SyncResult<SyncReport> {
        let result = self.merge().await;

        match result {
            Ok(mut report) => {
                self.source.close_queries().await?;
                self.dest.close_queries().await?;

                let counters = self.dest.counters();
                report.inserts = counters.inserts;
                report.deletes = counters.deletes;
                report.commits = counters.commits;

                self.audit.record(
                    AuditEvent::success("table_sync", self.dest.config().table.as_str(), "reconciler")
                        .with_detail(format!(
                            "inserts={} deletes={} commits={} matched={}",
                            report.inserts, report.deletes, report.commits, report.matched
                        )),
                );
                info!(
                    inserts = report.inserts,
                    deletes = report.deletes,
                    matched = report.matched,
                    "reconciliation complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.source.abort().await;
                self.dest.abort().await;
                self.audit.record(
                    AuditEvent::failure("table_sync", self.dest.config().table.as_str(), "reconciler")
                        .with_detail(e.to_string()),
                );
                Err(e)
            }
        }
    }

    async fn merge(&mut self) -> SyncResult<SyncReport> {
        let coltypes = self.source.coltypes().to_vec();
        let long_flags = self.source.long_flags().to_vec();

        self.source.start().await?;
        self.dest.start().await?;

        let mut report = SyncReport::default();
        let mut s = self.source.fetch().await?;
        let mut d = self.dest.fetch().await?;

        loop {
            match (s.take(), d.take()) {
                (None, None) => break,
                (Some(src_row), None) => {
                    self.dest.insert_row(&src_row).await?;
                    s = self.source.fetch().await?;
                }
                (None, Some(dst_row)) => {
                    self.dest.delete_row(&dst_row).await?;
                    d = self.dest.fetch().await?;
                }
                (Some(src_row), Some(dst_row)) => {
                    match compare_rows(&src_row, &dst_row, &coltypes, &long_flags)? {
                        Ordering::Less => {
                            self.dest.insert_row(&src_row).await?;
                            s = self.source.fetch().await?;
                            d = Some(dst_row);
                        }
                        Ordering::Greater => {
                            self.dest.delete_row(&dst_row).await?;
                            d = self.dest.fetch().await?;
                            s = Some(src_row);
                        }
                        Ordering::Equal => {
                            report.matched += 1;
                            s = self.source.fetch().await?;
                            d = self.dest.fetch().await?;
                        }
                    }
                }
            }
            self.dest.check_pending().await?;
        }

        debug!(matched = report.matched, "merge loop finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[Option<&str>]) -> Row {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_compare_values_nulls_first() {
        assert_eq!(
            compare_values(None, Some("a"), ColType::String).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some("a"), None, ColType::String).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(None, None, ColType::Numeric).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_values_numeric_is_decimal() {
        // Bytewise "10" < "9"; decimal 10 > 9.
        assert_eq!(
            compare_values(Some("10"), Some("9"), ColType::Numeric).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some("1.50"), Some("1.5"), ColType::Numeric).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(Some("-2"), Some("1"), ColType::Numeric).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_values_numeric_precision() {
        assert_eq!(
            compare_values(
                Some("12345678901234567890.123"),
                Some("12345678901234567890.124"),
                ColType::Numeric
            )
            .unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_values_string_bytewise() {
        // 'B' (0x42) sorts before 'b' (0x62) bytewise.
        assert_eq!(
            compare_values(Some("b"), Some("B"), ColType::String).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some("abc"), Some("abd"), ColType::String).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_values_bad_numeric() {
        assert!(compare_values(Some("abc"), Some("1"), ColType::Numeric).is_err());
    }

    #[test]
    fn test_compare_rows_lexicographic() {
        let types = [ColType::Numeric, ColType::String];
        let longs = [false, false];
        assert_eq!(
            compare_rows(
                &row(&[Some("2"), Some("b")]),
                &row(&[Some("2"), Some("B")]),
                &types,
                &longs
            )
            .unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_rows(
                &row(&[Some("1"), Some("z")]),
                &row(&[Some("2"), Some("a")]),
                &types,
                &longs
            )
            .unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_rows_skips_long_columns() {
        let types = [ColType::Numeric, ColType::String];
        let longs = [false, true];
        // The long column differs but is not part of the ordering.
        assert_eq!(
            compare_rows(
                &row(&[Some("1"), Some("lobs differ")]),
                &row(&[Some("1"), Some("entirely")]),
                &types,
                &longs
            )
            .unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_rows_null_row_side() {
        let types = [ColType::Numeric, ColType::String];
        let longs = [false, false];
        assert_eq!(
            compare_rows(
                &row(&[None, Some("x")]),
                &row(&[Some("0"), Some("x")]),
                &types,
                &longs
            )
            .unwrap(),
            Ordering::Less
        );
    }
}
