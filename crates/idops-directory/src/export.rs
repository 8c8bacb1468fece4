//! Directory export: LDIF 1.0 and CSV.
//!
//! The LDIF writer emits unwrapped lines (one line per value regardless of
//! length) and base64-encodes any value that is not an LDIF SAFE-STRING.
//! CSV output quotes per RFC 4180 via the `csv` crate. Both exports log
//! progress every fixed number of entries.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::info;

use idops_core::error::{DirectoryError, DirectoryResult};

use crate::client::{DirectoryClient, SearchOpts};
use crate::entry::{AttrValues, DirectoryEntry};
use crate::filters;

/// How often progress is logged during exports.
const PROGRESS_EVERY: u64 = 50;

/// Options for a directory export.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Search filter. Defaults to every entry with a DN.
    pub filter: Option<String>,
    /// Attributes to export. `None` exports all user attributes.
    pub attributes: Option<Vec<String>>,
    /// Search base override.
    pub base: Option<String>,
}

impl DumpOptions {
    fn effective_filter(&self) -> &str {
        self.filter.as_deref().unwrap_or(filters::ANY_DN)
    }

    fn search_opts(&self) -> SearchOpts {
        SearchOpts {
            attributes: self.attributes.clone(),
            base: self.base.clone(),
            max_records: None,
        }
    }
}

/// True when a value may appear verbatim after `attr: ` in LDIF.
///
/// SAFE-STRING per the LDIF grammar: ASCII below 127, no NUL/CR/LF, and not
/// starting with space, colon, or `<`.
pub fn is_ldif_safe(value: &[u8]) -> bool {
    if let Some(first) = value.first() {
        if matches!(*first, b' ' | b':' | b'<') {
            return false;
        }
    }
    value
        .iter()
        .all(|b| *b != 0 && *b != b'\r' && *b != b'\n' && *b < 127)
}

/// Render one LDIF line, unwrapped, base64-encoding unsafe values.
pub fn ldif_line(attr: &str, value: &[u8]) -> String {
    if is_ldif_safe(value) {
        // Safe values are ASCII by construction.
        format!("{}: {}", attr, String::from_utf8_lossy(value))
    } else {
        format!("{}:: {}", attr, BASE64.encode(value))
    }
}

/// Render a whole entry as an LDIF record, including the trailing blank
/// line.
pub fn entry_to_ldif(entry: &DirectoryEntry) -> String {
    let mut out = String::new();
    out.push_str(&ldif_line("dn", entry.dn().as_bytes()));
    out.push('\n');

    for attribute in entry.attributes() {
        match &attribute.values {
            AttrValues::Text(values) => {
                for value in values {
                    out.push_str(&ldif_line(&attribute.name, value.as_bytes()));
                    out.push('\n');
                }
            }
            AttrValues::Binary(values) => {
                for value in values {
                    out.push_str(&ldif_line(&attribute.name, value));
                    out.push('\n');
                }
            }
        }
    }
    out.push('\n');
    out
}

impl DirectoryClient {
    /// Export matching entries as LDIF 1.0. Returns the entry count.
    pub async fn dump_ldif<W: std::io::Write>(
        &mut self,
        out: &mut W,
        opts: &DumpOptions,
    ) -> DirectoryResult<u64> {
        out.write_all(b"version: 1\n\n")
            .map_err(|e| DirectoryError::protocol_with_source("export write failed", e))?;

        let mut stream = self
            .stream_matches(opts.effective_filter(), &opts.search_opts())
            .await?;

        let mut count = 0u64;
        while let Some(entry) = stream.next_entry().await? {
            out.write_all(entry_to_ldif(&entry).as_bytes())
                .map_err(|e| DirectoryError::protocol_with_source("export write failed", e))?;
            count += 1;
            if count % PROGRESS_EVERY == 0 {
                info!(count, "ldif export progress");
            }
        }
        stream.finish().await?;

        info!(count, "ldif export complete");
        Ok(count)
    }

    /// Export matching entries as CSV, one row per entry. Multi-valued
    /// attributes are joined with `|`; missing attributes become empty
    /// cells. Returns the entry count.
    pub async fn dump_csv<W: std::io::Write>(
        &mut self,
        out: W,
        columns: &[&str],
        opts: &DumpOptions,
    ) -> DirectoryResult<u64> {
        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record(columns)
            .map_err(|e| DirectoryError::protocol_with_source("csv write failed", e))?;

        let search_opts = SearchOpts {
            attributes: Some(columns.iter().map(|c| c.to_string()).collect()),
            ..opts.search_opts()
        };
        let mut stream = self
            .stream_matches(opts.effective_filter(), &search_opts)
            .await?;

        let mut count = 0u64;
        while let Some(entry) = stream.next_entry().await? {
            let row: Vec<String> = columns
                .iter()
                .map(|col| {
                    if col.eq_ignore_ascii_case("dn") {
                        entry.dn().to_string()
                    } else {
                        entry.values(col).join("|")
                    }
                })
                .collect();
            writer
                .write_record(&row)
                .map_err(|e| DirectoryError::protocol_with_source("csv write failed", e))?;
            count += 1;
            if count % PROGRESS_EVERY == 0 {
                info!(count, "csv export progress");
            }
        }
        stream.finish().await?;

        writer
            .flush()
            .map_err(|e| DirectoryError::protocol_with_source("csv write failed", e))?;
        info!(count, "csv export complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ldif_safe() {
        assert!(is_ldif_safe(b"plain value"));
        assert!(is_ldif_safe(b""));
        assert!(!is_ldif_safe(b" leading space"));
        assert!(!is_ldif_safe(b":colon"));
        assert!(!is_ldif_safe(b"<ref"));
        assert!(!is_ldif_safe(b"line\nbreak"));
        assert!(!is_ldif_safe("résumé".as_bytes()));
        assert!(!is_ldif_safe(&[0x01, 0x05, 0x00]));
    }

    #[test]
    fn test_ldif_line_plain() {
        assert_eq!(ldif_line("cn", b"jdoe"), "cn: jdoe");
    }

    #[test]
    fn test_ldif_line_base64() {
        assert_eq!(ldif_line("cn", b" x"), "cn:: IHg=");
    }

    #[test]
    fn test_ldif_line_never_wraps() {
        let long = "x".repeat(500);
        let line = ldif_line("description", long.as_bytes());
        assert_eq!(line.lines().count(), 1);
        assert_eq!(line.len(), "description: ".len() + 500);
    }

    #[test]
    fn test_entry_to_ldif_record() {
        let mut entry = DirectoryEntry::new("cn=jdoe,dc=mst,dc=edu");
        entry.append_text("cn", ["jdoe".to_string()]);
        entry.append_text("description", [" odd".to_string()]);

        let ldif = entry_to_ldif(&entry);
        let lines: Vec<&str> = ldif.lines().collect();
        assert_eq!(lines[0], "dn: cn=jdoe,dc=mst,dc=edu");
        assert_eq!(lines[1], "cn: jdoe");
        assert_eq!(lines[2], "description:: IG9kZA==");
        assert!(ldif.ends_with("\n\n"));
    }

    #[test]
    fn test_entry_to_ldif_binary_attribute() {
        let mut entry = DirectoryEntry::new("cn=jdoe,dc=mst,dc=edu");
        entry.append_binary(
            "objectSid",
            [vec![
                0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x12, 0x00, 0x00, 0x00,
            ]],
        );

        let ldif = entry_to_ldif(&entry);
        assert!(ldif.contains("objectSid:: AQEAAAAAAAUSAAAA"));
    }

    #[test]
    fn test_dump_options_defaults() {
        let opts = DumpOptions::default();
        assert_eq!(opts.effective_filter(), "(distinguishedName=*)");
        assert!(opts.search_opts().attributes.is_none());
    }
}
