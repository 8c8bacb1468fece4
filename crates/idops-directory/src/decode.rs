//! Pure decoders for bit-packed and vendor-encoded directory attributes:
//! groupType, sAMAccountType, protocolSettings, binary SIDs, and FILETIME
//! timestamps. All decoders are table-driven where the attribute is a flag
//! field; none of them touch the network.

use chrono::{DateTime, Utc};

use idops_core::error::{DirectoryError, DirectoryResult};

use crate::uac::{decode_labels, FlagLabel};

// groupType bits.

/// Group created by the system.
pub const GROUP_SYSTEM: u32 = 0x0000_0001;
/// Global scope.
pub const GROUP_GLOBAL: u32 = 0x0000_0002;
/// Domain-local scope.
pub const GROUP_DOMAIN_LOCAL: u32 = 0x0000_0004;
/// Universal scope.
pub const GROUP_UNIVERSAL: u32 = 0x0000_0008;
/// APP_BASIC group for authorization manager.
pub const GROUP_APP_BASIC: u32 = 0x0000_0010;
/// APP_QUERY group for authorization manager.
pub const GROUP_APP_QUERY: u32 = 0x0000_0020;
/// Security-enabled (clear means distribution).
pub const GROUP_SECURITY_ENABLED: u32 = 0x8000_0000;

/// groupType written for new security groups: security-enabled domain-local.
/// The attribute is a signed 32-bit integer on the wire, so `0x80000004`
/// is transmitted as `-2147483644`.
pub const SECURITY_DOMAIN_LOCAL: u32 = GROUP_SECURITY_ENABLED | GROUP_DOMAIN_LOCAL;

/// The on-wire (signed) rendition of [`SECURITY_DOMAIN_LOCAL`].
pub fn security_domain_local_wire() -> String {
    (SECURITY_DOMAIN_LOCAL as i32).to_string()
}

/// Label catalogue for groupType, in emission order.
pub const GROUP_TYPE_LABELS: &[FlagLabel] = &[
    FlagLabel {
        bit: GROUP_SYSTEM,
        if_set: Some("System-created group"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_GLOBAL,
        if_set: Some("Global scope"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_DOMAIN_LOCAL,
        if_set: Some("Domain-local scope"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_UNIVERSAL,
        if_set: Some("Universal scope"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_APP_BASIC,
        if_set: Some("Authorization basic group"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_APP_QUERY,
        if_set: Some("Authorization query group"),
        if_clear: None,
    },
    FlagLabel {
        bit: GROUP_SECURITY_ENABLED,
        if_set: Some("Security group"),
        if_clear: Some("Distribution group"),
    },
];

/// Decode a groupType value into its labels.
///
/// The raw attribute is signed; pass the reinterpreted bit pattern.
pub fn parse_group_type(value: u32) -> Vec<&'static str> {
    decode_labels(value, GROUP_TYPE_LABELS)
}

/// sAMAccountType lookup table.
const ACCOUNT_TYPES: &[(u32, &str)] = &[
    (0x0000_0000, "Domain Object"),
    (0x1000_0000, "Security Global Group"),
    (0x1000_0001, "Distribution Group"),
    (0x2000_0000, "Security Local Group"),
    (0x2000_0001, "Distribution Local Group"),
    (0x3000_0000, "Normal Account"),
    (0x3000_0001, "Workstation/Server Trust Account"),
    (0x3000_0002, "Interdomain Trust Account"),
    (0x4000_0000, "Application Basic Group"),
    (0x4000_0001, "Application Query Group"),
];

/// Decode a sAMAccountType value to its descriptive name.
pub fn parse_account_type(value: u32) -> &'static str {
    ACCOUNT_TYPES
        .iter()
        .find(|(code, _)| *code == value)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Field separator inside protocolSettings values: the UTF-8 section sign.
const PROTOCOL_FIELD_SEP: [u8; 2] = [0xC2, 0xA7];

/// Subfield labels per protocol. The first subfield is always the
/// enable flag; surplus subfields pass through positionally.
const PROTOCOL_FIELDS: &[(&str, &[&str])] = &[
    ("HTTP", &["state"]),
    (
        "POP3",
        &["state", "use-defaults", "message-format", "body-format", "charset"],
    ),
    (
        "IMAP4",
        &["state", "use-defaults", "message-format", "body-format", "charset"],
    ),
];

/// Decoded protocolSettings value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSettings {
    /// Protocol name: POP3, HTTP, or IMAP4.
    pub protocol: String,
    /// Labeled subfields in delivery order.
    pub fields: Vec<(String, String)>,
}

/// Decode a protocolSettings octet string.
///
/// The value is a sequence of fields separated by `0xC2 0xA7`; the first
/// field names the protocol.
pub fn parse_protocol_settings(raw: &[u8]) -> DirectoryResult<ProtocolSettings> {
    let fields = split_on(raw, &PROTOCOL_FIELD_SEP);
    let mut iter = fields.into_iter();

    let protocol = iter
        .next()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .unwrap_or_default();

    let labels = PROTOCOL_FIELDS
        .iter()
        .find(|(name, _)| *name == protocol)
        .map(|(_, labels)| *labels)
        .ok_or_else(|| DirectoryError::Decode {
            message: format!("unknown protocolSettings protocol: {protocol:?}"),
        })?;

    let mut decoded = Vec::new();
    for (i, field) in iter.enumerate() {
        let value = String::from_utf8_lossy(field).into_owned();
        let label = labels
            .get(i)
            .map(|l| (*l).to_string())
            .unwrap_or_else(|| format!("field{}", i + 2));
        let value = if label == "state" {
            match value.as_str() {
                "1" => "Enabled".to_string(),
                "0" => "Disabled".to_string(),
                _ => value,
            }
        } else {
            value
        };
        decoded.push((label, value));
    }

    Ok(ProtocolSettings {
        protocol,
        fields: decoded,
    })
}

fn split_on<'a>(haystack: &'a [u8], sep: &[u8]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + sep.len() <= haystack.len() {
        if &haystack[i..i + sep.len()] == sep {
            out.push(&haystack[start..i]);
            i += sep.len();
            start = i;
        } else {
            i += 1;
        }
    }
    out.push(&haystack[start..]);
    out
}

/// Convert a hex-encoded binary SID to its `S-…` text form.
///
/// Layout: revision (1 byte), sub-authority count (1 byte), identifier
/// authority (6 bytes big-endian), then `count` sub-authorities (4 bytes
/// little-endian each). The input is uppercased and non-hex characters are
/// stripped first, so `"01 05 00 …"` and `"01050000…"` both decode.
pub fn sid_to_text(hex_sid: &str) -> DirectoryResult<String> {
    let cleaned: String = hex_sid
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();

    let bytes = hex::decode(&cleaned).map_err(|e| DirectoryError::Decode {
        message: format!("SID is not valid hex: {e}"),
    })?;
    sid_bytes_to_text(&bytes)
}

/// Convert a raw binary SID (e.g. an `objectSid` value) to its text form.
pub fn sid_bytes_to_text(bytes: &[u8]) -> DirectoryResult<String> {
    if bytes.len() < 8 {
        return Err(DirectoryError::Decode {
            message: format!("SID too short: {} bytes", bytes.len()),
        });
    }

    let revision = bytes[0];
    let sub_count = bytes[1] as usize;
    if bytes.len() != 8 + 4 * sub_count {
        return Err(DirectoryError::Decode {
            message: format!(
                "SID length {} does not match sub-authority count {}",
                bytes.len(),
                sub_count
            ),
        });
    }

    let mut authority: u64 = 0;
    for b in &bytes[2..8] {
        authority = (authority << 8) | u64::from(*b);
    }

    let mut text = format!("S-{revision}-{authority}");
    for i in 0..sub_count {
        let off = 8 + 4 * i;
        let sub = u32::from_le_bytes([
            bytes[off],
            bytes[off + 1],
            bytes[off + 2],
            bytes[off + 3],
        ]);
        text.push('-');
        text.push_str(&sub.to_string());
    }
    Ok(text)
}

/// 100-nanosecond intervals per second.
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_DELTA: i64 = 11_644_473_600;

/// Convert a FILETIME value (100 ns intervals since 1601-01-01 UTC) to POSIX
/// seconds.
pub fn filetime_to_unix(value: u64) -> i64 {
    (value / FILETIME_TICKS_PER_SEC) as i64 - FILETIME_UNIX_DELTA
}

/// Convert POSIX seconds to a FILETIME value.
pub fn unix_to_filetime(secs: i64) -> u64 {
    ((secs + FILETIME_UNIX_DELTA) as u64) * FILETIME_TICKS_PER_SEC
}

/// Convert a FILETIME value to a UTC datetime.
pub fn filetime_to_datetime(value: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(filetime_to_unix(value), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_type_security_domain_local() {
        assert_eq!(SECURITY_DOMAIN_LOCAL, 0x8000_0004);
        assert_eq!(security_domain_local_wire(), "-2147483644");

        let labels = parse_group_type(SECURITY_DOMAIN_LOCAL);
        assert_eq!(labels, vec!["Domain-local scope", "Security group"]);
    }

    #[test]
    fn test_group_type_distribution() {
        let labels = parse_group_type(GROUP_GLOBAL);
        assert_eq!(labels, vec!["Global scope", "Distribution group"]);
    }

    #[test]
    fn test_account_type_table() {
        assert_eq!(parse_account_type(0x3000_0000), "Normal Account");
        assert_eq!(parse_account_type(0x1000_0000), "Security Global Group");
        assert_eq!(
            parse_account_type(0x3000_0001),
            "Workstation/Server Trust Account"
        );
        assert_eq!(parse_account_type(0xDEAD_BEEF), "Unknown");
    }

    #[test]
    fn test_protocol_settings_pop3() {
        let raw = "POP3§1§1§0§1§ISO-8859-1".as_bytes();
        let decoded = parse_protocol_settings(raw).unwrap();
        assert_eq!(decoded.protocol, "POP3");
        assert_eq!(decoded.fields[0], ("state".to_string(), "Enabled".to_string()));
        assert_eq!(
            decoded.fields[1],
            ("use-defaults".to_string(), "1".to_string())
        );
        assert_eq!(
            decoded.fields[4],
            ("charset".to_string(), "ISO-8859-1".to_string())
        );
    }

    #[test]
    fn test_protocol_settings_http_state() {
        let raw = "HTTP§0".as_bytes();
        let decoded = parse_protocol_settings(raw).unwrap();
        assert_eq!(decoded.protocol, "HTTP");
        assert_eq!(decoded.fields, vec![("state".to_string(), "Disabled".to_string())]);
    }

    #[test]
    fn test_protocol_settings_unknown_protocol() {
        let raw = "NNTP§1".as_bytes();
        assert!(parse_protocol_settings(raw).is_err());
    }

    #[test]
    fn test_protocol_settings_surplus_fields() {
        let raw = "IMAP4§1§1§0§1§UTF-8§x§y".as_bytes();
        let decoded = parse_protocol_settings(raw).unwrap();
        let last = decoded.fields.last().unwrap();
        assert!(last.0.starts_with("field"));
    }

    #[test]
    fn test_split_on_separator() {
        let raw = [b'a', 0xC2, 0xA7, b'b', 0xC2, 0xA7];
        let parts = split_on(&raw, &PROTOCOL_FIELD_SEP);
        assert_eq!(parts, vec![&b"a"[..], &b"b"[..], &b""[..]]);
    }

    #[test]
    fn test_sid_known_vector() {
        let text = sid_to_text(
            "01 05 00 00 00 00 00 05 15 00 00 00 A0 65 CF 7E 78 4B 9B 5F E7 7C 87 70 F5 03 00 00",
        )
        .unwrap();
        assert_eq!(text, "S-1-5-21-2127521184-1604012920-1887927527-1013");
    }

    #[test]
    fn test_sid_lowercase_and_noise_stripped() {
        let text = sid_to_text("01:01:00:00:00:00:00:05:12:00:00:00").unwrap();
        assert_eq!(text, "S-1-5-18");
    }

    #[test]
    fn test_sid_bad_length() {
        assert!(sid_to_text("01 05 00").is_err());
        // count says 5 sub-authorities but only one present
        assert!(sid_to_text("01 05 00 00 00 00 00 05 15 00 00 00").is_err());
    }

    #[test]
    fn test_filetime_round_trip() {
        for secs in [0i64, 1, 1_533_209_762, 4_102_444_800] {
            assert_eq!(filetime_to_unix(unix_to_filetime(secs)), secs);
        }
    }

    #[test]
    fn test_filetime_epoch() {
        // FILETIME zero is 1601-01-01, i.e. the full delta before 1970.
        assert_eq!(filetime_to_unix(0), -11_644_473_600);
        assert_eq!(filetime_to_unix(11_644_473_600 * 10_000_000), 0);
    }

    #[test]
    fn test_filetime_known_timestamp() {
        // 2018-08-02 13:36:02 UTC
        let ft = unix_to_filetime(1_533_209_762);
        assert_eq!(ft, 131_776_833_620_000_000);
        assert_eq!(filetime_to_unix(ft), 1_533_209_762);
        let dt = filetime_to_datetime(ft).unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-08-02T13:36:02+00:00");
    }

    #[test]
    fn test_filetime_truncates_sub_second() {
        let ft = unix_to_filetime(100) + 9_999_999;
        assert_eq!(filetime_to_unix(ft), 100);
    }
}
