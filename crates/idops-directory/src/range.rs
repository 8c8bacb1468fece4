//! Range-retrieval cursor for many-valued attributes.
//!
//! Servers cap the number of values returned for one attribute; the overflow
//! is signalled by renaming the attribute `attr;range=<lo>-<hi>` in the
//! result. Retrieval continues by requesting the selector
//! `attr;range=<hi+1>-*` against the entry until the server answers with a
//! terminal `hi` of `*`.

/// A parsed `attr;range=lo-hi` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeMarker {
    /// The attribute name without the range option.
    pub attr: String,
    /// First value index covered by this chunk.
    pub low: u64,
    /// Last value index covered, `None` for the terminal `*`.
    pub high: Option<u64>,
}

impl RangeMarker {
    /// Parse an attribute name that may carry a range option.
    ///
    /// Returns `None` for plain attribute names and for malformed range
    /// options.
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split(';');
        let attr = parts.next()?;
        if attr.is_empty() {
            return None;
        }

        let range = parts.find(|p| {
            p.get(..6)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("range="))
        })?;
        let bounds = &range[6..];
        let (lo, hi) = bounds.split_once('-')?;
        let low: u64 = lo.parse().ok()?;
        let high = if hi == "*" {
            None
        } else {
            Some(hi.parse().ok()?)
        };

        Some(Self {
            attr: attr.to_string(),
            low,
            high,
        })
    }

    /// True when this chunk is the last one.
    pub fn is_terminal(&self) -> bool {
        self.high.is_none()
    }

    /// The attribute selector requesting the next chunk, or `None` when this
    /// chunk was terminal.
    pub fn next_selector(&self) -> Option<String> {
        self.high
            .map(|high| format!("{};range={}-*", self.attr, high + 1))
    }

    /// True when this marker continues retrieval of `attr`.
    pub fn is_for(&self, attr: &str) -> bool {
        self.attr.eq_ignore_ascii_case(attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounded() {
        let marker = RangeMarker::parse("member;range=0-1499").unwrap();
        assert_eq!(marker.attr, "member");
        assert_eq!(marker.low, 0);
        assert_eq!(marker.high, Some(1499));
        assert!(!marker.is_terminal());
        assert_eq!(
            marker.next_selector().unwrap(),
            "member;range=1500-*"
        );
    }

    #[test]
    fn test_parse_terminal() {
        let marker = RangeMarker::parse("member;range=3000-*").unwrap();
        assert!(marker.is_terminal());
        assert_eq!(marker.next_selector(), None);
    }

    #[test]
    fn test_parse_plain_name() {
        assert_eq!(RangeMarker::parse("member"), None);
        assert_eq!(RangeMarker::parse("member;binary"), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(RangeMarker::parse("member;range=x-y"), None);
        assert_eq!(RangeMarker::parse("member;range=5"), None);
        assert_eq!(RangeMarker::parse(";range=0-10"), None);
    }

    #[test]
    fn test_case_insensitive_match() {
        let marker = RangeMarker::parse("Member;Range=0-99").unwrap();
        assert!(marker.is_for("member"));
        assert!(!marker.is_for("proxyAddresses"));
    }
}
