//! Directory entry model
//!
//! An entry is an ordered list of `(name, values)` pairs. Attribute names are
//! case-insensitive. Values arrive as decoded strings except for attributes
//! the server marks binary (`objectSid` and friends), which stay as raw
//! octets.

use ldap3::{ResultEntry, SearchEntry};

/// Values of one attribute: decoded text or raw octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValues {
    /// UTF-8 decoded values.
    Text(Vec<String>),
    /// Raw octet-string values (binary attributes).
    Binary(Vec<Vec<u8>>),
}

impl AttrValues {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            AttrValues::Text(v) => v.len(),
            AttrValues::Binary(v) => v.len(),
        }
    }

    /// True when there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One attribute of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name as delivered by the server.
    pub name: String,
    /// The attribute's values.
    pub values: AttrValues,
}

/// A single directory entry: DN plus ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    dn: String,
    attrs: Vec<Attribute>,
}

impl DirectoryEntry {
    /// Create an empty entry with the given DN.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: Vec::new(),
        }
    }

    /// Construct from a raw protocol entry.
    pub fn from_result_entry(raw: ResultEntry) -> Self {
        Self::from_search_entry(SearchEntry::construct(raw))
    }

    /// Construct from a decoded search entry.
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        let mut out = Self::new(entry.dn);
        for (name, values) in entry.attrs {
            out.attrs.push(Attribute {
                name,
                values: AttrValues::Text(values),
            });
        }
        for (name, values) in entry.bin_attrs {
            out.attrs.push(Attribute {
                name,
                values: AttrValues::Binary(values),
            });
        }
        out
    }

    /// The entry's distinguished name.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All attributes in order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True when the entry carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Look up an attribute by case-insensitive name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// True when the entry has the named attribute.
    pub fn has(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// First text value of the named attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        match self.attribute(name)? {
            Attribute {
                values: AttrValues::Text(v),
                ..
            } => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// All text values of the named attribute (empty when absent or binary).
    pub fn values(&self, name: &str) -> &[String] {
        match self.attribute(name) {
            Some(Attribute {
                values: AttrValues::Text(v),
                ..
            }) => v,
            _ => &[],
        }
    }

    /// First binary value of the named attribute.
    pub fn first_binary(&self, name: &str) -> Option<&[u8]> {
        match self.attribute(name)? {
            Attribute {
                values: AttrValues::Binary(v),
                ..
            } => v.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// Append text values to the named attribute, creating it if absent.
    ///
    /// Used by range retrieval to merge continuation chunks; delivery order
    /// is preserved.
    pub fn append_text(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        if let Some(attr) = self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            if let AttrValues::Text(existing) = &mut attr.values {
                existing.extend(values);
                return;
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            values: AttrValues::Text(values.into_iter().collect()),
        });
    }

    /// Append binary values to the named attribute, creating it if absent.
    pub fn append_binary(&mut self, name: &str, values: impl IntoIterator<Item = Vec<u8>>) {
        if let Some(attr) = self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            if let AttrValues::Binary(existing) = &mut attr.values {
                existing.extend(values);
                return;
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            values: AttrValues::Binary(values.into_iter().collect()),
        });
    }

    /// Remove the named attribute, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let idx = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DirectoryEntry {
        let mut entry = DirectoryEntry::new("cn=jdoe,ou=People,dc=mst,dc=edu");
        entry.append_text("sAMAccountName", ["jdoe".to_string()]);
        entry.append_text(
            "proxyAddresses",
            ["SMTP:jdoe@mst.edu".to_string(), "smtp:jd@mst.edu".to_string()],
        );
        entry
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let entry = sample();
        assert_eq!(entry.first("samaccountname"), Some("jdoe"));
        assert_eq!(entry.first("SAMACCOUNTNAME"), Some("jdoe"));
        assert!(entry.has("ProxyAddresses"));
        assert!(!entry.has("mail"));
    }

    #[test]
    fn test_values_order_preserved() {
        let entry = sample();
        let values = entry.values("proxyAddresses");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], "SMTP:jdoe@mst.edu");
    }

    #[test]
    fn test_append_merges() {
        let mut entry = sample();
        entry.append_text("proxyAddresses", ["smtp:doe@mst.edu".to_string()]);
        assert_eq!(entry.values("proxyAddresses").len(), 3);
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn test_binary_attribute() {
        let mut entry = DirectoryEntry::new("cn=jdoe");
        entry.attrs.push(Attribute {
            name: "objectSid".to_string(),
            values: AttrValues::Binary(vec![vec![0x01, 0x05]]),
        });
        assert_eq!(entry.first_binary("objectsid"), Some(&[0x01, 0x05][..]));
        assert_eq!(entry.first("objectSid"), None);
        assert!(entry.values("objectSid").is_empty());
    }

    #[test]
    fn test_remove() {
        let mut entry = sample();
        assert!(entry.remove("samaccountname").is_some());
        assert!(!entry.has("sAMAccountName"));
        assert!(entry.remove("missing").is_none());
    }
}
