//! Search filter construction
//!
//! The fixed filter shapes used by the account-lookup operations, plus
//! RFC 4515 escaping for every caller-supplied operand.

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\5c"),
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Filter matching an account by sAMAccountName.
pub fn by_sam_account_name(sam: &str) -> String {
    format!("(|(sAMAccountName={}))", escape_value(sam))
}

/// Filter matching an account by userPrincipalName within a realm.
pub fn by_user_principal_name(sam: &str, domain: &str) -> String {
    format!(
        "(|(userPrincipalName={}@{}))",
        escape_value(sam),
        escape_value(domain)
    )
}

/// Filter matching a host by its `host/` service principal name.
pub fn by_host_spn(host: &str) -> String {
    format!("(|(servicePrincipalName=host/{}))", escape_value(host))
}

/// Simple equality filter on one attribute.
pub fn equals(attr: &str, value: &str) -> String {
    format!("({}={})", attr, escape_value(value))
}

/// Filter matching any entry.
pub const ANY_ENTRY: &str = "(objectClass=*)";

/// Default filter for full-tree exports.
pub const ANY_DN: &str = "(distinguishedName=*)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("John Doe"), "John Doe");
        assert_eq!(escape_value("John*"), "John\\2a");
        assert_eq!(escape_value("(admin)"), "\\28admin\\29");
        assert_eq!(escape_value("a\\b"), "a\\5cb");
        assert_eq!(escape_value("a\0b"), "a\\00b");
    }

    #[test]
    fn test_by_sam_account_name() {
        assert_eq!(by_sam_account_name("jdoe"), "(|(sAMAccountName=jdoe))");
        assert_eq!(
            by_sam_account_name("j*e"),
            "(|(sAMAccountName=j\\2ae))"
        );
    }

    #[test]
    fn test_by_user_principal_name() {
        assert_eq!(
            by_user_principal_name("jdoe", "mst.edu"),
            "(|(userPrincipalName=jdoe@mst.edu))"
        );
    }

    #[test]
    fn test_by_host_spn() {
        assert_eq!(
            by_host_spn("login.mst.edu"),
            "(|(servicePrincipalName=host/login.mst.edu))"
        );
    }

    #[test]
    fn test_equals() {
        assert_eq!(equals("cn", "Doe, John"), "(cn=Doe, John)");
        assert_eq!(equals("cn", "a(b)"), "(cn=a\\28b\\29)");
    }
}
