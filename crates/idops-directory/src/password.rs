//! Password operations using unicodePwd attribute encoding.
//!
//! The directory requires passwords to be set via the `unicodePwd` attribute
//! using a specific encoding:
//! 1. Surround the password with double quotes: `"password"`
//! 2. Encode the quoted string as UTF-16LE bytes
//!
//! LDAPS is required for any unicodePwd modification; the server rejects the
//! operation over plaintext connections. After any password set the
//! PASSWD_NOTREQD control bit is cleared so the account actually requires
//! the password just stored.

use rand::rngs::OsRng;
use rand::RngCore;

use idops_core::error::{DirectoryError, DirectoryResult};

/// Length of generated initial passwords.
pub const GENERATED_PASSWORD_LEN: usize = 22;

/// Characters used in generated passwords. Quotes and backslashes are left
/// out so the quoted UTF-16LE encoding never needs escaping.
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,-./:;<=>?@[]^_{}~";

/// Encode a plaintext password for the `unicodePwd` attribute.
///
/// The password is surrounded with double quotes and then encoded as
/// UTF-16LE.
///
/// # Errors
/// Returns an error if the password is empty.
pub fn encode_unicode_pwd(password: &str) -> DirectoryResult<Vec<u8>> {
    if password.is_empty() {
        return Err(DirectoryError::invalid_argument("password cannot be empty"));
    }

    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// Validate that the connection is suitable for password operations.
///
/// The server refuses unicodePwd modifications over non-encrypted
/// connections, so this is checked before any wire round trip.
pub fn require_tls(use_tls: bool) -> DirectoryResult<()> {
    if !use_tls {
        return Err(DirectoryError::invalid_argument(
            "LDAPS connection required for password operations",
        ));
    }
    Ok(())
}

/// Generate a random initial password.
pub fn random_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| PASSWORD_CHARSET[*b as usize % PASSWORD_CHARSET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_vector() {
        let encoded = encode_unicode_pwd("engineer").unwrap();
        let expected: Vec<u8> = vec![
            0x22, 0x00, 0x65, 0x00, 0x6E, 0x00, 0x67, 0x00, 0x69, 0x00, 0x6E, 0x00, 0x65, 0x00,
            0x65, 0x00, 0x72, 0x00, 0x22, 0x00,
        ];
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_quoted_ends() {
        let encoded = encode_unicode_pwd("P@ssw0rd").unwrap();
        assert_eq!(&encoded[..2], &[0x22, 0x00]);
        assert_eq!(&encoded[encoded.len() - 2..], &[0x22, 0x00]);
    }

    #[test]
    fn test_encode_length() {
        // "abc" -> 5 chars including quotes -> 10 bytes UTF-16LE
        assert_eq!(encode_unicode_pwd("abc").unwrap().len(), 10);
    }

    #[test]
    fn test_encode_non_ascii() {
        let encoded = encode_unicode_pwd("Pässwörd").unwrap();
        assert_eq!(encoded.len() % 2, 0);
    }

    #[test]
    fn test_encode_empty_rejected() {
        assert!(encode_unicode_pwd("").is_err());
    }

    #[test]
    fn test_require_tls() {
        assert!(require_tls(true).is_ok());
        assert!(require_tls(false).is_err());
    }

    #[test]
    fn test_random_password_shape() {
        let pw = random_password();
        assert_eq!(pw.len(), GENERATED_PASSWORD_LEN);
        assert!(!pw.contains('"'));
        assert!(!pw.contains('\\'));
    }

    #[test]
    fn test_random_password_varies() {
        assert_ne!(random_password(), random_password());
    }
}
