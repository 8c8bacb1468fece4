//! # Directory administration core
//!
//! A bound LDAP/LDAPS session against a Microsoft Active Directory server
//! (optionally via the Global Catalog) with the operations a university
//! identity-management stack needs:
//!
//! - Account lifecycle: create (users, security groups, machine accounts),
//!   delete, enable, disable, move, rename
//! - Password management with the vendor's `unicodePwd` encoding
//! - Paged searches and range retrieval for oversized attributes
//! - Semantic decoding of bit-packed attributes: `userAccountControl`,
//!   `groupType`, `sAMAccountType`, `protocolSettings`, binary SIDs, and
//!   FILETIME timestamps
//! - LDIF and CSV export
//!
//! ## Example
//!
//! ```ignore
//! use idops_directory::{DirectoryClient, DirectoryConfig, SearchOpts};
//!
//! let config = DirectoryConfig::new("svc-admin", "mst.edu")
//!     .with_password("secret");
//!
//! let mut client = DirectoryClient::connect(config).await?;
//! if let Some(dn) = client.find_dn("jdoe").await? {
//!     client.disable("jdoe").await?;
//! }
//! ```

pub mod client;
pub mod config;
pub mod decode;
pub mod dn;
pub mod entry;
pub mod export;
pub mod filters;
pub mod password;
pub mod range;
pub mod uac;

// Re-exports
pub use client::{
    AttributeChanges, DirectoryClient, EntryStream, HostKind, NewHost, NewUser, SearchOpts,
};
pub use config::DirectoryConfig;
pub use decode::{
    filetime_to_datetime, filetime_to_unix, parse_account_type, parse_group_type,
    parse_protocol_settings, sid_bytes_to_text, sid_to_text, ProtocolSettings,
};
pub use entry::{AttrValues, Attribute, DirectoryEntry};
pub use export::DumpOptions;
pub use password::{encode_unicode_pwd, random_password};
pub use range::RangeMarker;
pub use uac::{parse_uac, UserAccountControl};
