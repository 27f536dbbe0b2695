//! License Document model.
//!
//! A License Document is the signed JSON artifact embedded in a protected
//! publication. It carries the content-decryption parameters, the usage
//! rights granted to the user, and the service endpoints (passphrase
//! hint page, Status Document, publication download).
//!
//! The model wraps the exact bytes it was parsed from; `raw()` round-trips
//! them unchanged so callers can rewrite the license into a container or
//! feed it verbatim to the native crypto layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LcpError;
use crate::links::{rel, Link, Links};

/// Content-encryption parameters of a License Document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encryption {
    /// URI of the encryption profile the license complies with.
    pub profile: String,

    /// Key that encrypts the publication resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_key: Option<ContentKey>,

    /// Key derived from the user passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<UserKey>,
}

/// Encrypted content key. Opaque to the core; consumed by native crypto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentKey {
    /// Encryption algorithm URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    /// Base64 content key, encrypted with the user key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_value: Option<String>,
}

/// User key parameters, including the passphrase hint shown at prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserKey {
    /// Key-derivation algorithm URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    /// Hint to display when prompting for the passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_hint: Option<String>,

    /// Base64 value used to verify a candidate passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_check: Option<String>,
}

/// Rights granted by the license.
///
/// Absent `start`/`end` mean the window is open on that side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rights {
    /// First moment the publication may be opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Last moment the publication may be opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    /// Maximum number of printable pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print: Option<u32>,

    /// Maximum number of copyable characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<u32>,
}

/// The user the license was issued to. Fields may be encrypted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Provider-scoped user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// User email, possibly encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User display name, possibly encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Names of the user fields that are encrypted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted: Vec<String>,
}

/// Provider signature over the canonical license form.
///
/// Verification is delegated to the native crypto layer; the core only
/// carries the fields through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature algorithm URI.
    pub algorithm: String,

    /// Base64 X.509 certificate of the provider.
    pub certificate: String,

    /// Base64 signature value.
    pub value: String,
}

/// Wire form of the License Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LicenseJson {
    id: String,
    issued: DateTime<Utc>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
    provider: String,
    encryption: Encryption,
    links: Links,
    #[serde(default)]
    rights: Rights,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    signature: Option<Signature>,
}

/// A parsed License Document, paired with the exact bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseDocument {
    raw: Vec<u8>,
    /// Unique identifier of the license.
    pub id: String,
    /// When the license was issued.
    pub issued: DateTime<Utc>,
    updated: Option<DateTime<Utc>>,
    /// Identifier of the issuing provider.
    pub provider: String,
    /// Content-encryption parameters.
    pub encryption: Encryption,
    /// Named links (`hint` is mandatory).
    pub links: Links,
    /// Rights granted to the user.
    pub rights: Rights,
    /// The user the license was issued to.
    pub user: Option<User>,
    /// Provider signature.
    pub signature: Option<Signature>,
}

impl LicenseDocument {
    /// Parse a License Document from its raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::LicenseParsing`] on malformed JSON, missing
    /// mandatory fields, a missing `hint` link, or a non-templated link
    /// whose href is not a valid URL.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, LcpError> {
        let raw = bytes.into();
        let doc: LicenseJson =
            serde_json::from_slice(&raw).map_err(|e| LcpError::LicenseParsing {
                message: e.to_string(),
            })?;

        if doc.links.first_with_rel(rel::HINT).is_none() {
            return Err(LcpError::LicenseParsing {
                message: "missing mandatory hint link".into(),
            });
        }
        if let Err(href) = doc.links.check_hrefs() {
            return Err(LcpError::LicenseParsing {
                message: format!("invalid link href: {href}"),
            });
        }

        Ok(Self {
            raw,
            id: doc.id,
            issued: doc.issued,
            updated: doc.updated,
            provider: doc.provider,
            encryption: doc.encryption,
            links: doc.links,
            rights: doc.rights,
            user: doc.user,
            signature: doc.signature,
        })
    }

    /// The exact bytes this document was parsed from.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The raw form as text, as handed to the native crypto layer.
    #[must_use]
    pub fn json(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Last modification time. Falls back to `issued` when the provider
    /// never updated the license.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated.unwrap_or(self.issued)
    }

    /// First link with the given relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.first_with_rel(rel)
    }

    /// URI of the encryption profile.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.encryption.profile
    }

    /// Passphrase hint to show the user, when the license carries one.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.encryption
            .user_key
            .as_ref()
            .and_then(|key| key.text_hint.as_deref())
    }
}
