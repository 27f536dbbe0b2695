//! Status Document model.
//!
//! The Status Document is served by the provider's status server and
//! describes the current lifecycle of one License Document copy: whether
//! it is still usable, when the license was last updated on the provider
//! side, and which endpoints exist for re-downloading the license or
//! registering a device.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LcpError;
use crate::links::{Link, Links};

/// Lifecycle state of a license copy, as reported by the status server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Issued but never opened on any device.
    Ready,
    /// In use on at least one registered device.
    Active,
    /// The rights window is over.
    Expired,
    /// The loan was returned.
    Returned,
    /// The provider revoked the license.
    Revoked,
    /// The provider cancelled the license before first use.
    Cancelled,
}

impl Status {
    /// Whether this state still allows opening the publication.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Returned => "returned",
            Self::Revoked => "revoked",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Timestamps describing the last provider-side changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    /// When the License Document was last updated. Authoritative; a value
    /// newer than the local copy's `updated()` means a fresh license must
    /// be downloaded.
    pub license: DateTime<Utc>,

    /// When this Status Document last changed.
    pub status: DateTime<Utc>,
}

/// Type of a lifecycle event recorded by the status server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A device registered against the license.
    Register,
    /// The loan was renewed.
    Renew,
    /// The loan was returned.
    Return,
    /// The license was revoked.
    Revoke,
    /// The license was cancelled.
    Cancel,
    /// An event type this client does not know about.
    Unknown,
}

// Servers may emit event types newer than this client; those must not
// fail the whole document.
impl<'de> serde::Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(match value.as_str() {
            "register" => Self::Register,
            "renew" => Self::Renew,
            "return" => Self::Return,
            "revoke" => Self::Revoke,
            "cancel" => Self::Cancel,
            _ => Self::Unknown,
        })
    }
}

/// A lifecycle event recorded by the status server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Display name of the device involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Identifier of the device involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// When the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Rights the provider is willing to extend, e.g. through a renewal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialRights {
    /// Latest date the loan could be extended to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Wire form of the Status Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusJson {
    id: String,
    status: Status,
    #[serde(default)]
    message: String,
    updated: Updated,
    #[serde(default)]
    links: Links,
    #[serde(default)]
    potential_rights: Option<PotentialRights>,
    #[serde(default)]
    events: Vec<StatusEvent>,
}

/// A parsed Status Document, paired with the exact bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDocument {
    raw: Vec<u8>,
    /// Identifier of the license this document describes.
    pub id: String,
    /// Current lifecycle state.
    pub status: Status,
    /// Provider message suitable for display.
    pub message: String,
    /// Last provider-side changes.
    pub updated: Updated,
    /// Named links (`license` to re-download, `register` to activate).
    pub links: Links,
    /// Rights the provider could extend.
    pub potential_rights: Option<PotentialRights>,
    /// Lifecycle events, most providers append in chronological order.
    pub events: Vec<StatusEvent>,
}

impl StatusDocument {
    /// Parse a Status Document from its raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::StatusParsing`] on malformed JSON, missing
    /// mandatory fields, an unknown `status` value, or a non-templated
    /// link whose href is not a valid URL.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, LcpError> {
        let raw = bytes.into();
        let doc: StatusJson = serde_json::from_slice(&raw).map_err(|e| LcpError::StatusParsing {
            message: e.to_string(),
        })?;

        if let Err(href) = doc.links.check_hrefs() {
            return Err(LcpError::StatusParsing {
                message: format!("invalid link href: {href}"),
            });
        }

        Ok(Self {
            raw,
            id: doc.id,
            status: doc.status,
            message: doc.message,
            updated: doc.updated,
            links: doc.links,
            potential_rights: doc.potential_rights,
            events: doc.events,
        })
    }

    /// The exact bytes this document was parsed from.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// First link with the given relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.first_with_rel(rel)
    }

    /// Number of devices that registered against the license.
    #[must_use]
    pub fn device_registrations(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.event_type == EventType::Register)
            .count()
    }
}
