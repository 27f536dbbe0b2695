//! Error types for license validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while validating a license.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LcpError {
    /// The license uses an encryption profile this build does not accept.
    #[error("unsupported encryption profile: {profile}")]
    LicenseProfileNotSupported {
        /// Profile URI declared by the license.
        profile: String,
    },

    /// A network fetch failed or returned a non-success status.
    #[error("network request failed: {url}")]
    Network {
        /// Requested URL.
        url: String,
        /// HTTP status code, when a response was received at all.
        status: Option<u16>,
    },

    /// The License Document could not be parsed.
    #[error("malformed license document: {message}")]
    LicenseParsing {
        /// What made the document unreadable.
        message: String,
    },

    /// The Status Document could not be parsed.
    #[error("malformed status document: {message}")]
    StatusParsing {
        /// What made the document unreadable.
        message: String,
    },

    /// A link required by the current step is missing from the document.
    #[error("no {rel} link in the document")]
    MissingLink {
        /// Relation name that was looked up.
        rel: String,
    },

    /// The native crypto layer rejected the license or the passphrase.
    #[error("integrity check failed: {message}")]
    Integrity {
        /// Reason reported by the crypto layer.
        message: String,
    },

    /// The license is well-formed but its lifecycle forbids use.
    #[error("license not usable: {0}")]
    LicenseStatus(#[from] StatusError),

    /// Local persistence failed. Never fails validation; logged only.
    #[error("license repository error: {message}")]
    Repository {
        /// Reason reported by the repository.
        message: String,
    },
}

impl LcpError {
    /// The lifecycle error carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<&StatusError> {
        match self {
            Self::LicenseStatus(err) => Some(err),
            _ => None,
        }
    }

    /// Check whether this error is fatal wherever it is raised.
    ///
    /// Network and status-parsing failures degrade on the Status Document
    /// path; the machine decides per transition. Everything listed here
    /// terminates validation no matter the state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LicenseProfileNotSupported { .. }
                | Self::LicenseParsing { .. }
                | Self::Integrity { .. }
        )
    }

    /// Check whether this error may be degraded to "carry on without".
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::StatusParsing { .. }
                | Self::MissingLink { .. }
                | Self::Repository { .. }
        )
    }
}

/// Lifecycle reason a technically valid license cannot be used.
///
/// Conveyed inside the validated documents rather than as a failure, so
/// callers can still read license metadata and show rich messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatusError {
    /// The rights window is over, or has not started yet.
    #[error("license expired on {end}")]
    Expired {
        /// Start of the rights window.
        start: DateTime<Utc>,
        /// End of the rights window.
        end: DateTime<Utc>,
    },

    /// The loan was returned to the provider.
    #[error("license was returned on {0}")]
    Returned(DateTime<Utc>),

    /// The provider revoked the license.
    #[error("license was revoked on {date}")]
    Revoked {
        /// When the revocation took effect.
        date: DateTime<Utc>,
        /// How many devices had registered against the license.
        devices: usize,
    },

    /// The provider cancelled the license before first use.
    #[error("license was cancelled on {0}")]
    Cancelled(DateTime<Utc>),
}
