//! Validation state machine: states, events, and the transition table.
//!
//! The table is a pure function so its properties can be tested without
//! any collaborator. Side effects live in the engine, which runs one
//! entry handler per state and feeds the resulting events back in.
//!
//! ## Design rules
//!
//! - Undefined (state, event) pairs are ignored: the machine keeps its
//!   state and no entry handler runs.
//! - Status Document troubles degrade: fetch, parse, and re-download
//!   failures carry on with whatever is already known.
//! - Lifecycle errors (expired, returned, revoked, cancelled) are not
//!   failures; they terminate in `Valid` with the error captured so
//!   callers can still read metadata.
//! - Device registration is best effort; its failure never denies access.

use std::sync::Arc;

use crate::documents::{Context, ValidatedDocuments};
use crate::error::{LcpError, StatusError};
use crate::license::LicenseDocument;
use crate::links::{rel, Link};
use crate::services::DrmContext;
use crate::status::StatusDocument;

/// States of the validation machine.
///
/// Each state owns exactly the documents relevant to it.
#[derive(Debug, Clone)]
pub enum State {
    /// Initial state, awaiting a seed document.
    Start,
    /// Parse the license bytes and enforce the profile policy.
    ValidateLicense {
        /// Raw License Document bytes.
        raw: Vec<u8>,
        /// Status Document carried over a license re-download, if any.
        status: Option<StatusDocument>,
    },
    /// Retrieve the Status Document advertised by the license.
    FetchStatus {
        /// The validated license.
        license: LicenseDocument,
    },
    /// Parse freshly fetched Status Document bytes.
    ValidateStatus {
        /// The validated license.
        license: LicenseDocument,
        /// Raw Status Document bytes.
        raw: Vec<u8>,
    },
    /// The Status Document advertises a newer license; re-download it.
    FetchLicense {
        /// The stale license.
        license: LicenseDocument,
        /// The Status Document that advertised the update.
        status: StatusDocument,
    },
    /// Evaluate the rights window and the provider-side lifecycle.
    CheckLicenseStatus {
        /// The validated license.
        license: LicenseDocument,
        /// The Status Document, when one was obtained.
        status: Option<StatusDocument>,
    },
    /// Ask the user (or the local store) for the passphrase.
    RequestPassphrase {
        /// The validated license.
        license: LicenseDocument,
        /// The Status Document, when one was obtained.
        status: Option<StatusDocument>,
    },
    /// Hand license, passphrase, and CRL to the native crypto layer.
    ValidateIntegrity {
        /// The validated license.
        license: LicenseDocument,
        /// The Status Document, when one was obtained.
        status: Option<StatusDocument>,
        /// The resolved passphrase.
        passphrase: String,
    },
    /// Best-effort device activation against the status server.
    RegisterDevice {
        /// The validated documents.
        documents: ValidatedDocuments,
        /// The `register` link to call.
        link: Link,
    },
    /// Terminal success. Still accepts fresh Status Document bytes for
    /// re-validation (push-style refresh extension point).
    Valid {
        /// The validated documents.
        documents: ValidatedDocuments,
    },
    /// Terminal failure.
    Failure {
        /// What ended the validation.
        error: LcpError,
    },
}

impl State {
    /// Stable name of the state, for logs and assertions.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ValidateLicense { .. } => "validate_license",
            Self::FetchStatus { .. } => "fetch_status",
            Self::ValidateStatus { .. } => "validate_status",
            Self::FetchLicense { .. } => "fetch_license",
            Self::CheckLicenseStatus { .. } => "check_license_status",
            Self::RequestPassphrase { .. } => "request_passphrase",
            Self::ValidateIntegrity { .. } => "validate_integrity",
            Self::RegisterDevice { .. } => "register_device",
            Self::Valid { .. } => "valid",
            Self::Failure { .. } => "failure",
        }
    }

    /// Whether this state is terminal (`Valid` or `Failure`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Failure { .. })
    }
}

/// Events driving the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// License bytes arrived (seed or re-download).
    RetrievedLicenseData(Vec<u8>),
    /// The license parsed and passed the profile policy.
    ValidatedLicense(LicenseDocument),
    /// Status Document bytes arrived (fetch, seed, or registration reply).
    RetrievedStatusData(Vec<u8>),
    /// The Status Document parsed.
    ValidatedStatus(StatusDocument),
    /// Rights window and lifecycle evaluated; `Some` carries the reason
    /// the license is not usable.
    CheckedLicenseStatus(Option<StatusError>),
    /// The user or the local store produced a passphrase.
    RetrievedPassphrase(String),
    /// The native crypto layer accepted the license.
    ValidatedIntegrity(Arc<dyn DrmContext>),
    /// Registration round trip finished; `Some` carries a fresh Status
    /// Document the server replied with.
    RegisteredDevice(Option<Vec<u8>>),
    /// The current step failed.
    Failed(LcpError),
    /// The user dismissed the passphrase prompt.
    Cancelled,
}

impl Event {
    /// Stable name of the event, for logs and assertions.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RetrievedLicenseData(_) => "retrieved_license_data",
            Self::ValidatedLicense(_) => "validated_license",
            Self::RetrievedStatusData(_) => "retrieved_status_data",
            Self::ValidatedStatus(_) => "validated_status",
            Self::CheckedLicenseStatus(_) => "checked_license_status",
            Self::RetrievedPassphrase(_) => "retrieved_passphrase",
            Self::ValidatedIntegrity(_) => "validated_integrity",
            Self::RegisteredDevice(_) => "registered_device",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of applying an event to a state.
#[derive(Debug)]
pub enum Transition {
    /// The pair is defined; the machine advances and the new state's
    /// entry handler runs.
    Advance(State),
    /// Undefined pair; the machine keeps the returned state untouched.
    Ignore(State),
}

/// Apply `event` to `state`.
///
/// Pure and deterministic; the only authority on which moves exist.
#[must_use]
pub fn transition(state: State, event: Event) -> Transition {
    use Transition::Advance;

    match (state, event) {
        (State::Start, Event::RetrievedLicenseData(raw)) => {
            Advance(State::ValidateLicense { raw, status: None })
        }

        (State::ValidateLicense { status, .. }, Event::ValidatedLicense(license)) => {
            match status {
                // A re-download carries the Status Document forward so it
                // is not fetched twice.
                Some(status) => Advance(State::CheckLicenseStatus {
                    license,
                    status: Some(status),
                }),
                None => Advance(State::FetchStatus { license }),
            }
        }
        (State::ValidateLicense { .. }, Event::Failed(error)) => {
            Advance(State::Failure { error })
        }

        (State::FetchStatus { license }, Event::RetrievedStatusData(raw)) => {
            Advance(State::ValidateStatus { license, raw })
        }
        // The Status Document is optional; an offline license stays usable.
        (State::FetchStatus { license }, Event::Failed(_)) => {
            Advance(State::CheckLicenseStatus {
                license,
                status: None,
            })
        }

        (State::ValidateStatus { license, .. }, Event::ValidatedStatus(status)) => {
            if license.updated() < status.updated.license {
                Advance(State::FetchLicense { license, status })
            } else {
                Advance(State::CheckLicenseStatus {
                    license,
                    status: Some(status),
                })
            }
        }
        (State::ValidateStatus { license, .. }, Event::Failed(_)) => {
            Advance(State::CheckLicenseStatus {
                license,
                status: None,
            })
        }

        (State::FetchLicense { status, .. }, Event::RetrievedLicenseData(raw)) => {
            Advance(State::ValidateLicense {
                raw,
                status: Some(status),
            })
        }
        // Keep the stale license rather than fail the whole validation.
        (State::FetchLicense { license, status }, Event::Failed(_)) => {
            Advance(State::CheckLicenseStatus {
                license,
                status: Some(status),
            })
        }

        (State::CheckLicenseStatus { license, status }, Event::CheckedLicenseStatus(error)) => {
            match error {
                Some(error) => Advance(State::Valid {
                    documents: ValidatedDocuments::new(license, status, Context::Status(error)),
                }),
                None => Advance(State::RequestPassphrase { license, status }),
            }
        }

        (State::RequestPassphrase { license, status }, Event::RetrievedPassphrase(passphrase)) => {
            Advance(State::ValidateIntegrity {
                license,
                status,
                passphrase,
            })
        }
        (State::RequestPassphrase { .. }, Event::Cancelled) => Advance(State::Start),
        (State::RequestPassphrase { .. }, Event::Failed(error)) => {
            Advance(State::Failure { error })
        }

        (
            State::ValidateIntegrity {
                license, status, ..
            },
            Event::ValidatedIntegrity(context),
        ) => {
            let register_link = status
                .as_ref()
                .and_then(|status| status.link(rel::REGISTER))
                .cloned();
            let documents = ValidatedDocuments::new(license, status, Context::Drm(context));
            match register_link {
                Some(link) => Advance(State::RegisterDevice { documents, link }),
                None => Advance(State::Valid { documents }),
            }
        }
        (State::ValidateIntegrity { .. }, Event::Failed(error)) => {
            Advance(State::Failure { error })
        }

        (State::RegisterDevice { documents, .. }, Event::RegisteredDevice(Some(raw))) => {
            Advance(State::ValidateStatus {
                license: documents.license().clone(),
                raw,
            })
        }
        (State::RegisterDevice { documents, .. }, Event::RegisteredDevice(None)) => {
            Advance(State::Valid { documents })
        }
        // Registration is best effort.
        (State::RegisterDevice { documents, .. }, Event::Failed(_)) => {
            Advance(State::Valid { documents })
        }

        // Extension point: a push-style refresh may inject fresh Status
        // Document bytes into an already valid machine.
        (State::Valid { documents }, Event::RetrievedStatusData(raw)) => {
            Advance(State::ValidateStatus {
                license: documents.license().clone(),
                raw,
            })
        }

        (state, _) => Transition::Ignore(state),
    }
}
