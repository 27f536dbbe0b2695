//! # lcp-core
//!
//! License validation core for Readium LCP (Licensed Content Protection)
//! protected publications. Given the raw License Document extracted from
//! a publication, it produces either a usable decryption context or a
//! precise reason the license cannot be honored.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ValidationEngine                         │
//! │                                                              │
//! │  seed ──▶ ┌──────────────────────────────────────────┐      │
//! │           │          state machine (machine)          │      │
//! │           │  Start → ValidateLicense → FetchStatus →  │      │
//! │           │  … → ValidateIntegrity → RegisterDevice → │      │
//! │           │          Valid | Failure                  │      │
//! │           └──────────────────┬───────────────────────┘      │
//! │                              │ entry handlers               │
//! │   ┌──────────────────────────┴────────────────────────┐     │
//! │   │ NetworkFetcher · CrlService · PassphraseService   │     │
//! │   │ DeviceService · LicenseRepository · NativeCrypto  │     │
//! │   └───────────────────────────────────────────────────┘     │
//! │                              │                              │
//! │                              ▼                              │
//! │           ObserverRegistry ──▶ (documents, error)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Behavior highlights
//!
//! - Status Document troubles degrade: an offline, integrity-valid
//!   license inside its rights window stays readable.
//! - Lifecycle errors (expired, returned, revoked, cancelled) terminate
//!   in `Valid` with the reason captured, so callers keep access to the
//!   license metadata.
//! - Device registration is best effort and never denies access.
//! - A dismissed passphrase prompt returns the machine to its initial
//!   state; the caller can retry with another authenticator without
//!   rebuilding the engine.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod documents;
pub mod engine;
pub mod error;
pub mod license;
pub mod links;
pub mod machine;
pub mod observer;
pub mod profiles;
pub mod services;
pub mod status;

pub use documents::{Context, ValidatedDocuments};
pub use engine::{
    rights_status_error, Document, LicenseValidatedHook, Services, ValidationConfig,
    ValidationEngine,
};
pub use error::{LcpError, StatusError};
pub use license::LicenseDocument;
pub use links::{Link, Links};
pub use machine::{transition, Event, State, Transition};
pub use observer::{Observer, ObserverPolicy, ObserverRegistry};
pub use profiles::{BuildMode, BASIC_PROFILE, PRODUCTION_PROFILES};
pub use services::{
    Authenticator, CrlService, DeviceService, DrmContext, LicenseRepository, NativeCrypto,
    NetworkFetcher, PassphraseService,
};
pub use status::{Status, StatusDocument};
