//! Contracts for the external collaborators of the validation core.
//!
//! The core never performs I/O, prompts the user, or touches key material
//! itself. Every side effect goes through one of these traits, injected
//! at engine construction as `Arc<dyn …>` objects. Implementations own
//! their retry, timeout, and caching policies; the core enforces none.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LcpError;
use crate::license::LicenseDocument;
use crate::links::Link;

/// Opaque decryption context produced by the native crypto layer.
///
/// Required to decrypt publication resources after validation succeeds.
/// The core never inspects it; it only hands it to subscribers.
pub trait DrmContext: Debug + Send + Sync {}

/// Single-shot HTTP fetch.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// GET the given URL and return the response body.
    ///
    /// # Errors
    ///
    /// Any non-success status or transport failure surfaces as
    /// [`LcpError::Network`]. The core retries nothing.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LcpError>;
}

/// Provider of the current Certificate Revocation List.
#[async_trait]
pub trait CrlService: Send + Sync {
    /// Return the current CRL bytes. Implementations cache internally.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::Network`] when no CRL can be produced; this is
    /// fatal at integrity time.
    async fn retrieve(&self) -> Result<Vec<u8>, LcpError>;
}

/// Interactive passphrase prompt surface, supplied by the embedder.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Ask the user for the license passphrase. The license gives access
    /// to the hint text and hint link.
    ///
    /// `None` means the user dismissed the prompt.
    async fn request_passphrase(&self, license: &LicenseDocument) -> Option<String>;
}

/// Passphrase resolution, combining a local store with the authenticator.
#[async_trait]
pub trait PassphraseService: Send + Sync {
    /// Resolve a passphrase for the license: consult the local store
    /// first, then drive the authenticator when one is available.
    ///
    /// Never fails; implementations convert their errors to `None`,
    /// which the machine treats as user cancellation.
    async fn request(
        &self,
        license: &LicenseDocument,
        authenticator: Option<&Arc<dyn Authenticator>>,
    ) -> Option<String>;
}

/// Device identity and registration against the status server.
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Register this device with the license's `register` link.
    ///
    /// Returns fresh Status Document bytes when the server replies with
    /// one, `None` when it acknowledges without a body or the device was
    /// already registered.
    ///
    /// # Errors
    ///
    /// Registration failures are reported but never deny access; the
    /// machine degrades them.
    async fn register_license(
        &self,
        license: &LicenseDocument,
        register_link: &Link,
    ) -> Result<Option<Vec<u8>>, LcpError>;
}

/// Local persistence for validated licenses.
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Persist the license locally. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::Repository`]; the engine logs and swallows it.
    async fn add_license(&self, license: &LicenseDocument) -> Result<(), LcpError>;
}

/// The native cryptographic primitive behind content protection.
#[async_trait]
pub trait NativeCrypto: Send + Sync {
    /// Probe which of `candidates` unlocks the license, if any.
    ///
    /// Used at startup to detect the build flavor, and by passphrase
    /// stores to filter stale entries.
    async fn find_one_valid_passphrase(
        &self,
        license_json: &str,
        candidates: &[String],
    ) -> Option<String>;

    /// Build a decryption context from the license, a passphrase, and the
    /// current CRL.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::Integrity`] on a wrong passphrase, a bad
    /// signature, or a revoked provider certificate.
    async fn create_context(
        &self,
        license_json: &str,
        passphrase: &str,
        crl: &[u8],
    ) -> Result<Arc<dyn DrmContext>, LcpError>;
}
