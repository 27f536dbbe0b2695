//! The result of a successful validation run.

use std::sync::Arc;

use crate::error::{LcpError, StatusError};
use crate::license::LicenseDocument;
use crate::services::DrmContext;
use crate::status::StatusDocument;

/// Outcome of the integrity step: either a usable decryption context or
/// the lifecycle reason the license is not usable.
#[derive(Debug, Clone)]
pub enum Context {
    /// Opaque handle required to decrypt publication resources.
    Drm(Arc<dyn DrmContext>),
    /// The license is well-formed but its lifecycle forbids use. Callers
    /// can still read metadata and show the reason.
    Status(StatusError),
}

/// Documents that survived validation, handed to subscribers.
///
/// A value object: it may outlive the machine that produced it.
#[derive(Debug, Clone)]
pub struct ValidatedDocuments {
    license: LicenseDocument,
    status: Option<StatusDocument>,
    context: Context,
}

impl ValidatedDocuments {
    pub(crate) fn new(
        license: LicenseDocument,
        status: Option<StatusDocument>,
        context: Context,
    ) -> Self {
        Self {
            license,
            status,
            context,
        }
    }

    /// The validated License Document.
    #[must_use]
    pub fn license(&self) -> &LicenseDocument {
        &self.license
    }

    /// The Status Document, when one was obtained.
    #[must_use]
    pub fn status(&self) -> Option<&StatusDocument> {
        self.status.as_ref()
    }

    /// The decryption context.
    ///
    /// # Errors
    ///
    /// Returns [`LcpError::LicenseStatus`] when the license is not
    /// usable. Callers that only need metadata must not call this.
    pub fn context(&self) -> Result<Arc<dyn DrmContext>, LcpError> {
        match &self.context {
            Context::Drm(context) => Ok(Arc::clone(context)),
            Context::Status(error) => Err(LcpError::LicenseStatus(*error)),
        }
    }

    /// The lifecycle error, when the license is not usable.
    #[must_use]
    pub fn status_error(&self) -> Option<&StatusError> {
        match &self.context {
            Context::Status(error) => Some(error),
            Context::Drm(_) => None,
        }
    }
}
