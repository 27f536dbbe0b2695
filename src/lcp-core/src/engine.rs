//! Validation engine: step handlers and the public facade.
//!
//! The engine owns one state machine, one FIFO event queue, and one
//! observer registry. `validate` seeds the machine and drives it until it
//! settles; every state entered on the way runs its handler, whose
//! outcome is queued as the next event. Events raised while a handler is
//! running are delivered only after it returns, so handlers never observe
//! a half-applied transition.
//!
//! One engine validates one license. Validating several licenses in
//! parallel means one engine per license; `&mut self` makes the
//! single-threaded cooperative model a compile-time guarantee.
//!
//! Dropping the engine (or the future returned by `validate`) cancels
//! whatever collaborator call was in flight; a dropped machine delivers
//! no further observer callbacks.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::documents::ValidatedDocuments;
use crate::error::{LcpError, StatusError};
use crate::license::LicenseDocument;
use crate::links::rel;
use crate::machine::{transition, Event, State, Transition};
use crate::observer::{Observer, ObserverPolicy, ObserverRegistry};
use crate::profiles::BuildMode;
use crate::services::{
    Authenticator, CrlService, DeviceService, LicenseRepository, NativeCrypto, NetworkFetcher,
    PassphraseService,
};
use crate::status::{Status, StatusDocument};

/// A seed document handed to [`ValidationEngine::validate`].
#[derive(Debug, Clone)]
pub enum Document {
    /// Raw License Document bytes extracted from a publication.
    License(Vec<u8>),
    /// Raw Status Document bytes, e.g. kept from an earlier session.
    Status(Vec<u8>),
}

impl Document {
    /// Stable name of the seed kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::License(_) => "license",
            Self::Status(_) => "status",
        }
    }
}

/// Hook invoked once per freshly parsed License Document, so the caller
/// can rewrite updated license bytes into the originating container.
pub type LicenseValidatedHook = Box<dyn Fn(&LicenseDocument) + Send + Sync>;

/// Collaborators required by the engine.
pub struct Services {
    /// Single-shot HTTP fetch.
    pub network: Arc<dyn NetworkFetcher>,
    /// Certificate Revocation List provider.
    pub crl: Arc<dyn CrlService>,
    /// Passphrase resolution (local store + prompt).
    pub passphrases: Arc<dyn PassphraseService>,
    /// Device registration.
    pub devices: Arc<dyn DeviceService>,
    /// Local license persistence.
    pub repository: Arc<dyn LicenseRepository>,
    /// Native content-protection primitive.
    pub crypto: Arc<dyn NativeCrypto>,
}

/// Engine configuration.
#[derive(Default)]
pub struct ValidationConfig {
    /// Prompt surface used when the passphrase store comes up empty.
    /// Without one, an unknown passphrase cancels the validation.
    pub authenticator: Option<Arc<dyn Authenticator>>,

    /// Overrides build-flavor detection. When `None` the engine probes
    /// the native layer with the embedded production license.
    pub build_mode: Option<BuildMode>,
}

/// The validation facade.
///
/// Seeded with raw document bytes, it drives the state machine through
/// parsing, the status-server dialogue, the passphrase prompt, the
/// native integrity check, and device registration, then notifies its
/// observers with either validated documents or a fatal error.
pub struct ValidationEngine {
    state: State,
    pending: VecDeque<Event>,
    observers: ObserverRegistry,
    build_mode: BuildMode,
    authenticator: Option<Arc<dyn Authenticator>>,
    services: Services,
    on_license_validated: Option<LicenseValidatedHook>,
    /// Raw license payloads already seen by `validate_license`, so the
    /// persistence hook fires once per distinct payload.
    seen_payloads: Vec<Vec<u8>>,
}

impl ValidationEngine {
    /// Create an engine.
    ///
    /// Probes the native layer for the build flavor unless the
    /// configuration pins one.
    pub async fn new(config: ValidationConfig, services: Services) -> Self {
        let build_mode = match config.build_mode {
            Some(mode) => mode,
            None => BuildMode::detect(services.crypto.as_ref()).await,
        };

        info!(build_mode = ?build_mode, "validation engine initialized");

        Self {
            state: State::Start,
            pending: VecDeque::new(),
            observers: ObserverRegistry::new(),
            build_mode,
            authenticator: config.authenticator,
            services,
            on_license_validated: None,
            seen_payloads: Vec::new(),
        }
    }

    /// Install the hook invoked once per freshly parsed License Document.
    #[must_use]
    pub fn on_license_validated(mut self, hook: LicenseValidatedHook) -> Self {
        self.on_license_validated = Some(hook);
        self
    }

    /// The detected (or configured) build flavor.
    #[must_use]
    pub fn build_mode(&self) -> BuildMode {
        self.build_mode
    }

    /// The current machine state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Validate a seed document and drive the machine until it settles.
    ///
    /// The observer is enrolled one-shot and fires at the next terminal
    /// notification (or cancellation), not synchronously; re-seeding an
    /// already valid machine with status bytes re-validates before any
    /// notification goes out.
    #[instrument(skip_all, fields(seed = seed.kind()))]
    pub async fn validate(&mut self, seed: Document, observer: Observer) {
        self.observers.add(observer, ObserverPolicy::Once);
        self.seen_payloads.clear();

        let event = match seed {
            Document::License(raw) => Event::RetrievedLicenseData(raw),
            Document::Status(raw) => Event::RetrievedStatusData(raw),
        };
        self.raise(event).await;
    }

    /// Enroll a long-lived watcher.
    ///
    /// If the machine is already terminal the observer is invoked
    /// synchronously with the settled outcome; a `Once` late subscriber
    /// is not enrolled afterwards.
    pub fn subscribe(&mut self, mut observer: Observer, policy: ObserverPolicy) {
        match &self.state {
            State::Valid { documents } => {
                observer(Some(documents), None);
                if policy == ObserverPolicy::Always {
                    self.observers.add(observer, policy);
                }
            }
            State::Failure { error } => {
                observer(None, Some(error));
                if policy == ObserverPolicy::Always {
                    self.observers.add(observer, policy);
                }
            }
            _ => self.observers.add(observer, policy),
        }
    }

    /// Number of enrolled observers. Mostly useful to tests.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Queue an event and process the queue to exhaustion, in FIFO order.
    async fn raise(&mut self, event: Event) {
        self.pending.push_back(event);
        while let Some(event) = self.pending.pop_front() {
            self.process(event).await;
        }
    }

    /// Apply one event: transition, then run the new state's handler and
    /// queue whatever it raises.
    async fn process(&mut self, event: Event) {
        let via_cancellation = matches!(event, Event::Cancelled);
        let event_name = event.name();

        let current = mem::replace(&mut self.state, State::Start);
        let from = current.name();

        match transition(current, event) {
            Transition::Ignore(state) => {
                debug!(state = from, event = event_name, "event ignored");
                self.state = state;
            }
            Transition::Advance(state) => {
                debug!(from, to = state.name(), event = event_name, "transition");
                self.state = state;
                if let Some(next) = self.enter(via_cancellation).await {
                    self.pending.push_back(next);
                }
            }
        }
    }

    /// Run the entry handler of the current state.
    ///
    /// Handler errors become `Failed` events here, so the transition
    /// table alone decides whether they are fatal or degraded.
    async fn enter(&mut self, via_cancellation: bool) -> Option<Event> {
        match self.state.clone() {
            State::Start => {
                if via_cancellation {
                    info!("passphrase prompt dismissed, back to start");
                    self.observers.notify(None, None);
                }
                None
            }
            State::ValidateLicense { raw, .. } => {
                Some(self.validate_license(raw).await.unwrap_or_else(Event::Failed))
            }
            State::FetchStatus { license } => {
                Some(self.fetch_status(&license).await.unwrap_or_else(Event::Failed))
            }
            State::ValidateStatus { raw, .. } => {
                Some(self.validate_status(raw).unwrap_or_else(Event::Failed))
            }
            State::FetchLicense { status, .. } => {
                Some(self.fetch_license(&status).await.unwrap_or_else(Event::Failed))
            }
            State::CheckLicenseStatus { license, status } => {
                Some(self.check_license_status(&license, status.as_ref()))
            }
            State::RequestPassphrase { license, .. } => {
                Some(self.request_passphrase(&license).await)
            }
            State::ValidateIntegrity {
                license,
                passphrase,
                ..
            } => Some(
                self.validate_integrity(&license, &passphrase)
                    .await
                    .unwrap_or_else(Event::Failed),
            ),
            State::RegisterDevice { documents, link } => Some(
                self.register_device(&documents, &link)
                    .await
                    .unwrap_or_else(Event::Failed),
            ),
            State::Valid { documents } => {
                info!(license_id = %documents.license().id, "license validated");
                self.observers.notify(Some(&documents), None);
                None
            }
            State::Failure { error } => {
                warn!(%error, "license validation failed");
                self.observers.notify(None, Some(&error));
                None
            }
        }
    }

    // ========================================================================
    // Step handlers
    // ========================================================================

    /// Parse the license, enforce the profile policy, persist it.
    async fn validate_license(&mut self, raw: Vec<u8>) -> Result<Event, LcpError> {
        let license = LicenseDocument::parse(raw)?;

        let profile = license.profile();
        if !self.build_mode.accepts(profile) {
            return Err(LcpError::LicenseProfileNotSupported {
                profile: profile.to_string(),
            });
        }

        if !self.seen_payloads.iter().any(|seen| seen == license.raw()) {
            self.seen_payloads.push(license.raw().to_vec());

            // Persistence must never fail validation.
            if let Err(error) = self.services.repository.add_license(&license).await {
                warn!(license_id = %license.id, %error, "license persistence failed");
            }
            if let Some(hook) = &self.on_license_validated {
                hook(&license);
            }
        }

        debug!(license_id = %license.id, profile, "license validated");
        Ok(Event::ValidatedLicense(license))
    }

    /// Retrieve the Status Document advertised by the license.
    async fn fetch_status(&self, license: &LicenseDocument) -> Result<Event, LcpError> {
        let link = license.link(rel::STATUS).ok_or_else(|| LcpError::MissingLink {
            rel: rel::STATUS.into(),
        })?;

        debug!(url = %link.href, "fetching status document");
        let raw = self.services.network.fetch(&link.href).await?;
        Ok(Event::RetrievedStatusData(raw))
    }

    /// Parse freshly fetched Status Document bytes.
    fn validate_status(&self, raw: Vec<u8>) -> Result<Event, LcpError> {
        let status = StatusDocument::parse(raw)?;
        debug!(status = %status.status, "status document validated");
        Ok(Event::ValidatedStatus(status))
    }

    /// Re-download the license the Status Document advertises.
    async fn fetch_license(&self, status: &StatusDocument) -> Result<Event, LcpError> {
        let link = status.link(rel::LICENSE).ok_or_else(|| LcpError::MissingLink {
            rel: rel::LICENSE.into(),
        })?;

        info!(url = %link.href, "status server advertises a newer license");
        let raw = self.services.network.fetch(&link.href).await?;
        Ok(Event::RetrievedLicenseData(raw))
    }

    /// Evaluate the rights window, deriving the lifecycle error from the
    /// Status Document when the license is outside it.
    fn check_license_status(
        &self,
        license: &LicenseDocument,
        status: Option<&StatusDocument>,
    ) -> Event {
        let error = rights_status_error(license, status, Utc::now());
        if let Some(error) = &error {
            warn!(%error, "license is outside its rights window");
        }
        Event::CheckedLicenseStatus(error)
    }

    /// Resolve a passphrase; `None` from the service is a cancellation.
    async fn request_passphrase(&self, license: &LicenseDocument) -> Event {
        match self
            .services
            .passphrases
            .request(license, self.authenticator.as_ref())
            .await
        {
            Some(passphrase) => Event::RetrievedPassphrase(passphrase),
            None => Event::Cancelled,
        }
    }

    /// Run the native integrity check with a fresh CRL.
    async fn validate_integrity(
        &self,
        license: &LicenseDocument,
        passphrase: &str,
    ) -> Result<Event, LcpError> {
        // The profile was checked at parse time; check again so a machine
        // driven with hand-built events cannot skip the gate.
        let profile = license.profile();
        if !self.build_mode.accepts(profile) {
            return Err(LcpError::LicenseProfileNotSupported {
                profile: profile.to_string(),
            });
        }

        let crl = self.services.crl.retrieve().await?;
        let context = self
            .services
            .crypto
            .create_context(license.json().as_ref(), passphrase, &crl)
            .await?;

        debug!(license_id = %license.id, "integrity check passed");
        Ok(Event::ValidatedIntegrity(context))
    }

    /// Best-effort device activation.
    async fn register_device(
        &self,
        documents: &ValidatedDocuments,
        link: &crate::links::Link,
    ) -> Result<Event, LcpError> {
        debug!(url = %link.href, "registering device");
        let reply = self
            .services
            .devices
            .register_license(documents.license(), link)
            .await?;
        Ok(Event::RegisteredDevice(reply))
    }
}

/// Lifecycle error for a license at `now`, derived from the rights window
/// and the Status Document.
///
/// `None` means the license is inside its window. An absent `start` or
/// `end` closes the window on that side to `now` itself, so a license
/// with no `end` never expires and a license with no dates at all is
/// valid exactly now.
#[must_use]
pub fn rights_status_error(
    license: &LicenseDocument,
    status: Option<&StatusDocument>,
    now: chrono::DateTime<Utc>,
) -> Option<StatusError> {
    let start = license.rights.start.unwrap_or(now);
    let end = license.rights.end.unwrap_or(now);

    if start <= now && now <= end {
        return None;
    }

    Some(match status {
        Some(status) => {
            let date = status.updated.status;
            match status.status {
                // The provider has not caught up yet; the window is
                // authoritative.
                Status::Ready | Status::Active | Status::Expired => {
                    StatusError::Expired { start, end }
                }
                Status::Returned => StatusError::Returned(date),
                Status::Revoked => StatusError::Revoked {
                    date,
                    devices: status.device_registrations(),
                },
                Status::Cancelled => StatusError::Cancelled(date),
            }
        }
        None => StatusError::Expired { start, end },
    })
}
